//! Per-particle candidate interaction sets built from the cell grid.
//!
//! A refresh rebuckets every particle, collects candidates from each
//! particle's own and adjacent cells, and records the current positions as
//! the displacement-tracking reference. The catalog stays valid until some
//! particle has moved more than half the skin distance since that
//! reference.

use crate::cells::CellGrid;
use crate::system::ParticleSystem;

pub struct NeighborCatalog {
    candidates: Vec<Vec<usize>>,
}

impl NeighborCatalog {
    pub fn new(n: usize) -> Self {
        NeighborCatalog {
            candidates: vec![Vec::new(); n],
        }
    }

    /// Candidate partners of particle `i`. Symmetric: j appears in i's set
    /// iff i appears in j's. Pair quantities iterate these with j > i so
    /// each unordered pair is counted once.
    pub fn candidates_of(&self, i: usize) -> &[usize] {
        &self.candidates[i]
    }

    pub fn refresh<const D: usize>(
        &mut self,
        grid: &mut CellGrid<D>,
        system: &mut ParticleSystem<D>,
    ) {
        let l = system.box_length();
        grid.clear();
        for i in 0..system.len() {
            let cell = grid.cell_of(&system.positions[i], l);
            grid.insert(cell, i);
        }
        for i in 0..system.len() {
            let cell = grid.cell_of(&system.positions[i], l);
            self.candidates[i].clear();
            for neighbor in grid.neighbor_cells(cell) {
                for &j in grid.bucket(neighbor) {
                    if j != i {
                        self.candidates[i].push(j);
                    }
                }
            }
        }
        system.record_reference();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refreshed<const D: usize>(
        n: usize,
        phi: f64,
        seed: u64,
    ) -> (ParticleSystem<D>, CellGrid<D>, NeighborCatalog) {
        let mut system = ParticleSystem::<D>::random(n, phi, 0.2, Some(seed)).unwrap();
        let mut grid = CellGrid::new(system.box_length(), system.max_diameter());
        let mut catalog = NeighborCatalog::new(system.len());
        catalog.refresh(&mut grid, &mut system);
        (system, grid, catalog)
    }

    fn assert_complete<const D: usize>(system: &ParticleSystem<D>, catalog: &NeighborCatalog) {
        for i in 0..system.len() {
            for j in (i + 1)..system.len() {
                let cutoff = 0.5 * (system.diameter(i) + system.diameter(j));
                if system.minimum_image(i, j).norm() < cutoff {
                    assert!(
                        catalog.candidates_of(i).contains(&j),
                        "pair ({}, {}) missing from {}'s candidates",
                        i,
                        j,
                        i
                    );
                    assert!(
                        catalog.candidates_of(j).contains(&i),
                        "pair ({}, {}) missing from {}'s candidates",
                        i,
                        j,
                        j
                    );
                }
            }
        }
    }

    #[test]
    fn completeness_2d() {
        for seed in 0..4 {
            let (system, _, catalog) = refreshed::<2>(40, 0.85, seed);
            assert_complete(&system, &catalog);
        }
    }

    #[test]
    fn completeness_3d() {
        let (system, _, catalog) = refreshed::<3>(60, 0.6, 11);
        assert_complete(&system, &catalog);
    }

    #[test]
    fn candidates_hold_no_self_and_no_duplicates() {
        let (system, _, catalog) = refreshed::<2>(30, 0.7, 3);
        for i in 0..system.len() {
            let set = catalog.candidates_of(i);
            assert!(!set.contains(&i));
            let mut sorted = set.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), set.len());
        }
    }

    #[test]
    fn refresh_records_reference() {
        let (mut system, mut grid, mut catalog) = refreshed::<2>(20, 0.5, 9);
        system.positions[0][1] += 0.4;
        assert!(system.max_displacement_since_reference() > 0.0);
        catalog.refresh(&mut grid, &mut system);
        assert_eq!(system.max_displacement_since_reference(), 0.0);
    }
}
