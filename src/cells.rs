//! Uniform cell grid over the periodic box.
//!
//! Cells are sized so that any two particles closer than the largest
//! interaction cutoff (the maximum diameter) are guaranteed to sit in the
//! same or adjacent cells. The grid keeps its cell count while the box
//! rescales; it must be recreated once the cell edge drifts out of the
//! [max diameter, 2 x max diameter] band.

use itertools::Itertools;
use nalgebra::SVector;

pub struct CellGrid<const D: usize> {
    cells_per_side: usize,
    buckets: Vec<Vec<usize>>,
}

impl<const D: usize> CellGrid<D> {
    pub fn new(box_length: f64, max_diameter: f64) -> Self {
        let cells_per_side = ((box_length / max_diameter).floor() as usize).max(1);
        let buckets = vec![Vec::new(); cells_per_side.pow(D as u32)];
        CellGrid {
            cells_per_side,
            buckets,
        }
    }

    pub fn cells_per_side(&self) -> usize {
        self.cells_per_side
    }

    pub fn cell_count(&self) -> usize {
        self.buckets.len()
    }

    /// Slack between the adjacent-cell guarantee and the interaction
    /// cutoff; the neighbor catalog must be rebuilt before any particle
    /// moves more than half of this.
    pub fn skin(&self, box_length: f64, max_diameter: f64) -> f64 {
        box_length / self.cells_per_side as f64 - max_diameter
    }

    /// Whether the current cell count is no longer valid for `box_length`:
    /// either the cells have shrunk below the cutoff (missed contacts) or
    /// the box has grown enough to fit an extra cell per side.
    pub fn band_violated(&self, box_length: f64, max_diameter: f64) -> bool {
        let n = self.cells_per_side;
        let edge = box_length / n as f64;
        (n > 3 && edge < max_diameter) || max_diameter < box_length / (n + 1) as f64
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    pub fn insert(&mut self, cell: usize, particle: usize) {
        self.buckets[cell].push(particle);
    }

    pub fn bucket(&self, cell: usize) -> &[usize] {
        &self.buckets[cell]
    }

    /// Flat cell index of a (possibly unwrapped) position.
    pub fn cell_of(&self, position: &SVector<f64, D>, box_length: f64) -> usize {
        let n = self.cells_per_side;
        let edge = box_length / n as f64;
        let mut coords = [0usize; D];
        for k in 0..D {
            let wrapped = position[k].rem_euclid(box_length);
            coords[k] = ((wrapped / edge) as usize).min(n - 1);
        }
        self.compose(coords)
    }

    /// The cell itself plus all adjacent cells under periodic wraparound,
    /// deduplicated so small grids do not report the same cell twice.
    pub fn neighbor_cells(&self, cell: usize) -> Vec<usize> {
        let n = self.cells_per_side;
        let mut coords = [0usize; D];
        let mut rest = cell;
        for c in coords.iter_mut() {
            *c = rest % n;
            rest /= n;
        }
        (0..3usize.pow(D as u32))
            .map(|code| {
                let mut offset = code;
                let mut shifted = [0usize; D];
                for k in 0..D {
                    let delta = (offset % 3) as isize - 1;
                    offset /= 3;
                    shifted[k] = (coords[k] as isize + delta).rem_euclid(n as isize) as usize;
                }
                self.compose(shifted)
            })
            .unique()
            .collect()
    }

    fn compose(&self, coords: [usize; D]) -> usize {
        let n = self.cells_per_side;
        coords.iter().rev().fold(0, |acc, &c| acc * n + c)
    }
}
