//! Harmonic soft-sphere interaction model.
//!
//! Two particles interact only while their minimum-image separation is
//! below the sum of their radii; the repulsion is harmonic in the overlap.
//! All pair sums run over the deduplicated neighbor catalog (j > i).

use nalgebra::SVector;

use crate::neighbors::NeighborCatalog;
use crate::system::ParticleSystem;

pub struct HarmonicSpheres {
    pub stiffness: f64,
}

impl Default for HarmonicSpheres {
    fn default() -> Self {
        HarmonicSpheres { stiffness: 1.0 }
    }
}

impl HarmonicSpheres {
    pub fn new(stiffness: f64) -> Self {
        HarmonicSpheres { stiffness }
    }

    pub fn forces<const D: usize>(
        &self,
        system: &ParticleSystem<D>,
        catalog: &NeighborCatalog,
    ) -> Vec<SVector<f64, D>> {
        let mut forces = vec![SVector::zeros(); system.len()];
        for i in 0..system.len() {
            for &j in catalog.candidates_of(i) {
                if j <= i {
                    continue;
                }
                let cutoff = 0.5 * (system.diameter(i) + system.diameter(j));
                let rij = system.minimum_image(i, j);
                let r2 = rij.norm_squared();
                if r2 >= cutoff * cutoff || r2 == 0.0 {
                    continue;
                }
                let r = r2.sqrt();
                let magnitude = self.stiffness * (1.0 - r / cutoff) / cutoff;
                let fij = rij * (magnitude / r);
                forces[i] += fij;
                forces[j] -= fij;
            }
        }
        forces
    }

    /// Total potential energy over candidate pairs.
    pub fn energy<const D: usize>(
        &self,
        system: &ParticleSystem<D>,
        catalog: &NeighborCatalog,
    ) -> f64 {
        let mut energy = 0.0;
        for i in 0..system.len() {
            for &j in catalog.candidates_of(i) {
                if j <= i {
                    continue;
                }
                let cutoff = 0.5 * (system.diameter(i) + system.diameter(j));
                let r = system.minimum_image(i, j).norm();
                if r < cutoff {
                    let overlap = 1.0 - r / cutoff;
                    energy += 0.5 * self.stiffness * overlap * overlap;
                }
            }
        }
        energy
    }

    /// Virial pressure, sum of f_ij . r_ij over pairs divided by D times
    /// the box volume. The jamming order parameter.
    pub fn pressure<const D: usize>(
        &self,
        system: &ParticleSystem<D>,
        catalog: &NeighborCatalog,
    ) -> f64 {
        let mut virial = 0.0;
        for i in 0..system.len() {
            for &j in catalog.candidates_of(i) {
                if j <= i {
                    continue;
                }
                let cutoff = 0.5 * (system.diameter(i) + system.diameter(j));
                let r = system.minimum_image(i, j).norm();
                if r < cutoff && r > 0.0 {
                    virial += self.stiffness * (1.0 - r / cutoff) / cutoff * r;
                }
            }
        }
        virial / (D as f64 * system.volume())
    }
}

/// Net power fed into the particles, sum of F . v. Negative power marks a
/// minimizer overshoot.
pub fn instantaneous_power<const D: usize>(
    forces: &[SVector<f64, D>],
    velocities: &[SVector<f64, D>],
) -> f64 {
    forces
        .iter()
        .zip(velocities)
        .map(|(f, v)| f.dot(v))
        .sum()
}
