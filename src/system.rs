//! Per-particle state and the periodic box it lives in.
//!
//! Positions are stored unwrapped so that cumulative displacement since the
//! last neighbor-catalog rebuild stays observable; they are wrapped into
//! [0, L) only when a cell index or a minimum-image separation is computed.
//! The box length is never stored: it is always derived from the current
//! packing fraction, L = (packing / phi)^(1/D).

use itertools::izip;
use nalgebra::SVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::error::JammingError;

/// Largest diameter accepted relative to the mean, per the
/// configuration-source contract.
pub const DIAMETER_BOUND: f64 = 3.0;

pub struct ParticleSystem<const D: usize> {
    pub positions: Vec<SVector<f64, D>>,
    pub velocities: Vec<SVector<f64, D>>,
    diameters: Vec<f64>,
    /// Positions at the last neighbor-catalog rebuild.
    reference: Vec<SVector<f64, D>>,
    /// Total particle volume, fixed at creation.
    packing: f64,
    phi: f64,
    time: f64,
    max_diameter: f64,
}

impl<const D: usize> ParticleSystem<D> {
    /// Populate `n` particles with polydisperse diameters drawn uniformly
    /// from [1 - delta, 1 + delta] (renormalized to unit mean) and positions
    /// drawn uniformly over the centered box.
    pub fn random(
        n: usize,
        phi: f64,
        polydispersity: f64,
        seed: Option<u64>,
    ) -> Result<Self, JammingError> {
        if n == 0 {
            return Err(JammingError::Configuration(
                "particle count must be positive".into(),
            ));
        }
        let mut rng = seeded(seed);
        let mut diameters = if polydispersity > 0.0 {
            let dist = Uniform::new(1.0 - polydispersity, 1.0 + polydispersity);
            (0..n).map(|_| dist.sample(&mut rng)).collect::<Vec<_>>()
        } else {
            vec![1.0; n]
        };
        let mean = diameters.iter().sum::<f64>() / n as f64;
        for d in &mut diameters {
            *d /= mean;
        }
        Self::assemble(diameters, None, phi, &mut rng)
    }

    /// Build a system from externally supplied diameters and, optionally,
    /// positions. Fails with a configuration error when the records are
    /// missing, non-positive, or violate the polydispersity bound.
    pub fn from_parts(
        diameters: Vec<f64>,
        positions: Option<Vec<SVector<f64, D>>>,
        phi: f64,
        seed: Option<u64>,
    ) -> Result<Self, JammingError> {
        if diameters.is_empty() {
            return Err(JammingError::Configuration(
                "no diameter records supplied".into(),
            ));
        }
        let mut rng = seeded(seed);
        Self::assemble(diameters, positions, phi, &mut rng)
    }

    fn assemble(
        diameters: Vec<f64>,
        positions: Option<Vec<SVector<f64, D>>>,
        phi: f64,
        rng: &mut StdRng,
    ) -> Result<Self, JammingError> {
        if D != 2 && D != 3 {
            return Err(JammingError::Configuration(format!(
                "unsupported spatial dimension: {}",
                D
            )));
        }
        if !(phi > 0.0) {
            return Err(JammingError::Configuration(format!(
                "packing fraction must be positive, got {}",
                phi
            )));
        }
        let n = diameters.len();
        let mean = diameters.iter().sum::<f64>() / n as f64;
        for (i, &d) in diameters.iter().enumerate() {
            if !(d > 0.0) {
                return Err(JammingError::Configuration(format!(
                    "diameter record {} is not positive: {}",
                    i, d
                )));
            }
            if d > DIAMETER_BOUND * mean {
                return Err(JammingError::Configuration(format!(
                    "diameter record {} exceeds {} times the mean: {}",
                    i, DIAMETER_BOUND, d
                )));
            }
        }
        let packing: f64 = diameters.iter().map(|&d| particle_volume::<D>(d)).sum();
        let max_diameter = diameters.iter().fold(0.0f64, |m, &d| m.max(d));

        let mut system = ParticleSystem {
            positions: Vec::new(),
            velocities: vec![SVector::zeros(); n],
            diameters,
            reference: Vec::new(),
            packing,
            phi,
            time: 0.0,
            max_diameter,
        };
        let l = system.box_length();
        let positions = match positions {
            Some(positions) => {
                if positions.len() != n {
                    return Err(JammingError::Configuration(format!(
                        "expected {} position records, got {}",
                        n,
                        positions.len()
                    )));
                }
                positions
            }
            None => (0..n)
                .map(|_| SVector::from_fn(|_, _| rng.gen::<f64>() * l - 0.5 * l))
                .collect(),
        };
        system.reference = positions.clone();
        system.positions = positions;
        Ok(system)
    }

    pub fn len(&self) -> usize {
        self.diameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diameters.is_empty()
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Change the packing fraction. The box length follows implicitly; the
    /// caller is responsible for rescaling positions by the induced ratio.
    pub fn set_phi(&mut self, phi: f64) {
        assert!(phi > 0.0, "packing fraction must stay positive");
        self.phi = phi;
    }

    pub fn packing(&self) -> f64 {
        self.packing
    }

    pub fn box_length(&self) -> f64 {
        (self.packing / self.phi).powf(1.0 / D as f64)
    }

    pub fn volume(&self) -> f64 {
        self.packing / self.phi
    }

    pub fn diameter(&self, i: usize) -> f64 {
        self.diameters[i]
    }

    pub fn diameters(&self) -> &[f64] {
        &self.diameters
    }

    pub fn max_diameter(&self) -> f64 {
        self.max_diameter
    }

    pub fn elapsed_time(&self) -> f64 {
        self.time
    }

    /// Multiply every stored position (and reference position) by `ratio`.
    /// This is the only way box-size changes propagate to coordinates.
    pub fn rescale(&mut self, ratio: f64) {
        for (x, m) in self.positions.iter_mut().zip(&mut self.reference) {
            *x *= ratio;
            *m *= ratio;
        }
    }

    pub fn zero_velocities(&mut self) {
        for v in &mut self.velocities {
            *v = SVector::zeros();
        }
    }

    /// Adopt the current positions as the displacement-tracking reference.
    pub fn record_reference(&mut self) {
        self.reference.copy_from_slice(&self.positions);
    }

    /// Largest particle displacement since the last `record_reference`.
    pub fn max_displacement_since_reference(&self) -> f64 {
        self.positions
            .iter()
            .zip(&self.reference)
            .map(|(x, m)| (x - m).norm())
            .fold(0.0, f64::max)
    }

    /// One explicit integration step under the supplied forces. Returns
    /// whether the accumulated displacement now exceeds `half_skin`, the
    /// signal that the neighbor catalog must be rebuilt.
    pub fn fire_step(
        &mut self,
        forces: &[SVector<f64, D>],
        dt: f64,
        half_skin: f64,
    ) -> bool {
        for (x, v, f) in izip!(&mut self.positions, &mut self.velocities, forces) {
            *v += f * dt;
            *x += *v * dt;
        }
        self.time += dt;
        self.max_displacement_since_reference() > half_skin
    }

    /// FIRE velocity mixing, v <- (1 - alpha) v + alpha |v| F / |F|, with
    /// global norms over all degrees of freedom.
    pub fn mix_velocities(&mut self, forces: &[SVector<f64, D>], alpha: f64) {
        let v_norm = self
            .velocities
            .iter()
            .map(|v| v.norm_squared())
            .sum::<f64>()
            .sqrt();
        let f_norm = forces.iter().map(|f| f.norm_squared()).sum::<f64>().sqrt();
        if f_norm <= f64::EPSILON {
            return;
        }
        let scale = alpha * v_norm / f_norm;
        for (v, f) in self.velocities.iter_mut().zip(forces) {
            *v = *v * (1.0 - alpha) + f * scale;
        }
    }

    /// Minimum-image separation x_i - x_j under the periodic box.
    pub fn minimum_image(&self, i: usize, j: usize) -> SVector<f64, D> {
        let l = self.box_length();
        let mut d = self.positions[i] - self.positions[j];
        for k in 0..D {
            d[k] -= l * (d[k] / l).round();
        }
        d
    }
}

/// Volume of one sphere of diameter `d` in D dimensions.
fn particle_volume<const D: usize>(d: f64) -> f64 {
    match D {
        2 => std::f64::consts::FRAC_PI_4 * d * d,
        3 => std::f64::consts::PI / 6.0 * d * d * d,
        _ => unreachable!("dimension is checked at construction"),
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
