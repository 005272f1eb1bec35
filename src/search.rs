//! Locating and probing the jamming transition.
//!
//! Every procedure here is built on one primitive: change the packing
//! fraction, rescale coordinates to the new box, repair the neighbor
//! structures, re-minimize, and look at the pressure.

use nalgebra::SVector;
use tracing::info;

use crate::cells::CellGrid;
use crate::error::JammingError;
use crate::fire::{self, FireParams};
use crate::io::CurveSink;
use crate::neighbors::NeighborCatalog;
use crate::potential::HarmonicSpheres;
use crate::system::ParticleSystem;

/// Below this step size the refinement checkpoints the first above-threshold
/// state instead of the last below-threshold one, so a rollback lands as
/// close to the transition as the step allows.
const FINEST_CHECKPOINT_STEP: f64 = 5.0e-6;

/// Bound on refinement rounds before the adaptive driver gives up.
const MAX_REFINE_CALLS: u32 = 64;

#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Pressure above this counts as jammed.
    pub pressure_threshold: f64,
    /// Step cascade of `find_jamming_point`: coarse approach, backoff,
    /// fine re-approach.
    pub coarse_step: f64,
    pub backoff_step: f64,
    pub fine_step: f64,
    /// Consecutive above-threshold observations before the refinement rolls
    /// back and asks for a finer step.
    pub refine_rounds: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            pressure_threshold: 1e-8,
            coarse_step: 1e-4,
            backoff_step: 1e-5,
            fine_step: 1e-6,
            refine_rounds: 10,
        }
    }
}

/// Diagnostic record emitted after every compression step.
#[derive(Debug, Clone, Copy)]
pub struct StepRecord {
    pub phi: f64,
    pub energy: f64,
    pub pressure: f64,
    pub iterations: u64,
}

/// Outcome of one `refine_jamming_point` call, recovered by the caller.
#[derive(Debug, Clone, Copy)]
pub enum Refinement {
    /// The step overshot the transition; state was rolled back to the
    /// checkpoint. Retry with the suggested 10x finer step.
    StepTooCoarse { next_step: f64 },
    /// Pressure fell back below threshold after crossing it; restart the
    /// approach with the suggested coarse step.
    LostContact { next_step: f64 },
}

/// Owned rollback snapshot; dropped on every exit path of the refinement.
struct Checkpoint<const D: usize> {
    phi: f64,
    positions: Vec<SVector<f64, D>>,
}

pub struct JammingSearch<const D: usize> {
    system: ParticleSystem<D>,
    grid: CellGrid<D>,
    catalog: NeighborCatalog,
    model: HarmonicSpheres,
    fire: FireParams,
    params: SearchParams,
}

impl<const D: usize> JammingSearch<D> {
    pub fn new(
        mut system: ParticleSystem<D>,
        model: HarmonicSpheres,
        fire: FireParams,
        params: SearchParams,
    ) -> Self {
        let mut grid = CellGrid::new(system.box_length(), system.max_diameter());
        let mut catalog = NeighborCatalog::new(system.len());
        catalog.refresh(&mut grid, &mut system);
        JammingSearch {
            system,
            grid,
            catalog,
            model,
            fire,
            params,
        }
    }

    pub fn system(&self) -> &ParticleSystem<D> {
        &self.system
    }

    pub fn phi(&self) -> f64 {
        self.system.phi()
    }

    pub fn pressure(&self) -> f64 {
        self.model.pressure(&self.system, &self.catalog)
    }

    pub fn energy(&self) -> f64 {
        self.model.energy(&self.system, &self.catalog)
    }

    /// Relax the current configuration without changing phi.
    pub fn minimize(&mut self) -> Result<StepRecord, JammingError> {
        let iterations = fire::minimize(
            &mut self.system,
            &mut self.grid,
            &mut self.catalog,
            &self.model,
            &self.fire,
        )?;
        Ok(self.observe(iterations))
    }

    /// Change phi by `dphi`, rescale coordinates to the new box, repair the
    /// grid and catalog, and re-minimize.
    pub fn compress_by(&mut self, dphi: f64) -> Result<StepRecord, JammingError> {
        let l_start = self.system.box_length();
        self.system.set_phi(self.system.phi() + dphi);
        let l_end = self.system.box_length();
        self.system.rescale(l_end / l_start);
        self.maintain_structures();
        self.minimize()
    }

    /// Three-pass bracketing of the jamming point: coarse approach from
    /// below, backoff, fine re-approach. The final phi is phi_J.
    pub fn find_jamming_point(&mut self) -> Result<StepRecord, JammingError> {
        info!(
            "searching for jamming point from phi = {:.6} (steps {:+.1e} / {:+.1e} / {:+.1e})",
            self.phi(),
            self.params.coarse_step,
            -self.params.backoff_step,
            self.params.fine_step
        );
        let threshold = self.params.pressure_threshold;

        let mut record = self.minimize()?;
        while record.pressure < threshold {
            record = self.compress_by(self.params.coarse_step)?;
        }
        while record.pressure > threshold {
            record = self.compress_by(-self.params.backoff_step)?;
        }
        while record.pressure < threshold {
            record = self.compress_by(self.params.fine_step)?;
        }
        info!(
            "jamming point bracketed at phi_J = {:.9} (P = {:.3e})",
            record.phi, record.pressure
        );
        Ok(record)
    }

    /// Sweep the stress-strain curve above jamming: fine steps first, then
    /// two coarser scales, recording log-spaced (dphi, pressure) points to
    /// the sink until `target_delta` above phi_J is reached.
    pub fn sweep_above_jamming(
        &mut self,
        target_delta: f64,
        sink: &mut dyn CurveSink,
    ) -> Result<(), JammingError> {
        let phi_j = self.phi();
        info!(
            "sweeping from phi_J = {:.9} to phi_J + {:.3e}",
            phi_j, target_delta
        );
        let mut taken = 0u32;
        let mut last_recorded = 0.0;
        loop {
            let step = if taken < 10 {
                self.params.fine_step
            } else if taken < 19 {
                self.params.backoff_step
            } else {
                self.params.coarse_step
            };
            let record = self.compress_by(step)?;
            taken += 1;
            let delta = record.phi - phi_j;
            if last_recorded == 0.0 || delta >= 1.1 * last_recorded {
                sink.record(delta, record.pressure)?;
                last_recorded = delta;
            }
            if delta >= target_delta {
                return Ok(());
            }
        }
    }

    /// Checkpoint/rollback refinement: compress by `dphi` until either the
    /// pressure has stayed above threshold for `refine_rounds` consecutive
    /// observations (step too coarse; roll back) or it falls back below
    /// threshold after crossing (contact lost; restart coarser).
    pub fn refine_jamming_point(&mut self, dphi: f64) -> Result<Refinement, JammingError> {
        info!("squeeze from phi = {:.9} by dphi = {:.3e}", self.phi(), dphi);
        let threshold = self.params.pressure_threshold;
        let mut checkpoint = self.checkpoint();
        let mut above = 0u32;

        loop {
            let pressure = self.pressure();
            self.observe(0);
            if pressure > threshold {
                above += 1;
                if dphi < FINEST_CHECKPOINT_STEP && above == 1 {
                    checkpoint = self.checkpoint();
                }
            } else {
                if above > 0 {
                    return Ok(Refinement::LostContact {
                        next_step: self.params.coarse_step,
                    });
                }
                checkpoint = self.checkpoint();
            }
            if above >= self.params.refine_rounds {
                self.rollback(checkpoint);
                return Ok(Refinement::StepTooCoarse {
                    next_step: 0.1 * dphi,
                });
            }
            self.compress_by(dphi)?;
        }
    }

    /// Adaptive driver over `refine_jamming_point`: shrink the step on every
    /// overshoot until the requested precision (`step_floor`) is reached.
    pub fn locate_by_refinement(
        &mut self,
        initial_step: f64,
        step_floor: f64,
    ) -> Result<StepRecord, JammingError> {
        self.minimize()?;
        let mut step = initial_step;
        for _ in 0..MAX_REFINE_CALLS {
            match self.refine_jamming_point(step)? {
                Refinement::StepTooCoarse { next_step } => {
                    if next_step < step_floor {
                        let record = self.observe(0);
                        info!(
                            "jamming point refined to phi_J = {:.9} (step floor {:.1e})",
                            record.phi, step_floor
                        );
                        return Ok(record);
                    }
                    step = next_step;
                }
                Refinement::LostContact { next_step } => {
                    step = next_step;
                }
            }
        }
        Err(JammingError::SearchExhausted {
            phi: self.phi(),
            step,
        })
    }

    /// Destroy and recreate the grid when its validity band is violated,
    /// and refresh the catalog when the grid changed or the skin was
    /// exceeded. Called after every box rescale.
    fn maintain_structures(&mut self) {
        let l = self.system.box_length();
        let max_diameter = self.system.max_diameter();
        if self.grid.band_violated(l, max_diameter) {
            self.grid = CellGrid::new(l, max_diameter);
            self.catalog.refresh(&mut self.grid, &mut self.system);
        } else if self.system.max_displacement_since_reference()
            > 0.5 * self.grid.skin(l, max_diameter)
        {
            self.catalog.refresh(&mut self.grid, &mut self.system);
        }
    }

    fn checkpoint(&self) -> Checkpoint<D> {
        Checkpoint {
            phi: self.system.phi(),
            positions: self.system.positions.clone(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint<D>) {
        self.system.set_phi(checkpoint.phi);
        self.system.positions = checkpoint.positions;
        self.system.zero_velocities();
        let l = self.system.box_length();
        let max_diameter = self.system.max_diameter();
        if self.grid.band_violated(l, max_diameter) {
            self.grid = CellGrid::new(l, max_diameter);
        }
        self.catalog.refresh(&mut self.grid, &mut self.system);
    }

    fn observe(&self, iterations: u64) -> StepRecord {
        let record = StepRecord {
            phi: self.system.phi(),
            energy: self.energy(),
            pressure: self.pressure(),
            iterations,
        };
        info!(
            "phi = {:.9}, E = {:.6e}, P = {:.6e}, loops = {}",
            record.phi, record.energy, record.pressure, record.iterations
        );
        record
    }
}
