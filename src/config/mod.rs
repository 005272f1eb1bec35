//! Configuration management for jamming runs.
//!
//! This module handles the YAML configuration structure, defaults, and
//! validation.

mod args;

pub use args::Args;

use serde::{Deserialize, Serialize};

use crate::fire::FireParams;
use crate::search::SearchParams;

/// Main configuration structure for a jamming run
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub system: SystemSection,
    #[serde(default)]
    pub fire: FireSection,
    #[serde(default)]
    pub search: SearchSection,
    /// One of "find", "refine", "sweep"
    pub task: Option<String>,
    #[serde(default)]
    pub output: OutputSection,
}

/// Particle system setup
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemSection {
    pub particles: usize,
    /// Spatial dimension, 2 or 3
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    pub phi_init: f64,
    /// Half-width of the uniform diameter distribution around the mean
    pub polydispersity: Option<f64>,
    pub seed: Option<u64>,
    /// External diameter records, one per line; generated when absent
    pub diameters_file: Option<String>,
    /// External initial positions, D coordinates per line; requires
    /// diameters_file
    pub positions_file: Option<String>,
}

/// Minimizer parameters
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct FireSection {
    pub dt_init: Option<f64>,
    pub dt_max: Option<f64>,
    pub alpha_init: Option<f64>,
    pub force_tolerance: Option<f64>,
    pub max_iterations: Option<u64>,
}

/// Search parameters
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct SearchSection {
    pub pressure_threshold: Option<f64>,
    pub coarse_step: Option<f64>,
    pub backoff_step: Option<f64>,
    pub fine_step: Option<f64>,
    pub refine_rounds: Option<u32>,
    /// Initial step of the adaptive refinement task
    pub refine_initial_step: Option<f64>,
    /// Precision at which the adaptive refinement stops
    pub refine_step_floor: Option<f64>,
    /// Compression distance above phi_J covered by the sweep task
    pub sweep_target: Option<f64>,
}

/// Collaborator file paths
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct OutputSection {
    /// Stress-strain curve sink of the sweep task
    pub curve_file: Option<String>,
    /// Where the discovered phi_J is persisted; read back to resume a
    /// known-jammed state
    pub jamming_point_file: Option<String>,
}

fn default_dimension() -> usize {
    2
}

impl Config {
    /// Load and validate a configuration from a YAML file.
    pub fn from_str(content: &str) -> Result<Self, String> {
        let config: Config =
            serde_yml::from_str(content).map_err(|e| format!("failed to parse: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.system.particles == 0 {
            return Err("particle count must be positive".to_string());
        }
        if self.system.dimension != 2 && self.system.dimension != 3 {
            return Err(format!(
                "dimension must be 2 or 3, got {}",
                self.system.dimension
            ));
        }
        if !(self.system.phi_init > 0.0) {
            return Err("initial packing fraction must be positive".to_string());
        }
        if let Some(delta) = self.system.polydispersity {
            if !(0.0..1.0).contains(&delta) {
                return Err("polydispersity must lie in [0, 1)".to_string());
            }
        }
        if self.system.positions_file.is_some() && self.system.diameters_file.is_none() {
            return Err("positions_file requires diameters_file".to_string());
        }
        for (name, value) in [
            ("dt_init", self.fire.dt_init),
            ("dt_max", self.fire.dt_max),
            ("alpha_init", self.fire.alpha_init),
            ("force_tolerance", self.fire.force_tolerance),
        ] {
            if let Some(v) = value {
                if !(v > 0.0) {
                    return Err(format!("{} must be positive", name));
                }
            }
        }
        for (name, value) in [
            ("pressure_threshold", self.search.pressure_threshold),
            ("coarse_step", self.search.coarse_step),
            ("backoff_step", self.search.backoff_step),
            ("fine_step", self.search.fine_step),
            ("refine_initial_step", self.search.refine_initial_step),
            ("refine_step_floor", self.search.refine_step_floor),
            ("sweep_target", self.search.sweep_target),
        ] {
            if let Some(v) = value {
                if !(v > 0.0) {
                    return Err(format!("{} must be positive", name));
                }
            }
        }
        if let Some(task) = &self.task {
            if !matches!(task.as_str(), "find" | "refine" | "sweep") {
                return Err(format!("unknown task: {}", task));
            }
        }
        Ok(())
    }
}

impl SystemSection {
    pub fn polydispersity_or_default(&self) -> f64 {
        self.polydispersity.unwrap_or(0.2)
    }
}

impl FireSection {
    /// Resolve into minimizer parameters, filling defaults for anything the
    /// file left out.
    pub fn params(&self) -> FireParams {
        let base = FireParams::default();
        FireParams {
            dt_init: self.dt_init.unwrap_or(base.dt_init),
            dt_max: self.dt_max.unwrap_or(base.dt_max),
            alpha_init: self.alpha_init.unwrap_or(base.alpha_init),
            force_tolerance: self.force_tolerance.unwrap_or(base.force_tolerance),
            max_iterations: self.max_iterations.unwrap_or(base.max_iterations),
            ..base
        }
    }
}

impl SearchSection {
    pub fn params(&self) -> SearchParams {
        let base = SearchParams::default();
        SearchParams {
            pressure_threshold: self.pressure_threshold.unwrap_or(base.pressure_threshold),
            coarse_step: self.coarse_step.unwrap_or(base.coarse_step),
            backoff_step: self.backoff_step.unwrap_or(base.backoff_step),
            fine_step: self.fine_step.unwrap_or(base.fine_step),
            refine_rounds: self.refine_rounds.unwrap_or(base.refine_rounds),
        }
    }

    pub fn refine_initial_step_or_default(&self) -> f64 {
        self.refine_initial_step.unwrap_or(1e-4)
    }

    pub fn refine_step_floor_or_default(&self) -> f64 {
        self.refine_step_floor.unwrap_or(1e-6)
    }

    pub fn sweep_target_or_default(&self) -> f64 {
        self.sweep_target.unwrap_or(1e-2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_yaml() -> &'static str {
        "system:\n  particles: 64\n  phi_init: 0.8\n"
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.system.dimension, 2);
        assert_eq!(config.system.polydispersity_or_default(), 0.2);

        let fire = config.fire.params();
        assert_eq!(fire.force_tolerance, 1e-12);
        assert_eq!(fire.patience, 5);

        let search = config.search.params();
        assert_eq!(search.pressure_threshold, 1e-8);
        assert_eq!(search.coarse_step, 1e-4);
        assert_eq!(search.refine_rounds, 10);
    }

    #[test]
    fn explicit_values_survive() {
        let yaml = "\
system:
  particles: 100
  dimension: 3
  phi_init: 0.55
  seed: 7
fire:
  force_tolerance: 1.0e-9
search:
  coarse_step: 2.0e-3
task: sweep
";
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.system.dimension, 3);
        assert_eq!(config.system.seed, Some(7));
        assert_eq!(config.fire.params().force_tolerance, 1e-9);
        assert_eq!(config.search.params().coarse_step, 2e-3);
        assert_eq!(config.task.as_deref(), Some("sweep"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        for yaml in [
            "system:\n  particles: 0\n  phi_init: 0.8\n",
            "system:\n  particles: 8\n  phi_init: -0.1\n",
            "system:\n  particles: 8\n  dimension: 4\n  phi_init: 0.8\n",
            "system:\n  particles: 8\n  phi_init: 0.8\n  polydispersity: 1.5\n",
            "system:\n  particles: 8\n  phi_init: 0.8\n  positions_file: x.data\n",
            "system:\n  particles: 8\n  phi_init: 0.8\ntask: jog\n",
            "system:\n  particles: 8\n  phi_init: 0.8\nfire:\n  dt_init: -0.1\n",
        ] {
            assert!(Config::from_str(yaml).is_err(), "accepted: {}", yaml);
        }
    }

    #[test]
    fn yaml_round_trip() {
        let config = Config::from_str(minimal_yaml()).unwrap();
        let serialized = serde_yml::to_string(&config).unwrap();
        let reparsed = Config::from_str(&serialized).unwrap();
        assert_eq!(reparsed.system.particles, 64);
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", minimal_yaml()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(Config::from_str(&content).is_ok());
    }
}
