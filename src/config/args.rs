//! Command-line argument parsing for jamming runs.

use clap::Parser;

/// Jamming-point search with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Write log output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Task to run: find, refine, or sweep
    #[arg(long)]
    pub task: Option<String>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the particle count
    #[arg(long)]
    pub particles: Option<usize>,

    /// Override the initial packing fraction
    #[arg(long)]
    pub phi_init: Option<f64>,

    /// Override the minimizer force tolerance
    #[arg(long)]
    pub force_tolerance: Option<f64>,

    /// Override the minimizer iteration budget
    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Override the sweep compression target above phi_J
    #[arg(long)]
    pub sweep_target: Option<f64>,
}
