//! Jamming-Point Search Command-Line Interface
//!
//! This is the main entry point for locating the jamming transition with
//! YAML configuration.

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::fs;
use tracing::info;

use jamming::config::{Args, Config};
use jamming::io::{read_diameters, read_jamming_point, read_positions, setup_output, CurveFile};
use jamming::{HarmonicSpheres, JammingSearch, ParticleSystem};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_output(args.output.as_ref());

    info!("Reading configuration from: {}", args.config_file);
    let content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;
    let mut config = Config::from_str(&content)
        .map_err(|e| eyre!("Failed to parse configuration file: {}", e))?;
    apply_overrides(&mut config, &args);
    config.validate().map_err(|e| eyre!(e))?;

    match config.system.dimension {
        2 => run::<2>(&config),
        3 => run::<3>(&config),
        d => Err(eyre!("unsupported dimension: {}", d)),
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(seed) = args.seed {
        info!("Overriding seed with: {}", seed);
        config.system.seed = Some(seed);
    }
    if let Some(particles) = args.particles {
        info!("Overriding particle count with: {}", particles);
        config.system.particles = particles;
    }
    if let Some(phi_init) = args.phi_init {
        info!("Overriding phi_init with: {}", phi_init);
        config.system.phi_init = phi_init;
    }
    if let Some(tolerance) = args.force_tolerance {
        info!("Overriding force_tolerance with: {:e}", tolerance);
        config.fire.force_tolerance = Some(tolerance);
    }
    if let Some(budget) = args.max_iterations {
        info!("Overriding max_iterations with: {}", budget);
        config.fire.max_iterations = Some(budget);
    }
    if let Some(target) = args.sweep_target {
        info!("Overriding sweep_target with: {:e}", target);
        config.search.sweep_target = Some(target);
    }
    if let Some(task) = &args.task {
        info!("Overriding task with: {}", task);
        config.task = Some(task.clone());
    }
}

fn run<const D: usize>(config: &Config) -> Result<()> {
    let system = build_system::<D>(config)?;
    info!(
        "System ready: N = {}, D = {}, phi_init = {:.6}, L = {:.6}",
        system.len(),
        D,
        system.phi(),
        system.box_length()
    );

    let mut search = JammingSearch::new(
        system,
        HarmonicSpheres::default(),
        config.fire.params(),
        config.search.params(),
    );

    match config.task.as_deref().unwrap_or("find") {
        "find" => {
            let record = search.find_jamming_point()?;
            info!(
                "Jamming point located: phi_J = {:.9} (P = {:.3e}, E = {:.3e})",
                record.phi, record.pressure, record.energy
            );
            persist_jamming_point(config, record.phi)?;
        }
        "refine" => {
            let record = search.locate_by_refinement(
                config.search.refine_initial_step_or_default(),
                config.search.refine_step_floor_or_default(),
            )?;
            info!(
                "Jamming point refined: phi_J = {:.9} (P = {:.3e})",
                record.phi, record.pressure
            );
            persist_jamming_point(config, record.phi)?;
        }
        "sweep" => {
            let phi_j = resume_or_find(config, &mut search)?;
            persist_jamming_point(config, phi_j)?;

            let target = config.search.sweep_target_or_default();
            match &config.output.curve_file {
                Some(path) => {
                    let mut sink = CurveFile::create(path, phi_j)
                        .wrap_err_with(|| format!("Unable to create curve file: {}", path))?;
                    search.sweep_above_jamming(target, &mut sink)?;
                    sink.finish()?;
                    info!("Stress-strain curve written to: {}", path);
                }
                None => {
                    let mut sink: Vec<(f64, f64)> = Vec::new();
                    search.sweep_above_jamming(target, &mut sink)?;
                    for (delta, pressure) in &sink {
                        info!("curve point: dphi = {:.9e}, P = {:.9e}", delta, pressure);
                    }
                }
            }
        }
        other => return Err(eyre!("unknown task: {}", other)),
    }

    Ok(())
}

fn build_system<const D: usize>(config: &Config) -> Result<ParticleSystem<D>> {
    let sys = &config.system;
    let system = match &sys.diameters_file {
        Some(path) => {
            info!("Reading diameters from: {}", path);
            let diameters = read_diameters(path, sys.particles)?;
            let positions = match &sys.positions_file {
                Some(path) => {
                    info!("Reading positions from: {}", path);
                    Some(read_positions::<D, _>(path, sys.particles)?)
                }
                None => None,
            };
            ParticleSystem::from_parts(diameters, positions, sys.phi_init, sys.seed)?
        }
        None => ParticleSystem::random(
            sys.particles,
            sys.phi_init,
            sys.polydispersity_or_default(),
            sys.seed,
        )?,
    };
    Ok(system)
}

/// Resume from a persisted jamming point when one exists, otherwise find it.
fn resume_or_find<const D: usize>(
    config: &Config,
    search: &mut JammingSearch<D>,
) -> Result<f64> {
    if let Some(path) = &config.output.jamming_point_file {
        if fs::metadata(path).is_ok() {
            let phi_j = read_jamming_point(path)?;
            info!("Resuming from persisted jamming point: phi_J = {:.9}", phi_j);
            search.compress_by(phi_j - search.phi())?;
            return Ok(phi_j);
        }
    }
    Ok(search.find_jamming_point()?.phi)
}

fn persist_jamming_point(config: &Config, phi_j: f64) -> Result<()> {
    if let Some(path) = &config.output.jamming_point_file {
        fs::write(path, format!("{:.12}\n", phi_j))
            .wrap_err_with(|| format!("Unable to write jamming point file: {}", path))?;
        info!("Jamming point persisted to: {}", path);
    }
    Ok(())
}
