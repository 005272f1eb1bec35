use crate::fire::FireParams;
use crate::potential::HarmonicSpheres;
use crate::search::{JammingSearch, Refinement, SearchParams};
use crate::system::ParticleSystem;

/// Small 2-D fixture with tolerances loose enough for the test suite; the
/// physics is unchanged, only the resolution of the bracketing.
fn small_search(phi_init: f64) -> JammingSearch<2> {
    let system = ParticleSystem::<2>::random(24, phi_init, 0.2, Some(42)).unwrap();
    let fire = FireParams {
        force_tolerance: 1e-8,
        max_iterations: 5_000_000,
        ..FireParams::default()
    };
    let params = SearchParams {
        pressure_threshold: 1e-6,
        coarse_step: 5e-3,
        backoff_step: 5e-4,
        fine_step: 5e-5,
        ..SearchParams::default()
    };
    JammingSearch::new(system, HarmonicSpheres::default(), fire, params)
}

#[test]
fn unjammed_state_relaxes_to_zero_pressure() {
    let mut search = small_search(0.78);
    let record = search.minimize().unwrap();
    assert!(record.pressure < 1e-6, "P = {:.3e}", record.pressure);
    assert!(record.energy < 1e-10, "E = {:.3e}", record.energy);
}

#[test]
fn find_jamming_point_brackets_the_transition() {
    let mut search = small_search(0.80);
    let record = search.find_jamming_point().unwrap();

    assert!(
        record.phi > 0.80 && record.phi < 0.92,
        "phi_J = {} out of expected window",
        record.phi
    );
    // just above the transition: positive but small
    assert!(record.pressure >= 1e-6, "P = {:.3e}", record.pressure);
    assert!(record.pressure < 1e-2, "P = {:.3e}", record.pressure);
}

#[test]
fn pressure_grows_monotonically_above_jamming() {
    let mut search = small_search(0.80);
    search.find_jamming_point().unwrap();

    let mut last = search.pressure();
    for _ in 0..4 {
        let record = search.compress_by(5e-4).unwrap();
        assert!(
            record.pressure >= last - 1e-9,
            "pressure decreased: {:.3e} -> {:.3e}",
            last,
            record.pressure
        );
        last = record.pressure;
    }
}

#[test]
fn sweep_records_are_log_spaced() {
    let mut search = small_search(0.80);
    search.find_jamming_point().unwrap();

    let mut curve: Vec<(f64, f64)> = Vec::new();
    search.sweep_above_jamming(2e-2, &mut curve).unwrap();

    assert!(curve.len() >= 3);
    for window in curve.windows(2) {
        let (d0, _) = window[0];
        let (d1, p1) = window[1];
        assert!(d1 > d0, "delta not increasing: {} -> {}", d0, d1);
        assert!(
            d1 >= 1.1 * d0 - 1e-12,
            "spacing below 10%: {} -> {}",
            d0,
            d1
        );
        assert!(p1 > 0.0);
    }
    assert!(curve.last().unwrap().0 >= 2e-2 - 1e-12);
}

#[test]
fn refinement_rolls_back_a_too_coarse_step() {
    let mut search = small_search(0.80);
    search.find_jamming_point().unwrap();
    let phi_entry = search.phi();

    match search.refine_jamming_point(5e-4).unwrap() {
        Refinement::StepTooCoarse { next_step } => {
            assert!((next_step - 5e-5).abs() < 1e-18);
        }
        Refinement::LostContact { .. } => panic!("expected a rollback"),
    }
    // rolled back to the state the call entered with
    assert!((search.phi() - phi_entry).abs() < 1e-12);
}

#[test]
fn locate_by_refinement_converges_to_the_floor() {
    let mut search = small_search(0.80);
    let record = search.locate_by_refinement(5e-3, 5e-4).unwrap();

    assert!(
        record.phi > 0.80 && record.phi < 0.92,
        "phi_J = {} out of expected window",
        record.phi
    );
}

// Full-scale protocol at the original resolution; minutes of wall clock, so
// not part of the default run.
#[test]
#[ignore]
fn find_jamming_point_full_scale() {
    let system = ParticleSystem::<2>::random(100, 0.80, 0.2, Some(1)).unwrap();
    let fire = FireParams {
        force_tolerance: 1e-10,
        ..FireParams::default()
    };
    let mut search = JammingSearch::new(
        system,
        HarmonicSpheres::default(),
        fire,
        SearchParams::default(),
    );

    let record = search.find_jamming_point().unwrap();
    assert!(record.phi > 0.80 && record.phi < 0.90, "phi_J = {}", record.phi);
    assert!(record.pressure > 1e-8);
    assert!(record.pressure < 1e-5);
}
