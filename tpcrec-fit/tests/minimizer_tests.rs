//! End-to-end minimizer scenarios: synthetic-event recovery, contraction,
//! and seeded reproducibility.

use ndarray::Array2;
use std::f64::consts::PI;
use std::sync::atomic::AtomicBool;
use tpcrec_core::gas::GasModel;
use tpcrec_core::{DetectorConfig, Vec3};
use tpcrec_fit::chi2::{position_chi2, vertex_chi2};
use tpcrec_fit::{BeamPrior, McMinimizer, MinimizerConfig};
use tpcrec_sim::{EventGenerator, PadPlane, Tracker, TrackerConfig};

/// True parameters of the synthetic event: vertex at the chamber entrance,
/// a downward 45-degree launch, 0.5 T field.
const P_STAR: [f64; 7] = [0.0, 0.0, 1.0, 1.5, PI / 4.0, 3.0 * PI / 4.0, 0.5];
const SIGMA0: [f64; 7] = [0.01, 0.01, 0.02, 0.2, 0.2, 0.2, 0.05];

/// A proton in a synthetic gas whose stopping power grows as sqrt(E),
/// chosen so the 1.5 MeV/u track ranges out inside a 1 m chamber after a
/// couple of gyration radians; both endpoints and curvature then
/// constrain the fit.
fn setup() -> (GasModel, PadPlane, DetectorConfig) {
    let gas = GasModel::from_energy_loss(|en| 2.2 * en.max(1.0e-6).sqrt(), 15.0).unwrap();
    let plane = PadPlane::canonical(0.0);
    let config = DetectorConfig::default()
        .with_species(1, 1)
        .with_efield(Vec3::new(0.0, 0.0, -9.2e3))
        .with_bfield(Vec3::new(0.0, 0.0, 0.5))
        .with_diff_sigma(0.0);
    (gas, plane, config)
}

fn tracker_options() -> TrackerConfig {
    TrackerConfig::default()
        .with_chamber(1.0, 1.0)
        .with_max_samples(5000)
}

fn fit_config() -> MinimizerConfig {
    MinimizerConfig::default()
        .with_components(true, false, true)
        .with_norms(0.01, 0.10, 5.0e-4)
}

#[test]
fn test_recovers_synthetic_event_parameters() {
    let (gas, plane, config) = setup();
    let tracker = Tracker::new(&gas, config.clone()).with_options(tracker_options());
    let evtgen = EventGenerator::new(&plane, config).unwrap();

    let truth = tracker
        .track_particle(P_STAR[0], P_STAR[1], P_STAR[2], P_STAR[3], P_STAR[4], P_STAR[5])
        .unwrap();
    assert!(truth.len() > 100, "expected a long stopping track");
    let exp_pos = truth.position_matrix();

    let mut mini = McMinimizer::new(&tracker, &evtgen, fit_config(), 42);
    let cancel = AtomicBool::new(false);
    let result = mini
        .minimize(
            &P_STAR,
            &SIGMA0,
            &exp_pos.view(),
            &[],
            &BeamPrior::on_axis(),
            &cancel,
        )
        .unwrap();

    // ten contractions at 0.8 happened exactly
    let shrink = 0.8_f64.powi(10);
    for d in 0..7 {
        let expected = SIGMA0[d] * shrink;
        assert!(
            (result.sigma_final[d] - expected).abs() < 1e-12 * expected.max(1e-30),
            "dim {d}: sigma {} vs {expected}",
            result.sigma_final[d]
        );
    }

    // the center recovers to within the initial sigma of the truth in
    // every dimension, and resolves the angles much more tightly
    for d in 0..7 {
        let err = (result.ctr[d] - P_STAR[d]).abs();
        assert!(
            err <= SIGMA0[d],
            "dim {d}: error {err} exceeds sigma0 {}",
            SIGMA0[d]
        );
    }
    assert!((result.ctr[4] - P_STAR[4]).abs() <= 2.0 * SIGMA0[4] * shrink);
    assert!((result.ctr[5] - P_STAR[5]).abs() <= 3.0 * SIGMA0[5] * shrink);

    // the fitted center beats a deliberately offset parameter set by a
    // wide margin
    let final_total: f64 = (0..3).map(|c| result.min_chis[[9, c]]).sum();
    let mut offset = P_STAR;
    for d in 0..7 {
        offset[d] += SIGMA0[d] / 4.0;
    }
    let off_traj = tracker
        .track_particle_in_field(
            offset[0],
            offset[1],
            offset[2],
            offset[3],
            offset[4],
            offset[5],
            Vec3::new(0.0, 0.0, offset[6]),
        )
        .unwrap();
    let off_total = position_chi2(&off_traj, &exp_pos.view(), 0.01)
        + vertex_chi2(offset[0], offset[1], offset[2], &BeamPrior::on_axis(), 5.0e-4);
    assert!(
        final_total * 10.0 < off_total,
        "final chi2 {final_total} vs offset chi2 {off_total}"
    );

    // winners are recorded for every iteration
    assert_eq!(result.good_param_idx.len(), 10);
    assert!(result.good_param_idx.iter().all(|idx| *idx != usize::MAX));
}

#[test]
fn test_bit_for_bit_reproducibility() {
    let (gas, plane, config) = setup();
    let tracker = Tracker::new(&gas, config.clone()).with_options(tracker_options());
    let evtgen = EventGenerator::new(&plane, config).unwrap();

    let truth = tracker
        .track_particle(P_STAR[0], P_STAR[1], P_STAR[2], P_STAR[3], P_STAR[4], P_STAR[5])
        .unwrap();
    let exp_pos = truth.position_matrix();
    let cfg = fit_config().with_draws(3, 40);
    let cancel = AtomicBool::new(false);

    let run = |seed: u64| {
        let mut mini = McMinimizer::new(&tracker, &evtgen, cfg, seed);
        mini.minimize(
            &P_STAR,
            &SIGMA0,
            &exp_pos.view(),
            &[],
            &BeamPrior::on_axis(),
            &cancel,
        )
        .unwrap()
    };

    let a = run(1234);
    let b = run(1234);
    assert_eq!(a.ctr, b.ctr);
    assert_eq!(a.all_params, b.all_params);
    assert_eq!(a.min_chis, b.min_chis);
    assert_eq!(a.good_param_idx, b.good_param_idx);
}

#[test]
fn test_all_params_canonical_order() {
    let (gas, plane, config) = setup();
    let tracker = Tracker::new(&gas, config.clone()).with_options(tracker_options());
    let evtgen = EventGenerator::new(&plane, config).unwrap();

    let truth = tracker
        .track_particle(P_STAR[0], P_STAR[1], P_STAR[2], P_STAR[3], P_STAR[4], P_STAR[5])
        .unwrap();
    let exp_pos = truth.position_matrix();
    let cfg = fit_config().with_draws(4, 25);
    let cancel = AtomicBool::new(false);

    let mut mini = McMinimizer::new(&tracker, &evtgen, cfg, 5);
    let result = mini
        .minimize(
            &P_STAR,
            &SIGMA0,
            &exp_pos.view(),
            &[],
            &BeamPrior::on_axis(),
            &cancel,
        )
        .unwrap();

    assert_eq!(result.all_params.dim(), (100, 7));

    // every sample of every iteration lies inside a hypercube no wider
    // than the initial one around some center; in particular the energy
    // column stays near the truth
    let mut hw: [f64; 7] = SIGMA0;
    let mut ctr = P_STAR;
    for iter in 0..4 {
        for k in 0..25 {
            let row = iter * 25 + k;
            for d in 0..7 {
                let v = result.all_params[[row, d]];
                assert!(
                    (v - ctr[d]).abs() <= hw[d] / 2.0 + 1e-12,
                    "iter {iter} sample {k} dim {d} outside its hypercube"
                );
            }
        }
        // the next iteration re-centers on this iteration's winner
        let win = result.good_param_idx[iter];
        for d in 0..7 {
            ctr[d] = result.all_params[[win, d]];
            hw[d] *= 0.8;
        }
    }

    // an independent exhaustive argmin over each block agrees with the
    // recorded winner rows (verified indirectly through the invariant
    // that the final center equals the last winner row)
    let last = result.good_param_idx[3];
    for d in 0..7 {
        assert_eq!(result.ctr[d], result.all_params[[last, d]]);
    }

    // the matrix interchange shape survives a round trip through ndarray
    let copy: Array2<f64> = result.all_params.clone();
    assert_eq!(copy, result.all_params);
}
