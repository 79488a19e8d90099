//! Per-point and per-pad deviation helpers for fit diagnostics.

use ndarray::{Array2, ArrayView2};
use tpcrec_core::error::FitError;
use tpcrec_core::vector::Vec3;
use tpcrec_core::Result;
use tpcrec_sim::EventGenerator;

/// For each experimental row, the difference `exp_i − sim_NN(i)` where NN
/// is the Euclidean nearest neighbor among the simulated rows in
/// (x, y, z).
///
/// Both matrices must have at least 3 columns; only the first three take
/// part in the match and the difference.
pub fn find_position_deviations(
    sim: &ArrayView2<'_, f64>,
    exp: &ArrayView2<'_, f64>,
) -> Result<Array2<f64>> {
    if sim.ncols() < 3 || exp.ncols() < 3 {
        return Err(FitError::InvalidArgument(format!(
            "position matrices need at least 3 columns, got {} and {}",
            sim.ncols(),
            exp.ncols()
        ))
        .into());
    }
    if sim.nrows() == 0 {
        return Err(FitError::InvalidArgument("simulated matrix is empty".into()).into());
    }

    let mut deviations = Array2::zeros((exp.nrows(), 3));
    for (r, erow) in exp.rows().into_iter().enumerate() {
        let e = Vec3::new(erow[0], erow[1], erow[2]);
        let mut best = f64::INFINITY;
        let mut nearest = Vec3::ZERO;
        for srow in sim.rows() {
            let s = Vec3::new(srow[0], srow[1], srow[2]);
            let d = (e - s).norm_sq();
            if d < best {
                best = d;
                nearest = s;
            }
        }
        deviations[[r, 0]] = e.x - nearest.x;
        deviations[[r, 1]] = e.y - nearest.y;
        deviations[[r, 2]] = e.z - nearest.z;
    }
    Ok(deviations)
}

/// Signed per-pad difference between the hit pattern simulated from
/// (`positions`, `energies`) and the observed one.
pub fn find_hit_pattern_deviation(
    evtgen: &EventGenerator<'_>,
    positions: &[Vec3],
    energies: &[f64],
    exp_hits: &[f64],
) -> Result<Vec<f64>> {
    let sim_hits = evtgen.make_hit_pattern(positions, energies)?;
    if sim_hits.len() != exp_hits.len() {
        return Err(FitError::InvalidArgument(format!(
            "hit patterns differ in length: {} vs {}",
            sim_hits.len(),
            exp_hits.len()
        ))
        .into());
    }
    Ok(sim_hits
        .iter()
        .zip(exp_hits)
        .map(|(s, e)| s - e)
        .collect())
}
