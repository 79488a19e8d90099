//! Composite goodness-of-fit between simulated and observed events.

use ndarray::ArrayView2;
use tpcrec_core::error::FitError;
use tpcrec_core::trajectory::TrajectoryBatch;

/// The beam line in the detector frame: x = x_slope z + x_int,
/// y = y_slope z + y_int.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeamPrior {
    /// Slope of the beam x coordinate in z.
    pub x_slope: f64,
    /// Intercept of the beam x coordinate at z = 0, m.
    pub x_int: f64,
    /// Slope of the beam y coordinate in z.
    pub y_slope: f64,
    /// Intercept of the beam y coordinate at z = 0, m.
    pub y_int: f64,
}

impl BeamPrior {
    /// A beam along the chamber axis.
    #[must_use]
    pub fn on_axis() -> Self {
        Self::default()
    }

    /// Beam position at height `z`, m.
    #[inline]
    #[must_use]
    pub fn at(&self, z: f64) -> (f64, f64) {
        (
            self.x_slope * z + self.x_int,
            self.y_slope * z + self.y_int,
        )
    }
}

/// The three chi-squared components of one candidate evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Chi2Set {
    /// Position component.
    pub pos: f64,
    /// Hit-pattern (energy) component.
    pub en: f64,
    /// Vertex-to-beam-line component.
    pub vert: f64,
}

impl Chi2Set {
    /// A set scoring a failed candidate: every component +∞.
    pub const FAILED: Self = Self {
        pos: f64::INFINITY,
        en: f64::INFINITY,
        vert: f64::INFINITY,
    };

    /// Sum of the enabled components.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.pos + self.en + self.vert
    }

    /// True when every component is finite (NaN rejects the candidate).
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pos.is_finite() && self.en.is_finite() && self.vert.is_finite()
    }
}

/// Position chi²: for each experimental point, the squared 3-D distance to
/// the nearest simulated trajectory sample, summed and divided by `norm²`.
///
/// `exp_pos` is an (N x 3) matrix of (x, y, z) in meters.
#[must_use]
pub fn position_chi2(sim: &TrajectoryBatch, exp_pos: &ArrayView2<'_, f64>, norm: f64) -> f64 {
    let n_sim = sim.len();
    if n_sim == 0 {
        return f64::INFINITY;
    }
    let mut total = 0.0;
    for row in exp_pos.rows() {
        let (ex, ey, ez) = (row[0], row[1], row[2]);
        let mut best = f64::INFINITY;
        for i in 0..n_sim {
            let dx = ex - sim.x[i];
            let dy = ey - sim.y[i];
            let dz = ez - sim.z[i];
            let d = dx * dx + dy * dy + dz * dz;
            if d < best {
                best = d;
            }
        }
        total += best;
    }
    total / (norm * norm)
}

/// Hit-pattern chi²: the sum over pads of squared simulated-minus-observed
/// amplitude differences, divided by `(norm_fraction · Σ observed)²`.
pub fn energy_chi2(
    sim_hits: &[f64],
    exp_hits: &[f64],
    norm_fraction: f64,
) -> Result<f64, FitError> {
    if sim_hits.len() != exp_hits.len() {
        return Err(FitError::InvalidArgument(format!(
            "hit patterns differ in length: {} vs {}",
            sim_hits.len(),
            exp_hits.len()
        )));
    }
    let total_exp: f64 = exp_hits.iter().sum();
    if total_exp <= 0.0 {
        return Err(FitError::InvalidArgument(
            "observed hit pattern has no charge".into(),
        ));
    }
    let sum: f64 = sim_hits
        .iter()
        .zip(exp_hits)
        .map(|(s, e)| (s - e) * (s - e))
        .sum();
    let norm = norm_fraction * total_exp;
    Ok(sum / (norm * norm))
}

/// Vertex chi²: squared transverse distance of the fit vertex from the
/// beam line evaluated at the vertex z, divided by `tol²`.
#[must_use]
pub fn vertex_chi2(x0: f64, y0: f64, z0: f64, prior: &BeamPrior, tol: f64) -> f64 {
    let (bx, by) = prior.at(z0);
    let (dx, dy) = (x0 - bx, y0 - by);
    (dx * dx + dy * dy) / (tol * tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tpcrec_core::trajectory::{TrajectoryBatch, TrajectorySample};

    fn line_trajectory(n: usize) -> TrajectoryBatch {
        let mut batch = TrajectoryBatch::default();
        for i in 0..n {
            batch.push(TrajectorySample {
                x: i as f64 * 0.01,
                y: 0.0,
                z: 0.5,
                time: i as f64 * 1e-9,
                energy_u: 2.0,
                azimuth: 0.0,
                polar: std::f64::consts::FRAC_PI_2,
            });
        }
        batch
    }

    #[test]
    fn test_position_chi2_zero_on_subset() {
        let sim = line_trajectory(10);
        let exp = array![[0.0, 0.0, 0.5], [0.03, 0.0, 0.5]];
        // experimental points sit on simulated samples up to rounding
        assert!(position_chi2(&sim, &exp.view(), 0.01) < 1e-20);
    }

    #[test]
    fn test_position_chi2_scales_with_offset() {
        let sim = line_trajectory(10);
        let exp = array![[0.0, 0.005, 0.5]];
        let chi = position_chi2(&sim, &exp.view(), 0.01);
        // (0.005)^2 / (0.01)^2 = 0.25
        assert!((chi - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_position_chi2_empty_sim_is_infinite() {
        let sim = TrajectoryBatch::default();
        let exp = array![[0.0, 0.0, 0.5]];
        assert!(position_chi2(&sim, &exp.view(), 0.01).is_infinite());
    }

    #[test]
    fn test_energy_chi2() {
        let exp = vec![4.0, 6.0, 0.0];
        let sim = vec![4.0, 6.0, 0.0];
        assert_eq!(energy_chi2(&sim, &exp, 0.1).unwrap(), 0.0);

        let sim = vec![5.0, 6.0, 0.0];
        // sum sq diff = 1, norm = (0.1 * 10)^2 = 1
        assert!((energy_chi2(&sim, &exp, 0.1).unwrap() - 1.0).abs() < 1e-12);

        assert!(energy_chi2(&sim, &[1.0], 0.1).is_err());
        assert!(energy_chi2(&[0.0], &[0.0], 0.1).is_err());
    }

    #[test]
    fn test_vertex_chi2_follows_beam_line() {
        let prior = BeamPrior {
            x_slope: 0.01,
            x_int: 0.002,
            y_slope: 0.0,
            y_int: -0.001,
        };
        // on the line: zero
        let (bx, by) = prior.at(0.7);
        assert_eq!(vertex_chi2(bx, by, 0.7, &prior, 1e-3), 0.0);
        // 1 tol off transversely: unity
        let chi = vertex_chi2(bx + 1e-3, by, 0.7, &prior, 1e-3);
        assert!((chi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi2_set_validity() {
        let ok = Chi2Set {
            pos: 1.0,
            en: 2.0,
            vert: 0.5,
        };
        assert!(ok.is_valid());
        assert!((ok.total() - 3.5).abs() < 1e-15);
        assert!(!Chi2Set::FAILED.is_valid());
        let nan = Chi2Set {
            pos: f64::NAN,
            en: 0.0,
            vert: 0.0,
        };
        assert!(!nan.is_valid());
    }
}
