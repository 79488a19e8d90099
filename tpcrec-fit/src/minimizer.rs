//! Contracting-hypercube Monte-Carlo parameter search.

use crate::chi2::{energy_chi2, position_chi2, vertex_chi2, BeamPrior, Chi2Set};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tpcrec_core::error::{Error, FitError};
use tpcrec_core::vector::Vec3;
use tpcrec_core::{Result, NUM_PADS};
use tpcrec_sim::{EventGenerator, Tracker};

/// Number of fitted parameters: (x0, y0, z0, E/u, azimuth, polar, |B|).
pub const NUM_PARAMS: usize = 7;

/// Consecutive fully-failing iterations tolerated before the search stalls.
const MAX_FAILED_ITERS: usize = 3;

/// Options for the Monte-Carlo search and the composite chi².
#[derive(Clone, Copy, Debug)]
pub struct MinimizerConfig {
    /// Number of contraction iterations.
    pub num_iters: usize,
    /// Candidates drawn per iteration.
    pub num_pts: usize,
    /// Hypercube contraction factor per iteration, in (0, 1].
    pub red_factor: f64,
    /// Enable the position component.
    pub pos_chi2_enabled: bool,
    /// Enable the hit-pattern component.
    pub en_chi2_enabled: bool,
    /// Enable the vertex-to-beam-line component.
    pub vert_chi2_enabled: bool,
    /// Position component normalizer, m.
    pub pos_chi2_norm: f64,
    /// Hit-pattern normalizer as a fraction of the observed total.
    pub en_chi2_norm_fraction: f64,
    /// Vertex component tolerance, m.
    pub vert_chi2_tol: f64,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            num_iters: 10,
            num_pts: 200,
            red_factor: 0.8,
            pos_chi2_enabled: true,
            en_chi2_enabled: true,
            vert_chi2_enabled: true,
            pos_chi2_norm: 0.01,
            en_chi2_norm_fraction: 0.10,
            vert_chi2_tol: 5.0e-4,
        }
    }
}

impl MinimizerConfig {
    /// Set the iteration and candidate counts.
    #[must_use]
    pub fn with_draws(mut self, num_iters: usize, num_pts: usize) -> Self {
        self.num_iters = num_iters;
        self.num_pts = num_pts;
        self
    }

    /// Set the contraction factor.
    #[must_use]
    pub fn with_red_factor(mut self, red_factor: f64) -> Self {
        self.red_factor = red_factor;
        self
    }

    /// Enable or disable the individual chi² components.
    #[must_use]
    pub fn with_components(mut self, pos: bool, en: bool, vert: bool) -> Self {
        self.pos_chi2_enabled = pos;
        self.en_chi2_enabled = en;
        self.vert_chi2_enabled = vert;
        self
    }

    /// Set the chi² normalizers.
    #[must_use]
    pub fn with_norms(mut self, pos_norm: f64, en_fraction: f64, vert_tol: f64) -> Self {
        self.pos_chi2_norm = pos_norm;
        self.en_chi2_norm_fraction = en_fraction;
        self.vert_chi2_tol = vert_tol;
        self
    }

    fn validate(&self) -> std::result::Result<(), FitError> {
        if self.num_iters == 0 || self.num_pts == 0 {
            return Err(FitError::InvalidArgument(format!(
                "need at least one iteration and one candidate, got {} x {}",
                self.num_iters, self.num_pts
            )));
        }
        if !(self.red_factor > 0.0 && self.red_factor <= 1.0) {
            return Err(FitError::InvalidArgument(format!(
                "contraction factor must be in (0, 1], got {}",
                self.red_factor
            )));
        }
        if !(self.pos_chi2_norm > 0.0)
            || !(self.en_chi2_norm_fraction > 0.0)
            || !(self.vert_chi2_tol > 0.0)
        {
            return Err(FitError::InvalidArgument(
                "chi2 normalizers must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one minimization.
#[derive(Clone, Debug)]
pub struct MinimizeResult {
    /// Final parameter center.
    pub ctr: [f64; NUM_PARAMS],
    /// Per-iteration minimum chi² triples (pos, en, vert), num_iters x 3.
    /// Fully-failing iterations record +∞.
    pub min_chis: Array2<f64>,
    /// Every sampled parameter vector in iteration-major, sample-minor
    /// order, (num_iters · num_pts) x 7.
    pub all_params: Array2<f64>,
    /// Row index into `all_params` of each iteration's winner;
    /// `usize::MAX` for fully-failing iterations.
    pub good_param_idx: Vec<usize>,
    /// Hypercube width extents after the final contraction; candidates are
    /// drawn within half of these around the center.
    pub sigma_final: [f64; NUM_PARAMS],
}

/// Monte-Carlo minimizer over the 7-parameter kinematics space.
///
/// Holds non-owning references to a tracker and an event generator whose
/// lifetimes must enclose the minimizer's. The RNG is owned and seeded at
/// construction: with a fixed seed, inputs, and thread pool the returned
/// matrices are reproducible bit for bit, because all candidates are drawn
/// sequentially before the parallel evaluation and ties in the minimum
/// reduction break toward the lowest sample index.
pub struct McMinimizer<'a> {
    tracker: &'a Tracker<'a>,
    evtgen: &'a EventGenerator<'a>,
    config: MinimizerConfig,
    rng: StdRng,
}

impl<'a> McMinimizer<'a> {
    /// Create a minimizer with the given configuration and RNG seed.
    #[must_use]
    pub fn new(
        tracker: &'a Tracker<'a>,
        evtgen: &'a EventGenerator<'a>,
        config: MinimizerConfig,
        seed: u64,
    ) -> Self {
        Self {
            tracker,
            evtgen,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Search for the parameter vector whose simulated event best matches
    /// the observations.
    ///
    /// `ctr0` and `sigma0` define the initial hypercube (center and full
    /// widths); `exp_pos` is an (N x 3) matrix of observed hit positions in
    /// meters; `exp_hits` is the observed hit pattern (length equal to the
    /// pad count) and may be empty when the hit-pattern component is
    /// disabled. The `cancel` flag is checked at iteration boundaries.
    pub fn minimize(
        &mut self,
        ctr0: &[f64; NUM_PARAMS],
        sigma0: &[f64; NUM_PARAMS],
        exp_pos: &ArrayView2<'_, f64>,
        exp_hits: &[f64],
        prior: &BeamPrior,
        cancel: &AtomicBool,
    ) -> Result<MinimizeResult> {
        self.config.validate().map_err(Error::from)?;
        if self.config.pos_chi2_enabled && (exp_pos.ncols() != 3 || exp_pos.nrows() == 0) {
            return Err(FitError::InvalidArgument(format!(
                "experimental positions must be a non-empty N x 3 matrix, got {} x {}",
                exp_pos.nrows(),
                exp_pos.ncols()
            ))
            .into());
        }
        if self.config.en_chi2_enabled && exp_hits.len() != NUM_PADS {
            return Err(FitError::InvalidArgument(format!(
                "experimental hit pattern has {} entries, expected {NUM_PADS}",
                exp_hits.len()
            ))
            .into());
        }
        if sigma0.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(
                FitError::InvalidArgument("hypercube widths must be non-negative".into()).into(),
            );
        }

        let config = self.config;
        let mut ctr = *ctr0;
        let mut sigma = *sigma0;
        let mut min_chis = Array2::from_elem((config.num_iters, 3), f64::INFINITY);
        let mut all_params = Array2::zeros((config.num_iters * config.num_pts, NUM_PARAMS));
        let mut good_param_idx = Vec::with_capacity(config.num_iters);
        let mut failed_iters = 0usize;

        for iter in 0..config.num_iters {
            if cancel.load(Ordering::Relaxed) {
                return Err(FitError::Cancelled.into());
            }

            // draw the whole iteration sequentially so the parallel phase
            // cannot perturb the RNG stream
            let candidates: Vec<[f64; NUM_PARAMS]> = (0..config.num_pts)
                .map(|_| {
                    let mut p = [0.0; NUM_PARAMS];
                    for d in 0..NUM_PARAMS {
                        p[d] = ctr[d] + sigma[d] * (self.rng.gen::<f64>() - 0.5);
                    }
                    p
                })
                .collect();
            for (k, p) in candidates.iter().enumerate() {
                for d in 0..NUM_PARAMS {
                    all_params[[iter * config.num_pts + k, d]] = p[d];
                }
            }

            let this = &*self;
            let scores: Vec<Chi2Set> = candidates
                .par_iter()
                .map(|p| this.evaluate(p, exp_pos, exp_hits, prior))
                .collect();

            // deterministic min reduction; strict < keeps the lowest index
            // on ties
            let mut winner: Option<(usize, f64)> = None;
            for (k, set) in scores.iter().enumerate() {
                let total = set.total();
                if total.is_finite() && winner.map_or(true, |(_, best)| total < best) {
                    winner = Some((k, total));
                }
            }

            match winner {
                Some((k, _)) => {
                    ctr = candidates[k];
                    min_chis[[iter, 0]] = scores[k].pos;
                    min_chis[[iter, 1]] = scores[k].en;
                    min_chis[[iter, 2]] = scores[k].vert;
                    good_param_idx.push(iter * config.num_pts + k);
                    for s in &mut sigma {
                        *s *= config.red_factor;
                    }
                    failed_iters = 0;
                }
                None => {
                    good_param_idx.push(usize::MAX);
                    failed_iters += 1;
                    if failed_iters >= MAX_FAILED_ITERS {
                        return Err(FitError::Stalled {
                            failed_iters,
                            center: ctr,
                        }
                        .into());
                    }
                }
            }
        }

        Ok(MinimizeResult {
            ctr,
            min_chis,
            all_params,
            good_param_idx,
            sigma_final: sigma,
        })
    }

    /// Score one candidate; any failure along the simulation chain maps to
    /// an all-infinite set rather than an error.
    fn evaluate(
        &self,
        p: &[f64; NUM_PARAMS],
        exp_pos: &ArrayView2<'_, f64>,
        exp_hits: &[f64],
        prior: &BeamPrior,
    ) -> Chi2Set {
        let config = &self.config;
        let bfield = self.bfield_for(p[6]);
        let Ok(traj) = self
            .tracker
            .track_particle_in_field(p[0], p[1], p[2], p[3], p[4], p[5], bfield)
        else {
            return Chi2Set::FAILED;
        };
        if traj.len() < 2 {
            return Chi2Set::FAILED;
        }

        let pos = if config.pos_chi2_enabled {
            position_chi2(&traj, exp_pos, config.pos_chi2_norm)
        } else {
            0.0
        };

        let en = if config.en_chi2_enabled {
            let positions = traj.positions();
            let energies = traj.total_energies(self.evtgen.config().mass_num);
            let Ok(sim_hits) = self.evtgen.make_hit_pattern(&positions, &energies) else {
                return Chi2Set::FAILED;
            };
            match energy_chi2(&sim_hits, exp_hits, config.en_chi2_norm_fraction) {
                Ok(chi) => chi,
                Err(_) => return Chi2Set::FAILED,
            }
        } else {
            0.0
        };

        let vert = if config.vert_chi2_enabled {
            vertex_chi2(p[0], p[1], p[2], prior, config.vert_chi2_tol)
        } else {
            0.0
        };

        let set = Chi2Set { pos, en, vert };
        if set.is_valid() {
            set
        } else {
            Chi2Set::FAILED
        }
    }

    /// Scale the configured field direction to the candidate magnitude;
    /// a zero configured field points the candidate field along +z.
    fn bfield_for(&self, bmag: f64) -> Vec3 {
        let b = self.evtgen.config().bfield;
        let norm = b.norm();
        if norm > 0.0 {
            b * (bmag / norm)
        } else {
            Vec3::new(0.0, 0.0, bmag)
        }
    }
}
