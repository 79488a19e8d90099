//! tpcrec-fit: Monte-Carlo parameter estimation for AT-TPC events.
//!
//! Given observed hit positions and a hit pattern, the fitter searches the
//! 7-dimensional parameter space (vertex, energy per nucleon, emission
//! angles, field magnitude) with a contracting-hypercube Monte Carlo,
//! scoring each candidate by forward-simulating it with [`tpcrec_sim`] and
//! comparing against the observations.

pub mod chi2;
pub mod deviations;
pub mod minimizer;

pub use chi2::{BeamPrior, Chi2Set};
pub use deviations::{find_hit_pattern_deviation, find_position_deviations};
pub use minimizer::{McMinimizer, MinimizeResult, MinimizerConfig};
