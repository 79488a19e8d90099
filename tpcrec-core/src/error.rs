//! Error types for tpcrec.

use thiserror::Error;

/// Errors during trajectory integration.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Non-finite value appeared in the integrator state.
    #[error("non-finite state detected at integration step {step}")]
    Numerical {
        /// Step index at which the state became non-finite.
        step: usize,
    },

    /// Invalid tracking input (negative energy, empty gas table, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors during event projection.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Trajectory too short to project (fewer than 2 samples).
    #[error("trajectory has {0} samples, need at least 2")]
    EmptyTrajectory(usize),

    /// Invalid projection input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Point falls outside the pad lookup table.
    ///
    /// Recoverable: the projection loop absorbs this by dropping the sample.
    #[error("point ({x:.4}, {y:.4}) m is outside the pad lookup table")]
    LookupMiss {
        /// X coordinate of the missed point, m.
        x: f64,
        /// Y coordinate of the missed point, m.
        y: f64,
    },
}

/// Errors during Monte-Carlo minimization.
#[derive(Error, Debug)]
pub enum FitError {
    /// Too many consecutive iterations in which every candidate failed.
    #[error("minimization stalled after {failed_iters} fully-failing iterations")]
    Stalled {
        /// Number of consecutive fully-failing iterations.
        failed_iters: usize,
        /// Best-known parameter center at the time of the stall.
        center: [f64; 7],
    },

    /// Cooperative cancellation was requested.
    #[error("minimization cancelled")]
    Cancelled,

    /// Invalid fit input (dimension mismatch, bad hypercube, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Combined error type for the library.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the trajectory integrator.
    #[error("tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// Error from the event projection stage.
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// Error from the Monte-Carlo fitter.
    #[error("fit error: {0}")]
    Fit(#[from] FitError),
}

/// Result type alias using the combined Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = TrackingError::Numerical { step: 42 };
        assert!(err.to_string().contains("step 42"));

        let err = ProjectionError::EmptyTrajectory(1);
        assert!(err.to_string().contains("1 samples"));

        let err = FitError::Cancelled;
        assert_eq!(err.to_string(), "minimization cancelled");
    }

    #[test]
    fn test_combined_conversion() {
        let err: Error = TrackingError::InvalidArgument("bad".into()).into();
        assert!(matches!(err, Error::Tracking(_)));

        let err: Error = FitError::Stalled {
            failed_iters: 3,
            center: [0.0; 7],
        }
        .into();
        assert!(err.to_string().contains("stalled"));
    }
}
