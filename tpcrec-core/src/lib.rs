//! tpcrec-core: Core types and physics tables for AT-TPC track reconstruction.
//!
//! This crate provides the foundational abstractions shared by the forward
//! simulation and the Monte-Carlo fitter:
//!
//! - [`GasModel`] - tabulated stopping power and beam-energy-vs-depth lookup
//! - [`TrajectoryBatch`] - columnar storage for integrated trajectories
//! - [`DetectorConfig`] - detector and electronics configuration
//! - [`Error`] - combined error type for the reconstruction pipeline

pub mod config;
pub mod constants;
pub mod error;
pub mod gas;
pub mod trajectory;
pub mod vector;

pub use config::{DetectorConfig, NUM_PADS, NUM_TB};
pub use error::{Error, FitError, ProjectionError, Result, TrackingError};
pub use gas::{bethe, GasMixture, GasModel};
pub use trajectory::{TrajectoryBatch, TrajectorySample};
pub use vector::Vec3;
