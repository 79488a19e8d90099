//! tpcrec-sim: Forward simulation for AT-TPC track reconstruction.
//!
//! This crate turns a hypothesized set of kinematic parameters into what the
//! detector would have recorded:
//!
//! - [`Tracker`] - integrates the equation of motion through the gas
//! - [`PadPlane`] - maps projected positions to readout pads
//! - [`EventGenerator`] - projects a trajectory to per-pad electronics signals
//! - [`ObservedEvent`] - transforms of recorded traces into fit observations

pub mod event;
pub mod observed;
pub mod padplane;
pub mod tracker;

pub use event::{EventGenerator, PadSignalBatch, PeaksTable};
pub use observed::ObservedEvent;
pub use padplane::{generate_pad_coordinates, PadPlane, NO_PAD};
pub use tracker::{Tracker, TrackerConfig};
