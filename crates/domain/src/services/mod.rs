//! Shared service helpers: the monitoring signal seam and telemetry wiring.

pub mod signal;
pub mod telemetry;

pub use signal::*;
pub use telemetry::*;
