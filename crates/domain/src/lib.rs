//! Domain-level building blocks shared across the backup and restore crates.
//!
//! Everything that both binaries must agree on lives here: the fixed set of
//! tracked services and their paths, the snapshot key layout, the item model
//! used when replaying a snapshot, and the traits the orchestrators talk to.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use model::*;
pub use services::signal::*;
pub use storage::*;
