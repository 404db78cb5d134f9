pub mod engine;
pub mod runner;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{record_removal_accepted, HealthEngine, HealthError, IngestReport};
pub use runner::{run_matrix, BuildRunner};
pub use sweep::{AttritionSweeper, SweepReport};
