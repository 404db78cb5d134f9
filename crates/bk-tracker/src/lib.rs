pub mod tags;
pub mod tracker;

pub use tags::{GitTagSource, StableTag, TagSource};
pub use tracker::{TrackerReport, VersionTracker, VersionUpdate};
