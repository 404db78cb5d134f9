pub mod config;
pub mod hosting;
pub mod registry;
pub mod store;
pub mod types;
pub mod versionfile;
