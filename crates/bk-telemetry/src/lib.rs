//! Logging setup for boardkeeper commands.
//!
//! Thin wrapper over `tracing-subscriber`, driven by the `[general]`
//! config section: human-readable output for interactive use, JSON for
//! log shippers. `RUST_LOG` always wins over the configured level.

pub mod logging;

pub use logging::{init_logging, init_logging_json};
