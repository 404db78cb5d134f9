use tracing_subscriber::{fmt, EnvFilter};

use bk_core::config::GeneralConfig;

/// Wire `tracing` output for one `bk` invocation, filtered by the
/// `[general]` log level. `RUST_LOG` always wins when set, so a single
/// run can be turned up without touching config.
///
/// Repeated calls are no-ops; command code and tests can both call this
/// freely.
pub fn init_logging(general: &GeneralConfig) {
    fmt()
        .with_env_filter(filter_for(general))
        .with_target(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(project = %general.project_name, "logging ready");
}

/// JSON-formatted variant for shipping scheduled-run logs to a collector.
pub fn init_logging_json(general: &GeneralConfig) {
    fmt()
        .json()
        .with_env_filter(filter_for(general))
        .with_target(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(project = %general.project_name, "logging ready (json)");
}

fn filter_for(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level))
}
