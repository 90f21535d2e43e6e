//! Shared tracing/logging initialization for the backend and the relay agent.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `sqlx` logs every statement at `info`; keep it quiet unless asked.
const QUIET_DIRECTIVES: &str = "sqlx=warn";

/// Build the env filter: `RUST_LOG` when set, otherwise `default_filter`
/// plus the quiet directives.
pub fn build_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(format!("{default_filter},{QUIET_DIRECTIVES}")),
    }
}

/// Install the global tracing subscriber.
///
/// * `default_filter` -- used when `RUST_LOG` is unset (e.g. `"coop_backend=info"`).
/// * `log_json` -- emit one JSON object per line instead of the human format.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<(), TryInitError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let env_filter = build_filter(rust_log.as_deref(), default_filter);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}
