//! Logging setup for the harness's own output
//!
//! `RUST_LOG` is managed by the harness for its children, so the harness
//! reads its filter from `TESTBED_LOG` instead.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILTER_ENV: &str = "TESTBED_LOG";
pub const LOG_FORMAT_ENV: &str = "TESTBED_LOG_FORMAT";
const DEFAULT_FILTER: &str = "warn,testbed=info";

/// Install the global subscriber: `json`, `pretty`, or compact (default)
pub fn init() -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_default();

    let registry = tracing_subscriber::registry().with(env_filter);
    match log_format.as_str() {
        // CI: JSON structured logging
        "json" => registry.with(fmt::layer().json()).try_init()?,
        "pretty" => registry.with(fmt::layer().pretty()).try_init()?,
        // Terminal: one short line per lifecycle step
        _ => registry
            .with(fmt::layer().compact().without_time().with_target(false))
            .try_init()?,
    }

    Ok(())
}
