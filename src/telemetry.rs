//! Structured logging setup (spec SPEC_FULL §4.7): `tracing_subscriber`
//! initialized once at process start, replacing ad-hoc `println!`/`eprintln!`
//! with structured spans/events. Grounded on the teacher's `telemetry.rs`,
//! scoped down to console-only output (no file rotation — this indexer has
//! no deployment requirement for it, unlike the teacher's block explorer).

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;

/// Initialize the global tracing subscriber. `RUST_LOG` overrides
/// `config.log.level` when set, matching the teacher's convention.
pub fn init_tracing(config: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = fmt().with_env_filter(env_filter);
    if config.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
