//! Tracing subscriber setup for binaries and long-running services.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process that embeds Rollcall.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingYamlConfig;

/// Install a global fmt subscriber. `RUST_LOG` overrides `cfg.level`.
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init_tracing(cfg: &LoggingYamlConfig) -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if cfg.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    }
}
