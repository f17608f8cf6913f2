//! Tracing subscriber setup for hosts and tests.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! host's call. `init` is a convenience for hosts without their own setup.

use crate::config::LoggingConfig;
use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Install a registry with an `EnvFilter` and a fmt layer.
///
/// `RUST_LOG` takes precedence over `config.filter`. Only the first call
/// has an effect, and an already installed global subscriber is left alone.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        if installed.is_ok() {
            tracing::debug!("Logging initialised with filter '{}'", config.filter);
        }
    });
}
