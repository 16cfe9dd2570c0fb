//! Collaborative note session library.
//!
//! Keeps one note's local edit buffer consistent with the copy held by a
//! managed backend while collaborators type concurrently: remote change
//! notifications are merged without losing in-flight keystrokes, local
//! writes are debounced, and a live roster of co-present collaborators is
//! tracked. Persistence, auth, storage and search stay on the platform and
//! are reached through the trait seams in [`stores`].

pub mod clients;
pub mod config;
pub mod models;
pub mod services;
pub mod session;
pub mod stores;

pub use config::{Config, ConfigError};

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for an embedding application. Honors RUST_LOG when
/// set, otherwise falls back to the configured log level.
pub fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Logging initialized for {}", config.service_name);
}
