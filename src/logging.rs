//! Tracing subscriber setup for the server binary.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use crate::config::config::LoggingConfig;

/// build_filter prefers `RUST_LOG` and falls back to the configured filter.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::new(&config.filter),
    }
}

/// init_logging installs the global subscriber.
///
/// # Arguments
/// * `config` - filter directives and output format
///
/// # Returns
/// * `Result<()>` - fails if a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(config);

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .json()
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    Registry::default()
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}
