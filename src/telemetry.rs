//! Logging Setup
//!
//! Installs the global `tracing` subscriber for processes embedding the
//! engine. Library code only emits events; calling this is left to the host.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

/// Map a textual level to a tracing level, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the env filter. A non-empty `RUST_LOG` replaces the configured
/// level; HTTP and Kubernetes client chatter is capped either way.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(config, env.as_deref())
}

fn filter_from(config: &LoggingConfig, env: Option<&str>) -> Result<EnvFilter> {
    let directive = |d: &str| -> Result<Directive> {
        d.parse()
            .map_err(|e| Error::Configuration(format!("Invalid log directive '{}': {}", d, e)))
    };

    let base = match env.map(str::trim).filter(|v| !v.is_empty()) {
        Some(spec) => EnvFilter::try_new(spec).map_err(|e| {
            Error::Configuration(format!("Invalid {} '{}': {}", EnvFilter::DEFAULT_ENV, spec, e))
        })?,
        None => EnvFilter::default().add_directive(parse_level(&config.level).into()),
    };

    Ok(base
        .add_directive(directive("hyper=warn")?)
        .add_directive(directive("reqwest=warn")?)
        .add_directive(directive("kube=info")?)
        .add_directive(directive("tower=warn")?))
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    installed.map_err(|e| Error::Configuration(format!("Logging already initialized: {}", e)))
}
