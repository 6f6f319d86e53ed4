//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` wins, otherwise the configured directive.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?)
}

/// Initialize the global subscriber with JSON or human-readable output.
///
/// # Examples
///
/// ```no_run
/// use limitlab::config::LoggingConfig;
/// use limitlab::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "limitlab=debug".to_string(),
///     json_format: true,
/// };
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config)?);

    if config.json_format {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer().with_target(true).with_level(true);
        registry.with(layer).try_init()?;
    }

    Ok(())
}
