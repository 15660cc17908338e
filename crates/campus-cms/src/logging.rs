//! Logging setup
//!
//! All core components log through `tracing`. The embedding application calls
//! [`init_logging`] once at startup; `RUST_LOG` overrides the configured level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Enable console output
    pub console_output: bool,
    /// Console log level
    pub level: Level,
    /// Include the emitting module in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_output: true,
            level: Level::INFO,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create from `CMS_LOG_LEVEL` and `CMS_LOG_CONSOLE`.
    pub fn from_env() -> Self {
        let console_output = std::env::var("CMS_LOG_CONSOLE")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let level = std::env::var("CMS_LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::INFO);

        Self {
            console_output,
            level,
            ..Default::default()
        }
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
        let console_layer = fmt::layer()
            .with_target(config.with_target)
            .with_filter(filter);
        layers.push(Box::new(console_layer));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Logging initialized at level {}", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert!(config.console_output);
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_init_twice_fails() {
        let config = LoggingConfig {
            console_output: false,
            ..Default::default()
        };
        // Another test may already have installed a subscriber; the second call must fail either way.
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
