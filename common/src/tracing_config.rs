//! Log output for the SDK binaries and tests.
//!
//! The SDK itself only emits `tracing` events; installing a subscriber is
//! left to the application. `RUST_LOG` takes precedence over the configured
//! level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Name logged when the subscriber is installed
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit one JSON object per event instead of text
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "secret-server".to_string(),
            log_level: "warn".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the filter directive, e.g. `secret_server=debug`.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Log JSON.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Install the global subscriber, logging to stderr so stdout stays free for
/// command output.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    if config.json_output {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
    tracing::debug!(service = %config.service_name, json = config.json_output, "Logging started");
}

/// Install a subscriber writing through the test harness.
///
/// Returns `false` when a subscriber is already installed, which is expected
/// when several tests in one binary call this.
pub fn try_init_tracing(config: &TracingConfig) -> bool {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_quiet() {
        let config = TracingConfig::default();
        assert_eq!(config.log_level, "warn");
        assert!(!config.json_output);
    }

    #[test]
    fn test_tss_config() {
        let config = TracingConfig::default()
            .with_service_name("tss")
            .with_log_level("secret_server=debug")
            .with_json_output();

        assert_eq!(config.service_name, "tss");
        assert_eq!(config.log_level, "secret_server=debug");
        assert!(config.json_output);
    }

    #[test]
    fn test_second_install_is_refused() {
        let config = TracingConfig::default();
        try_init_tracing(&config);
        assert!(!try_init_tracing(&config));
    }
}
