//! Transport for Secret Server calls.
//!
//! The token endpoint and the REST API share one `reqwest::Client` per
//! configuration so connections to the server are reused across calls.

use reqwest::Client;
use std::time::Duration;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("secret-server-sdk-rust/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_MAX_IDLE: usize = 4;

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout, including reading the body
    pub timeout: Duration,
    /// TCP and TLS connect timeout
    pub connect_timeout: Duration,
    /// How long an idle connection to the server is kept
    pub idle_timeout: Duration,
    /// Idle connections kept per host
    pub max_idle_per_host: usize,
    /// `User-Agent` header
    pub user_agent: String,
    /// Accept self-signed server certificates (on-premises test installs)
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_idle_per_host: DEFAULT_MAX_IDLE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Set the whole-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Keep up to `max_per_host` idle connections for `timeout`.
    #[must_use]
    pub const fn with_idle_connections(mut self, max_per_host: usize, timeout: Duration) -> Self {
        self.max_idle_per_host = max_per_host;
        self.idle_timeout = timeout;
        self
    }

    /// Replace the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Accept invalid server certificates.
    #[must_use]
    pub const fn with_invalid_certs_accepted(mut self) -> Self {
        self.accept_invalid_certs = true;
        self
    }
}

/// Build the client used for token and REST API requests.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
///
/// # Examples
///
/// ```
/// use secret_server_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// assert!(build_http_client(&config).is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .use_rustls_tls()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.idle_timeout)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_idle_per_host, DEFAULT_MAX_IDLE);
        assert!(!config.accept_invalid_certs);
        assert!(config.user_agent.starts_with("secret-server-sdk-rust/"));
    }

    #[test]
    fn test_idle_connections() {
        let config = HttpConfig::default().with_idle_connections(1, Duration::from_secs(5));
        assert_eq!(config.max_idle_per_host, 1);
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_insecure_client_builds() {
        let config = HttpConfig::default()
            .with_user_agent("tss-tests")
            .with_invalid_certs_accepted();
        assert!(config.accept_invalid_certs);
        assert!(build_http_client(&config).is_ok());
    }
}
