//! Client configuration loaded from the environment.
//!
//! | Variable               | Meaning                                          |
//! |------------------------|--------------------------------------------------|
//! | `TSS_BASE_URL`         | Server URL, e.g. `https://host/SecretServer`     |
//! | `TSS_TENANT`           | Cloud tenant, used when `TSS_BASE_URL` is unset  |
//! | `TSS_TLD`              | Cloud top-level domain (default `com`)           |
//! | `TSS_API_PATH`         | REST API path (default `/api/v1`)                |
//! | `TSS_TOKEN_PATH`       | Token endpoint path (default `/oauth2/token`)    |
//! | `TSS_ACCESS_TOKEN`     | Pre-issued access token                          |
//! | `TSS_USERNAME`         | Username for the password grant                  |
//! | `TSS_PASSWORD`         | Password for the password grant                  |
//! | `TSS_DOMAIN`           | Domain, selects the domain password grant        |
//! | `TSS_TOKEN_DRIFT_SECS` | Token renewal margin (default 300)               |
//! | `TSS_TIMEOUT_SECS`     | Request timeout (default 30)                     |
//! | `TSS_TLS_INSECURE`     | `true` accepts self-signed certificates          |

use crate::{
    auth::{
        AccessTokenAuthorizer, Authorizer, DEFAULT_DRIFT, DomainPasswordGrantAuthorizer,
        GrantRequest, PasswordGrantAuthorizer, TOKEN_PATH_URI,
    },
    client::{API_PATH_URI, DEFAULT_TLD, cloud_url},
    error::{SecretServerError, SecretServerResult},
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use secret_server_common::HttpConfig;
use std::{env, sync::Arc, time::Duration};
use url::Url;

/// How the client authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued access token
    AccessToken(SecretString),
    /// A password grant, with a domain for domain accounts
    Password {
        /// Username
        username: String,
        /// Password
        password: SecretString,
        /// Domain
        domain: Option<String>,
    },
}

/// Secret Server client configuration.
#[derive(Debug, Clone)]
pub struct SecretServerConfig {
    /// Server base URL
    pub base_url: String,
    /// REST API path
    pub api_path: String,
    /// Token endpoint path
    pub token_path: String,
    /// Credentials
    pub credentials: Credentials,
    /// Token renewal margin
    pub token_drift: Duration,
    /// Transport settings
    pub http: HttpConfig,
}

impl SecretServerConfig {
    /// Create a configuration with defaults for everything but the server
    /// and credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            api_path: API_PATH_URI.to_string(),
            token_path: TOKEN_PATH_URI.to_string(),
            credentials,
            token_drift: DEFAULT_DRIFT,
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from environment variables, after reading a
    /// `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> SecretServerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SecretServerResult<Self> {
        let base_url = match (lookup("TSS_BASE_URL"), lookup("TSS_TENANT")) {
            (Some(base_url), _) => base_url,
            (None, Some(tenant)) => {
                cloud_url(&tenant, &lookup("TSS_TLD").unwrap_or_else(|| DEFAULT_TLD.to_string()))
            }
            (None, None) => {
                return Err(SecretServerError::config(
                    "TSS_BASE_URL or TSS_TENANT must be set",
                ));
            }
        };
        Url::parse(&base_url)
            .map_err(|e| SecretServerError::config(format!("Invalid server URL {base_url}: {e}")))?;

        let credentials = match (lookup("TSS_ACCESS_TOKEN"), lookup("TSS_USERNAME")) {
            (Some(token), _) => Credentials::AccessToken(SecretString::from(token)),
            (None, Some(username)) => Credentials::Password {
                username,
                password: SecretString::from(lookup("TSS_PASSWORD").ok_or_else(|| {
                    SecretServerError::config("TSS_PASSWORD must be set with TSS_USERNAME")
                })?),
                domain: lookup("TSS_DOMAIN"),
            },
            (None, None) => {
                return Err(SecretServerError::config(
                    "TSS_ACCESS_TOKEN or TSS_USERNAME must be set",
                ));
            }
        };

        let token_drift = Duration::from_secs(parse_var(&lookup, "TSS_TOKEN_DRIFT_SECS", 300)?);
        let timeout = Duration::from_secs(parse_var(&lookup, "TSS_TIMEOUT_SECS", 30)?);
        let mut http = HttpConfig::default().with_timeout(timeout);
        if parse_var(&lookup, "TSS_TLS_INSECURE", false)? {
            http = http.with_invalid_certs_accepted();
        }

        Ok(Self {
            base_url,
            api_path: lookup("TSS_API_PATH").unwrap_or_else(|| API_PATH_URI.to_string()),
            token_path: lookup("TSS_TOKEN_PATH").unwrap_or_else(|| TOKEN_PATH_URI.to_string()),
            credentials,
            token_drift,
            http,
        })
    }

    /// Build the authorizer for these credentials, using `http` for token
    /// requests.
    #[must_use]
    pub fn build_authorizer(&self, http: Client) -> Arc<dyn Authorizer> {
        match &self.credentials {
            Credentials::AccessToken(token) => {
                Arc::new(AccessTokenAuthorizer::new(token.expose_secret()))
            }
            Credentials::Password {
                username,
                password,
                domain: Some(domain),
            } => {
                let grant_request = GrantRequest::password(username.as_str(), password.expose_secret())
                    .with_domain(domain.as_str());
                Arc::new(
                    DomainPasswordGrantAuthorizer::with_client(
                        &self.base_url,
                        grant_request,
                        &self.token_path,
                        http,
                    )
                    .with_drift(self.token_drift),
                )
            }
            Credentials::Password {
                username,
                password,
                domain: None,
            } => {
                let grant_request = GrantRequest::password(username.as_str(), password.expose_secret());
                Arc::new(
                    PasswordGrantAuthorizer::with_client(
                        &self.base_url,
                        grant_request,
                        &self.token_path,
                        http,
                    )
                    .with_drift(self.token_drift),
                )
            }
        }
    }
}

/// Parse a variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> SecretServerResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .parse()
            .map_err(|e| SecretServerError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
