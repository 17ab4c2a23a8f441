//! Authorizers producing the bearer token for REST API calls.
//!
//! An [`Authorizer`] is shared behind an `Arc` so several clients (e.g. a
//! cloud and an on-premises [`SecretServer`](crate::SecretServer)) can reuse
//! one token cache.

use crate::{
    client::{DEFAULT_TLD, cloud_url, join_url},
    error::{SecretServerError, SecretServerResult},
    response::{ApiResponse, process},
};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use secret_server_common::{HttpConfig, build_http_client};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Default token endpoint path.
pub const TOKEN_PATH_URI: &str = "/oauth2/token";

/// Default margin subtracted from a grant's lifetime to force early renewal.
pub const DEFAULT_DRIFT: Duration = Duration::from_secs(300);

/// Main trait for all authorization methods.
#[async_trait]
pub trait Authorizer: Send + Sync + std::fmt::Debug {
    /// Returns the access token to present as a bearer token.
    async fn get_access_token(&self) -> SecretServerResult<SecretString>;

    /// Returns `existing` with an `Authorization: Bearer` header added,
    /// replacing any `Authorization` header already present.
    async fn headers(&self, existing: HeaderMap) -> SecretServerResult<HeaderMap> {
        let token = self.get_access_token().await?;
        add_bearer_token_authorization_header(token.expose_secret(), existing)
    }
}

/// Adds an HTTP `Authorization` header containing the `Bearer` token.
///
/// # Errors
///
/// Returns [`SecretServerError::InvalidConfig`] if the token cannot be used
/// as a header value.
pub fn add_bearer_token_authorization_header(
    bearer_token: &str,
    mut existing: HeaderMap,
) -> SecretServerResult<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
        .map_err(|_| SecretServerError::config("access token is not a valid header value"))?;
    value.set_sensitive(true);
    existing.insert(AUTHORIZATION, value);
    Ok(existing)
}

/// Uses a pre-existing access token; never refreshes.
#[derive(Debug, Clone)]
pub struct AccessTokenAuthorizer {
    access_token: SecretString,
}

impl AccessTokenAuthorizer {
    /// Wrap an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
        }
    }
}

#[async_trait]
impl Authorizer for AccessTokenAuthorizer {
    async fn get_access_token(&self) -> SecretServerResult<SecretString> {
        Ok(self.access_token.clone())
    }
}

/// The form submitted to the token endpoint.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    username: String,
    password: SecretString,
    domain: Option<String>,
}

impl GrantRequest {
    /// OAuth2 grant type used for every request.
    pub const GRANT_TYPE: &'static str = "password";

    /// A password grant.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            domain: None,
        }
    }

    /// Add the domain field.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// The username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The domain, for domain grants.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Form fields in submission order.
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("password", self.password.expose_secret()),
            ("grant_type", Self::GRANT_TYPE),
        ];
        if let Some(domain) = &self.domain {
            form.push(("domain", domain.as_str()));
        }
        form
    }
}

/// An *OAuth2 Access Grant* returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    /// The bearer token
    pub access_token: SecretString,
    /// Lifetime in seconds from issue
    pub expires_in: u64,
    /// Token type, normally `bearer`
    pub token_type: Option<String>,
    /// Refresh token, when the server issues one
    pub refresh_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct RawAccessGrant {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl From<RawAccessGrant> for AccessGrant {
    fn from(raw: RawAccessGrant) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            expires_in: raw.expires_in,
            token_type: raw.token_type,
            refresh_token: raw.refresh_token.map(SecretString::from),
        }
    }
}

#[derive(Debug)]
struct CachedGrant {
    grant: AccessGrant,
    issued_at: Instant,
}

impl CachedGrant {
    /// Valid while `now < issued_at + expires_in - drift`.
    fn is_valid(&self, drift: Duration) -> bool {
        let lifetime = Duration::from_secs(self.grant.expires_in).saturating_sub(drift);
        self.issued_at.elapsed() < lifetime
    }
}

/// Uses a username and password to obtain and cache an access grant.
#[derive(Debug)]
pub struct PasswordGrantAuthorizer {
    token_url: String,
    grant_request: GrantRequest,
    http: Client,
    drift: Duration,
    cache: Mutex<Option<CachedGrant>>,
}

impl PasswordGrantAuthorizer {
    /// Create an authorizer for the token endpoint under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SecretServerResult<Self> {
        Self::with_token_path(base_url, username, password, TOKEN_PATH_URI)
    }

    /// Create an authorizer with a non-default token path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_token_path(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        token_path_uri: &str,
    ) -> SecretServerResult<Self> {
        Self::from_grant_request(
            base_url,
            GrantRequest::password(username, password),
            token_path_uri,
        )
    }

    /// Create an authorizer submitting `grant_request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_grant_request(
        base_url: &str,
        grant_request: GrantRequest,
        token_path_uri: &str,
    ) -> SecretServerResult<Self> {
        let http = build_http_client(&HttpConfig::default())?;
        Ok(Self::with_client(base_url, grant_request, token_path_uri, http))
    }

    /// Create an authorizer that sends token requests through `http`.
    #[must_use]
    pub fn with_client(
        base_url: &str,
        grant_request: GrantRequest,
        token_path_uri: &str,
        http: Client,
    ) -> Self {
        Self {
            token_url: join_url(base_url, token_path_uri),
            grant_request,
            http,
            drift: DEFAULT_DRIFT,
            cache: Mutex::new(None),
        }
    }

    /// Create an authorizer for a Secret Server Cloud tenant on the `.com`
    /// domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn cloud(
        tenant: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SecretServerResult<Self> {
        Self::new(&cloud_url(tenant, DEFAULT_TLD), username, password)
    }

    /// Set the renewal margin.
    #[must_use]
    pub const fn with_drift(mut self, drift: Duration) -> Self {
        self.drift = drift;
        self
    }

    /// The token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// The grant request submitted to the token endpoint.
    #[must_use]
    pub const fn grant_request(&self) -> &GrantRequest {
        &self.grant_request
    }

    /// The renewal margin.
    #[must_use]
    pub const fn drift(&self) -> Duration {
        self.drift
    }

    /// Gets an access grant from the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns a client or service error for unsuccessful responses, and
    /// [`SecretServerError::InvalidResponse`] when a successful response is
    /// not a JSON access grant (the server answers some misconfigurations
    /// with `200` and an HTML page).
    #[instrument(skip(self), fields(token_url = %self.token_url, username = %self.grant_request.username))]
    pub async fn get_access_grant(&self) -> SecretServerResult<AccessGrant> {
        debug!("Requesting access grant");
        let response = self
            .http
            .post(&self.token_url)
            .form(&self.grant_request.form())
            .send()
            .await?;
        let response = process(ApiResponse::read(response).await?)?;

        match response.json::<RawAccessGrant>() {
            Ok(raw) => Ok(raw.into()),
            Err(err) => Err(SecretServerError::invalid_response(
                format!("token endpoint did not return an access grant: {err}"),
                response,
            )),
        }
    }

    /// Refreshes the cached grant if there is none, or if it expires within
    /// the drift.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::get_access_grant`].
    pub async fn refresh(&self) -> SecretServerResult<()> {
        let mut cache = self.cache.lock().await;
        self.refresh_locked(&mut cache).await
    }

    /// Discards the cached grant; the next call requests a new one.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn refresh_locked(&self, cache: &mut Option<CachedGrant>) -> SecretServerResult<()> {
        if cache.as_ref().is_some_and(|c| c.is_valid(self.drift)) {
            return Ok(());
        }

        let grant = self.get_access_grant().await?;
        info!(expires_in = grant.expires_in, "Refreshed access grant");
        *cache = Some(CachedGrant {
            grant,
            issued_at: Instant::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl Authorizer for PasswordGrantAuthorizer {
    async fn get_access_token(&self) -> SecretServerResult<SecretString> {
        let mut cache = self.cache.lock().await;
        self.refresh_locked(&mut cache).await?;
        cache
            .as_ref()
            .map(|c| c.grant.access_token.clone())
            .ok_or_else(|| SecretServerError::config("no access grant available"))
    }
}

/// A [`PasswordGrantAuthorizer`] whose grant request carries a domain.
#[derive(Debug)]
pub struct DomainPasswordGrantAuthorizer {
    inner: PasswordGrantAuthorizer,
}

impl DomainPasswordGrantAuthorizer {
    /// Create a domain authorizer for the token endpoint under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        domain: impl Into<String>,
        password: impl Into<String>,
    ) -> SecretServerResult<Self> {
        Self::with_token_path(base_url, username, domain, password, TOKEN_PATH_URI)
    }

    /// Create a domain authorizer with a non-default token path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_token_path(
        base_url: &str,
        username: impl Into<String>,
        domain: impl Into<String>,
        password: impl Into<String>,
        token_path_uri: &str,
    ) -> SecretServerResult<Self> {
        let http = build_http_client(&HttpConfig::default())?;
        Ok(Self::with_client(
            base_url,
            GrantRequest::password(username, password).with_domain(domain),
            token_path_uri,
            http,
        ))
    }

    /// Create a domain authorizer that sends token requests through `http`.
    /// `grant_request` should carry a domain (see [`GrantRequest::with_domain`]).
    #[must_use]
    pub fn with_client(
        base_url: &str,
        grant_request: GrantRequest,
        token_path_uri: &str,
        http: Client,
    ) -> Self {
        Self {
            inner: PasswordGrantAuthorizer::with_client(base_url, grant_request, token_path_uri, http),
        }
    }

    /// Set the renewal margin.
    #[must_use]
    pub fn with_drift(self, drift: Duration) -> Self {
        Self {
            inner: self.inner.with_drift(drift),
        }
    }

    /// The token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        self.inner.token_url()
    }

    /// The domain submitted with the grant request.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.inner.grant_request().domain()
    }

    /// The underlying password grant authorizer.
    #[must_use]
    pub const fn password_grant(&self) -> &PasswordGrantAuthorizer {
        &self.inner
    }
}

#[async_trait]
impl Authorizer for DomainPasswordGrantAuthorizer {
    async fn get_access_token(&self) -> SecretServerResult<SecretString> {
        self.inner.get_access_token().await
    }
}
