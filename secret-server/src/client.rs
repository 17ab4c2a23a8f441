//! Secret Server REST API client.

use crate::{
    auth::{Authorizer, PasswordGrantAuthorizer},
    config::SecretServerConfig,
    error::{SecretServerError, SecretServerResult},
    records::{ServerFolder, ServerSecret},
    response::{ApiResponse, process},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, header::HeaderMap};
use secret_server_common::{HttpConfig, build_http_client};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default REST API path.
pub const API_PATH_URI: &str = "/api/v1";

/// Default top-level domain for Secret Server Cloud.
pub const DEFAULT_TLD: &str = "com";

/// Base URL of a Secret Server Cloud tenant.
#[must_use]
pub fn cloud_url(tenant: &str, tld: &str) -> String {
    format!("https://{tenant}.secretservercloud.{tld}")
}

/// Join `path` onto `base`, with exactly one `/` between them.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_matches('/'))
}

/// Normalize a secret or folder path to the server's `\a\b` form.
///
/// Runs of `/` and `\` collapse to a single `\`; leading and trailing
/// separators are dropped.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("\\{}", segments.join("\\"))
}

/// Client for the Secret Server REST API.
///
/// Every call is a fresh round trip; only the [`Authorizer`]'s token is
/// cached.
#[derive(Debug, Clone)]
pub struct SecretServer {
    base_url: String,
    api_url: String,
    authorizer: Arc<dyn Authorizer>,
    http: Client,
}

impl SecretServer {
    /// Create a client for the server at `base_url`, e.g.
    /// `https://localhost/SecretServer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, authorizer: Arc<dyn Authorizer>) -> SecretServerResult<Self> {
        Self::with_api_path(base_url, authorizer, API_PATH_URI)
    }

    /// Create a client with a non-default API path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_path(
        base_url: &str,
        authorizer: Arc<dyn Authorizer>,
        api_path_uri: &str,
    ) -> SecretServerResult<Self> {
        let http = build_http_client(&HttpConfig::default())?;
        Ok(Self::with_client(base_url, authorizer, api_path_uri, http))
    }

    /// Create a client that sends API requests through `http`.
    #[must_use]
    pub fn with_client(
        base_url: &str,
        authorizer: Arc<dyn Authorizer>,
        api_path_uri: &str,
        http: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_url: join_url(base_url, api_path_uri),
            authorizer,
            http,
        }
    }

    /// Create a client for a Secret Server Cloud tenant on the `.com` domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn cloud(tenant: &str, authorizer: Arc<dyn Authorizer>) -> SecretServerResult<Self> {
        Self::cloud_with_tld(tenant, authorizer, DEFAULT_TLD)
    }

    /// Create a client for a Secret Server Cloud tenant on another domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn cloud_with_tld(
        tenant: &str,
        authorizer: Arc<dyn Authorizer>,
        tld: &str,
    ) -> SecretServerResult<Self> {
        Self::new(&cloud_url(tenant, tld), authorizer)
    }

    /// Create a client that authenticates with a username and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_password(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SecretServerResult<Self> {
        let authorizer = PasswordGrantAuthorizer::new(base_url, username, password)?;
        Self::new(base_url, Arc::new(authorizer))
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &SecretServerConfig) -> SecretServerResult<Self> {
        let http = build_http_client(&config.http)?;
        let authorizer = config.build_authorizer(http.clone());
        Ok(Self::with_client(&config.base_url, authorizer, &config.api_path, http))
    }

    /// The server base URL without a trailing `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The REST API URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// The authorizer shared by this client.
    #[must_use]
    pub const fn authorizer(&self) -> &Arc<dyn Authorizer> {
        &self.authorizer
    }

    /// Returns the headers for REST API calls.
    ///
    /// # Errors
    ///
    /// Propagates errors from the authorizer.
    pub async fn headers(&self) -> SecretServerResult<HeaderMap> {
        self.authorizer.headers(HeaderMap::new()).await
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> SecretServerResult<ApiResponse> {
        let headers = self.headers().await?;
        debug!(url, ?query, "GET");
        let response = self.http.get(url).query(query).headers(headers).send().await?;
        process(ApiResponse::read(response).await?)
    }

    /// Gets a secret as the JSON text returned by the server.
    ///
    /// # Errors
    ///
    /// Returns [`SecretServerError::Client`] when the caller cannot access the
    /// secret, and other errors when the call fails for any other reason.
    pub async fn get_secret_json(&self, id: i64) -> SecretServerResult<String> {
        self.get_secret_json_with_query(id, &[]).await
    }

    /// Like [`Self::get_secret_json`], passing `query` to the server, e.g.
    /// `[("autoCheckout", "true"), ("autoComment", "deploy")]` for secrets
    /// that require check out.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret_json`].
    #[instrument(skip(self))]
    pub async fn get_secret_json_with_query(
        &self,
        id: i64,
        query: &[(&str, &str)],
    ) -> SecretServerResult<String> {
        let response = self.get(&format!("{}/secrets/{id}", self.api_url), query).await?;
        Ok(response.text().into_owned())
    }

    /// Gets a secret.
    ///
    /// With `fetch_file_attachments`, each item holding a file attachment has
    /// its `itemValue` replaced by the attachment content (text, or base64
    /// when the content is not UTF-8).
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret_json`]; additionally
    /// [`SecretServerError::InvalidResponse`] when the body is not JSON, and
    /// [`SecretServerError::MissingKey`] when attachments are requested for a
    /// body without `items`.
    pub async fn get_secret(&self, id: i64, fetch_file_attachments: bool) -> SecretServerResult<Value> {
        self.get_secret_with_query(id, fetch_file_attachments, &[]).await
    }

    /// Like [`Self::get_secret`], passing `query` to the server. Attachment
    /// requests are sent without it.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`].
    #[instrument(skip(self))]
    pub async fn get_secret_with_query(
        &self,
        id: i64,
        fetch_file_attachments: bool,
        query: &[(&str, &str)],
    ) -> SecretServerResult<Value> {
        let response = self.get(&format!("{}/secrets/{id}", self.api_url), query).await?;
        let mut secret = parse_json(response)?;
        if fetch_file_attachments {
            self.fetch_file_attachments(id, &mut secret).await?;
        }
        Ok(secret)
    }

    /// Gets a secret by its full path, e.g. `/Folder/Sub/Secret`.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`].
    #[instrument(skip(self))]
    pub async fn get_secret_by_path(
        &self,
        secret_path: &str,
        fetch_file_attachments: bool,
    ) -> SecretServerResult<Value> {
        let path = normalize_path(secret_path);
        let response = self
            .get(&format!("{}/secrets/lookup", self.api_url), &[("path", path.as_str())])
            .await?;
        let mut secret = parse_json(response)?;
        if fetch_file_attachments {
            let id = secret
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| SecretServerError::missing_key("id"))?;
            self.fetch_file_attachments(id, &mut secret).await?;
        }
        Ok(secret)
    }

    /// Gets a secret mapped to a [`ServerSecret`], with file attachments.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`], plus mapping errors.
    pub async fn get_server_secret(&self, id: i64) -> SecretServerResult<ServerSecret> {
        ServerSecret::from_json(&self.get_secret(id, true).await?)
    }

    /// Gets a folder.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`].
    #[instrument(skip(self))]
    pub async fn get_folder(&self, id: i64) -> SecretServerResult<Value> {
        let response = self.get(&format!("{}/folders/{id}", self.api_url), &[]).await?;
        parse_json(response)
    }

    /// Gets a folder by its full path.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`].
    #[instrument(skip(self))]
    pub async fn get_folder_by_path(&self, folder_path: &str) -> SecretServerResult<Value> {
        let path = normalize_path(folder_path);
        let response = self
            .get(&format!("{}/folders/lookup", self.api_url), &[("path", path.as_str())])
            .await?;
        parse_json(response)
    }

    /// Gets a folder mapped to a [`ServerFolder`].
    ///
    /// # Errors
    ///
    /// As [`Self::get_folder`], plus mapping errors.
    pub async fn get_server_folder(&self, id: i64) -> SecretServerResult<ServerFolder> {
        ServerFolder::from_json(&self.get_folder(id).await?)
    }

    /// Gets the ids of the secrets in a folder.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret`], and [`SecretServerError::InvalidResponse`]
    /// when the body is not a list of ids.
    #[instrument(skip(self))]
    pub async fn get_secret_ids_by_folderid(&self, folder_id: i64) -> SecretServerResult<Vec<i64>> {
        let folder_id = folder_id.to_string();
        let response = self
            .get(
                &format!("{}/secrets", self.api_url),
                &[("filter.folderId", folder_id.as_str())],
            )
            .await?;
        parse_ids(response)
    }

    /// Gets the ids of a folder's child folders.
    ///
    /// # Errors
    ///
    /// As [`Self::get_secret_ids_by_folderid`].
    #[instrument(skip(self))]
    pub async fn get_child_folder_ids_by_folderid(
        &self,
        folder_id: i64,
    ) -> SecretServerResult<Vec<i64>> {
        let folder_id = folder_id.to_string();
        let response = self
            .get(
                &format!("{}/folders", self.api_url),
                &[("filter.parentFolderId", folder_id.as_str())],
            )
            .await?;
        parse_ids(response)
    }

    /// Replace `itemValue` of every file attachment item, in list order.
    async fn fetch_file_attachments(&self, id: i64, secret: &mut Value) -> SecretServerResult<()> {
        let items = secret
            .get_mut("items")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| SecretServerError::missing_key("items"))?;

        for item in items.iter_mut().filter(|item| has_file_attachment(item)) {
            let slug = item
                .get("slug")
                .and_then(Value::as_str)
                .ok_or_else(|| SecretServerError::missing_key("slug"))?
                .to_string();
            debug!(id, slug = %slug, "Fetching file attachment");
            let response = self
                .get(&format!("{}/secrets/{id}/fields/{slug}", self.api_url), &[])
                .await?;
            item["itemValue"] = attachment_content(response);
        }
        Ok(())
    }
}

fn has_file_attachment(item: &Value) -> bool {
    match item.get("fileAttachmentId") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n.abs() > 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn attachment_content(response: ApiResponse) -> Value {
    match String::from_utf8(response.body) {
        Ok(text) => Value::String(text),
        Err(err) => Value::String(STANDARD.encode(err.as_bytes())),
    }
}

fn parse_json(response: ApiResponse) -> SecretServerResult<Value> {
    match response.json::<Value>() {
        Ok(value) => Ok(value),
        Err(err) => Err(SecretServerError::invalid_response(
            format!("expected JSON: {err}"),
            response,
        )),
    }
}

fn parse_ids(response: ApiResponse) -> SecretServerResult<Vec<i64>> {
    match response.json::<Value>().ok().as_ref().and_then(extract_ids) {
        Some(ids) => Ok(ids),
        None => Err(SecretServerError::invalid_response("expected a list of ids", response)),
    }
}

/// Accepts `[1, 2]`, `[{"id": 1}, ...]` or a paged `{"records": [...]}`.
fn extract_ids(value: &Value) -> Option<Vec<i64>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(page) => page.get("records")?.as_array()?,
        _ => return None,
    };
    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(record) => record.get("id")?.as_i64(),
            other => other.as_i64(),
        })
        .collect()
}
