//! Response classification.
//!
//! Every response from the REST API and the token endpoint is passed through
//! [`process`] before its body is used.

use crate::error::{SecretServerError, SecretServerResult};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use tracing::warn;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Final request URL
    pub url: String,
    /// `Content-Type` header, if present
    pub content_type: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a response from a status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url: String::new(),
            content_type: None,
            body: body.into(),
        }
    }

    /// Read a transport response to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read.
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            url,
            content_type,
            body,
        })
    }

    /// Whether the status is in `[200, 300)`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Whether the status is in `[400, 500)`.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Process the response, raising an error if the call was unsuccessful.
///
/// - `2xx` responses are returned unchanged.
/// - `4xx` responses become [`SecretServerError::Client`] with a message taken
///   from the body's `message` key, or its `error` key when that is a string.
/// - Anything else becomes [`SecretServerError::Service`].
///
/// # Errors
///
/// Returns the classified error for any non-`2xx` status.
pub fn process(response: ApiResponse) -> SecretServerResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    if response.is_client_error() {
        let message = client_error_message(&response.body);
        warn!(status = response.status, url = %response.url, %message, "Client error");
        return Err(SecretServerError::client(message, response));
    }

    warn!(status = response.status, url = %response.url, "Service error");
    Err(SecretServerError::service(response))
}

fn client_error_message(body: &[u8]) -> String {
    let content: Value = match serde_json::from_slice(body) {
        Ok(content) => content,
        Err(err) => return err.to_string(),
    };

    match (content.get("message"), content.get("error")) {
        (Some(Value::String(message)), _) => message.clone(),
        (Some(message), _) => message.to_string(),
        (None, Some(Value::String(error))) => error.clone(),
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}
