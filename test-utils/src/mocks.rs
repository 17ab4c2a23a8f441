//! A mock Secret Server for HTTP-level tests.

use crate::fixtures::access_grant_json;
use serde_json::Value;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token endpoint path served by the mock.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// REST API path served by the mock.
pub const API_PATH: &str = "/api/v1";

/// A `wiremock` server with helpers for the token endpoint and REST API.
pub struct MockSecretServer {
    server: MockServer,
}

impl MockSecretServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The server base URL.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying `wiremock` server.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Serve an access grant for `username`'s password grant, expecting
    /// exactly `expected_calls` token requests.
    pub async fn mount_token(&self, username: &str, access_token: &str, expires_in: u64, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains(format!("username={username}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(access_grant_json(access_token, expires_in)),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Serve `status` with a raw `body` from the token endpoint.
    pub async fn mount_token_response(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at `GET {API_PATH}{api_path}` for requests bearing
    /// `access_token`.
    pub async fn mount_get(&self, api_path: &str, access_token: &str, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("{API_PATH}{api_path}")))
            .and(header("Authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Like [`Self::mount_get`], additionally matching one query parameter.
    pub async fn mount_get_with_query(
        &self,
        api_path: &str,
        access_token: &str,
        query: (&str, &str),
        body: Value,
    ) {
        Mock::given(method("GET"))
            .and(path(format!("{API_PATH}{api_path}")))
            .and(query_param(query.0, query.1))
            .and(header("Authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve raw bytes at `GET {API_PATH}{api_path}`, expecting exactly
    /// `expected_calls` requests.
    pub async fn mount_raw(&self, api_path: &str, status: u16, body: Vec<u8>, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("{API_PATH}{api_path}")))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Number of received requests whose path is `request_path`.
    pub async fn request_count(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count()
    }

    /// Verify the expectations of every mounted mock.
    pub async fn verify(&self) {
        self.server.verify().await;
    }
}
