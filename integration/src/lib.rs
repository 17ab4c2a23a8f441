//! Helpers shared by the end-to-end tests.

use secret_server::{SecretServer, SecretServerResult};
use secret_server_common::{TracingConfig, try_init_tracing};
use test_utils::MockSecretServer;
use tracing::debug;

/// Username used by [`connect`].
pub const USERNAME: &str = "svc-user";

/// Access token issued by the mock for [`USERNAME`].
pub const ACCESS_TOKEN: &str = "e2e-access-token";

/// Route SDK logs to the test writer, once per test binary.
pub fn init_test_tracing() {
    let config = TracingConfig::default().with_log_level("debug");
    if !try_init_tracing(&config) {
        debug!("Tracing already initialized");
    }
}

/// Mount the token endpoint on `mock` and connect a password grant client.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub async fn connect(mock: &MockSecretServer) -> SecretServerResult<SecretServer> {
    init_test_tracing();
    mock.mount_token(USERNAME, ACCESS_TOKEN, 1200, 1).await;
    SecretServer::with_password(&mock.uri(), USERNAME, "Pa55w0rd!")
}
