//! Secret Server SDK
//!
//! Access to the Secret Server REST API using *OAuth2 Bearer Token*
//! authentication.
//!
//! ```no_run
//! use secret_server::{PasswordGrantAuthorizer, SecretServer, ServerSecret};
//! use std::sync::Arc;
//!
//! # async fn run() -> secret_server::SecretServerResult<()> {
//! let base_url = "https://acme.secretservercloud.com";
//! let authorizer = PasswordGrantAuthorizer::new(base_url, "svc-user", "hunter2")?;
//! let secret_server = SecretServer::new(base_url, Arc::new(authorizer))?;
//!
//! // the secret as raw JSON
//! let json = secret_server.get_secret(123, true).await?;
//! // or as a typed record
//! let secret = ServerSecret::from_json(&json)?;
//! println!("{}", secret.secret_template_name);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod records;
pub mod response;

pub use auth::{
    AccessGrant, AccessTokenAuthorizer, Authorizer, DomainPasswordGrantAuthorizer, GrantRequest,
    PasswordGrantAuthorizer,
};
pub use client::SecretServer;
pub use config::{Credentials, SecretServerConfig};
pub use error::{ErrorKind, SecretServerError, SecretServerResult};
pub use records::{Field, ServerFolder, ServerSecret};
pub use response::{ApiResponse, process};
