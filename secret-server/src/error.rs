//! Secret Server error types using thiserror 2.0.
//!
//! Errors raised from a server response carry that response so callers can
//! inspect the status and body.

use crate::response::ApiResponse;
use thiserror::Error;

/// Secret Server errors.
#[derive(Error, Debug)]
pub enum SecretServerError {
    /// The server rejected the request (`4xx`)
    #[error("Client error ({}): {message}", .response.status)]
    Client {
        /// Message extracted from the response body
        message: String,
        /// The response that was rejected
        response: Box<ApiResponse>,
    },

    /// The server failed to handle the request (`5xx` or any other non-`2xx`)
    #[error("Service error ({}) from {}", .response.status, .response.url)]
    Service {
        /// The failed response
        response: Box<ApiResponse>,
    },

    /// A successful response whose body was not in the expected format
    #[error("Unexpected response from {}: {message}", .response.url)]
    InvalidResponse {
        /// What was expected
        message: String,
        /// The offending response
        response: Box<ApiResponse>,
    },

    /// The request could not be sent or its body could not be read
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A required key is absent from a record
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// A record key holds a value of the wrong shape
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Snake-cased key
        key: String,
        /// Why the value was rejected
        message: String,
    },

    /// A timestamp could not be parsed with the configured format
    #[error("Invalid timestamp for {key}: {value:?}")]
    InvalidTimestamp {
        /// Snake-cased key
        key: String,
        /// The raw value
        value: String,
        /// Parser error
        #[source]
        source: chrono::ParseError,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for Secret Server operations.
pub type SecretServerResult<T> = Result<T, SecretServerError>;

/// Coarse classification of a [`SecretServerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `4xx` from the server
    Client,
    /// Any other unsuccessful status
    Service,
    /// Response passed classification but could not be understood
    Generic,
    /// Network failure
    Transport,
    /// Record mapping failure
    Mapping,
    /// Configuration problem
    Config,
}

impl SecretServerError {
    /// Create a client error.
    #[must_use]
    pub fn client(message: impl Into<String>, response: ApiResponse) -> Self {
        Self::Client {
            message: message.into(),
            response: Box::new(response),
        }
    }

    /// Create a service error.
    #[must_use]
    pub fn service(response: ApiResponse) -> Self {
        Self::Service {
            response: Box::new(response),
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>, response: ApiResponse) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            response: Box::new(response),
        }
    }

    /// Create a missing key error.
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey(key.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Client { .. } => ErrorKind::Client,
            Self::Service { .. } => ErrorKind::Service,
            Self::InvalidResponse { .. } => ErrorKind::Generic,
            Self::Transport(_) => ErrorKind::Transport,
            Self::MissingKey(_) | Self::InvalidValue { .. } | Self::InvalidTimestamp { .. } => {
                ErrorKind::Mapping
            }
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// The server response behind this error, if any.
    #[must_use]
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Client { response, .. }
            | Self::Service { response }
            | Self::InvalidResponse { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// HTTP status of the response behind this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    /// The message of a client error (taken from the response body) or of
    /// an invalid response.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Client { message, .. } | Self::InvalidResponse { message, .. } => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}
