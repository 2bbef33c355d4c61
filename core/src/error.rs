//! Error types for the case-analysis API client.
//!
//! # Design
//! Failures are split by where they happened: before the request left
//! (`InvalidEndpoint`, `InvalidRequest`, `Serialization`), in the transport
//! (`Network`), at the
//! server (`Http`, carrying the status), or while reading a body that claimed
//! to be JSON (`Decode`). Callers that only care about "does it exist" can use
//! `is_not_found` instead of matching on a status code.

use thiserror::Error;

/// Errors returned by `CaseClient` and `ApiService`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint path was empty or did not start with `/`.
    #[error("invalid endpoint {0:?}: must be non-empty and start with '/'")]
    InvalidEndpoint(String),

    /// The request could not be put on the wire: a malformed header or a
    /// URL the transport cannot address. Nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request never produced a response: connection refused, DNS
    /// failure, or timeout.
    #[error("network error: {0}")]
    Network(TransportError),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response declared a JSON content type but the body did not parse.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidRequest(reason) => ApiError::InvalidRequest(reason),
            other => ApiError::Network(other),
        }
    }
}

/// A failure reported by a `Transport` implementation.
///
/// `InvalidRequest` means the transport refused to build the request and
/// never touched the network; the other variants are real network failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request rejected before sending: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while loading `ClientConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base URL must not be empty")]
    EmptyBaseUrl,

    #[error("invalid base URL {0:?}: expected an absolute http or https URL")]
    InvalidBaseUrl(String),

    #[error("invalid timeout {0:?}: expected a positive whole number of seconds")]
    InvalidTimeout(String),

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}
