//! Error types for the Miniflux API client.
//!
//! # Design
//! Miniflux reports failures as `{"error_message": "..."}` with a non-2xx
//! status. Those land in `Api` with the decoded body so callers can match on
//! the exact server message. Non-2xx responses that do not carry that shape
//! (proxies, framework rejections) land in `HttpError` with the raw text.

use thiserror::Error;

use crate::types::ErrorBody;

/// Boxed source of a transport failure (reqwest or ureq).
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by client construction, request building, execution and
/// response parsing.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server URL is not an absolute URL with a host.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// The call was rejected locally; no request was issued.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The HTTP round-trip itself failed.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with a non-2xx status and an `error_message` body.
    #[error("server returned {status}: {}", .body.error_message)]
    Api { status: u16, body: ErrorBody },

    /// The server answered with a non-2xx status and an unrecognized body.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    /// HTTP status of a server-side failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The decoded server error payload, if the failure carried one.
    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(Box::new(err))
    }
}

#[cfg(feature = "blocking")]
impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(Box::new(err))
    }
}
