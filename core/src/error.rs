//! Error types for the HTTP client.
//!
//! # Design
//! Build-time variants (`InvalidUrl`, `InvalidMethod`, `InvalidMethodBody`,
//! `InvalidHeader`, `IncompleteRequest`) are raised by `RequestBuilder::build`
//! and never reach the network. Everything else surfaces from
//! `Call::execute` as a failed call; nothing is retried or replaced with a
//! default response.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Errors returned while building or executing a request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The target URL is malformed, has no host, or uses an unsupported scheme.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A custom method name is not a valid HTTP token.
    #[error("invalid method name `{0}`")]
    InvalidMethod(String),

    /// A body was attached to a method that must not carry one (GET, HEAD).
    #[error("method {method} must not have a request body")]
    InvalidMethodBody { method: String },

    /// A header name is not a token, or its value contains CR, LF or NUL.
    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: &'static str },

    /// `build()` was called before a required field was set.
    #[error("incomplete request: {0} is not set")]
    IncompleteRequest(&'static str),

    /// The request body failed to serialize itself.
    #[error("failed to encode request body: {0}")]
    BodyEncode(#[source] io::Error),

    /// Connecting, writing or reading failed (refused, reset, timed out).
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The reply is not a well-formed HTTP/1.x response.
    #[error("malformed response: {0}")]
    ProtocolDecode(String),

    /// The response body could not be decoded into the requested type.
    #[error("failed to decode response body as {target}: {reason}")]
    BodyDecode { target: &'static str, reason: String },

    /// Client configuration is out of range or unparsable.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl HttpError {
    /// True for errors raised while building a request, before any I/O.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            HttpError::InvalidUrl { .. }
                | HttpError::InvalidMethod(_)
                | HttpError::InvalidMethodBody { .. }
                | HttpError::InvalidHeader { .. }
                | HttpError::IncompleteRequest(_)
        )
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        HttpError::ProtocolDecode(msg.into())
    }
}
