//! Error types for the content-delivery client.
//!
//! # Design
//! Each variant corresponds to the stage that failed: `InvalidQuery` is raised
//! by the parameter builder before any request is sent, `Transport` and
//! `UnexpectedStatus` come from the round-trip, and `MalformedResponse` from
//! decoding the body. An unknown cache version is not an error; it is logged
//! and the request proceeds without `cv`.

use thiserror::Error;

/// Errors returned by `ContentClient` and the parameter builder.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The query contained contradictory, missing, or empty required fields.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The request never produced an HTTP response (connection, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with anything other than 200.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The body was not JSON or lacked the expected envelope key.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Client configuration could not be assembled.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub(crate) fn invalid_query(msg: impl Into<String>) -> Self {
        ApiError::InvalidQuery(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ApiError::MalformedResponse(msg.into())
    }
}
