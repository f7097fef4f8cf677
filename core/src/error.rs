//! Error types for the REST client.
//!
//! # Design
//! Only three things can go wrong locally: the request never makes it across
//! the wire, the caller's payload cannot be written as JSON, or the response
//! body cannot be read as JSON. Remote failures (4xx/5xx) are not errors here;
//! their bodies are decoded and handed back like any other response.

use thiserror::Error;

/// Errors returned by `SalesforceClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be built, sent, or its response read.
    #[error("transport failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body is not valid JSON.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
