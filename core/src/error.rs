//! Error types for the FluidDB client.
//!
//! # Design
//! Non-2xx responses are not errors here: a 401 or 404 is ordinary response
//! metadata that the caller inspects. `ApiError` only covers the cases where
//! no meaningful response exists, either because the request could not be
//! built or because the round-trip itself failed.

use thiserror::Error;

/// Errors returned by `FluidClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is neither a mapping nor a primitive and no MIME type was
    /// supplied, so there is no way to encode it. Raised before any I/O.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A response declared a JSON content type but its body is not JSON.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// Connection, DNS, TLS or body-read failure from the HTTP transport.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),
}
