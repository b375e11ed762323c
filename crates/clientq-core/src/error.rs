//! Error types for clientq-core

use thiserror::Error;

use crate::models::ClientId;

/// Result type alias using clientq-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in clientq-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosted store rejected the request
    #[error("Store API error: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Live change feed error
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client record not found
    #[error("Client not found: {0}")]
    NotFound(ClientId),

    /// Caller is not allowed to touch the record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
