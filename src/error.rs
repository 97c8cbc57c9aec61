//! Error types for the key-value store client

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::types::Operation;

/// Errors that can occur when talking to the store
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with `success: false`
    #[error("{operation}: {message}")]
    Store {
        /// Which operation was refused
        operation: Operation,
        /// Message from the server
        message: String,
    },

    /// Request URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error while reading the response
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Response body was not the expected JSON envelope
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx response without a decodable envelope
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// TLS/SSL setup error
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns the server message if this is a logical failure
    pub fn store_message(&self) -> Option<&str> {
        match self {
            Error::Store { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
