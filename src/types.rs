//! Wire types for the key-value store client

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The operations that can fail logically, used as the error prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Write a value
    Set,
    /// Read a value
    Get,
    /// Remove a key
    Delete,
    /// Enumerate keys
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::List => "list",
        })
    }
}

/// Decode a field that may be missing or `null` as its zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// JSON wrapper every server response uses
///
/// Operation-specific fields are flattened into `payload`. Missing and `null`
/// fields decode to their zero value, so a bare `{}` is a failure with an
/// empty message.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the server carried out the operation
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    /// Human-readable explanation, on success and failure alike
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Operation-specific fields
    #[serde(flatten)]
    pub payload: T,
}

/// Result of inspecting an envelope's `success` flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The server carried out the operation
    Success {
        /// Server message
        message: String,
        /// Operation-specific fields
        payload: T,
    },
    /// The server refused the operation
    Failure {
        /// Server message
        message: String,
    },
}

impl<T> Envelope<T> {
    /// Branch on the `success` flag
    pub fn into_outcome(self) -> Outcome<T> {
        if self.success {
            Outcome::Success {
                message: self.message,
                payload: self.payload,
            }
        } else {
            Outcome::Failure {
                message: self.message,
            }
        }
    }
}

/// Payload of set and delete responses (no extra fields)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ack {}

/// Payload of a get response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValuePayload {
    /// The stored value
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

/// A single entry of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListItem {
    /// The key name
    #[serde(default, deserialize_with = "null_as_default")]
    pub k: String,
}

/// Payload of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListPayload {
    /// Keys in server order. Absent and `null` both mean no keys.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ListItem>,
}

/// Body of a set request
#[derive(Debug, Clone, Serialize)]
pub struct SetRequest<'a> {
    /// Value to store
    pub value: &'a str,
}
