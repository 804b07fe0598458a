//! Error types and core identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, WharfError>;

/// Engine error types
#[derive(Debug, Error)]
pub enum WharfError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Content gateway returned an error status
    #[error("Gateway error {status}: {message}")]
    Gateway { status: u16, message: String },

    /// Ledger RPC call failed
    #[error("Ledger RPC error: {0}")]
    Rpc(String),

    /// Raw ledger record could not be decoded
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Fetched content document lacks a required field
    #[error("Missing document field: {0}")]
    MissingField(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event subscription error
    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Marketplace account address.
///
/// Compared byte-exactly: membership lists and device content documents
/// carry the same checksummed form, so no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
