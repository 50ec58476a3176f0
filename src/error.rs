//! Error types for policy evaluation and storage

use crate::core::engine::DenyReason;
use thiserror::Error;

/// Boxed source error carried by store failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum WardenError {
    /// Access denied, either by an explicit deny or because nothing allowed it
    #[error("Request was denied: {reason}")]
    Forbidden { reason: DenyReason },

    /// A policy template could not be compiled into a matcher
    #[error("Could not compile pattern '{pattern}': {reason}")]
    Compile { pattern: String, reason: String },

    /// The policy store failed to read or write
    #[error("Policy store error ({context}): {source}")]
    Store {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error("Policy already exists: {0}")]
    Conflict(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Unknown condition type: {0}")]
    UnknownCondition(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WardenError {
    /// Wrap a backend error with a short description of what was attempted
    pub fn store(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WardenError::Store {
            context: context.into(),
            source: source.into(),
        }
    }

    /// True when this error is a denial verdict rather than a failure
    pub fn is_forbidden(&self) -> bool {
        matches!(self, WardenError::Forbidden { .. })
    }
}

impl From<rusqlite::Error> for WardenError {
    fn from(err: rusqlite::Error) -> Self {
        WardenError::store("sqlite", err)
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        WardenError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
