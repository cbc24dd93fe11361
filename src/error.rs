//! Error types for Formcraft
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Formcraft operations
///
/// This enum encompasses everything that can go wrong while generating a
/// schema, talking to the upstream completion API, or reading and writing
/// history records. The HTTP layer maps each variant to a status code.
#[derive(Error, Debug)]
pub enum FormcraftError {
    /// Missing or invalid request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing credentials for the upstream provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Provider setup errors (HTTP client construction and the like)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Upstream completion API answered with a non-success status
    #[error("Upstream request failed with status {status}: {message}")]
    Upstream {
        /// HTTP status code returned by the upstream API
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Upstream completion contained no content
    #[error("Upstream returned an empty completion")]
    UpstreamEmpty,

    /// Completion text could not be parsed into a schema document
    #[error("Generated schema is malformed: {0}")]
    MalformedSchema(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// History storage errors (key-value operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    Blob(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedded database errors
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
}

impl FormcraftError {
    /// Short, stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) | Self::MissingCredentials(_) => "config",
            Self::Provider(_) => "provider",
            Self::Upstream { .. } => "upstream",
            Self::UpstreamEmpty => "upstream_empty",
            Self::MalformedSchema(_) => "malformed_schema",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) | Self::Database(_) => "storage",
            Self::Blob(_) => "blob",
            Self::Io(_) => "io",
            Self::Serialization(_) | Self::Yaml(_) => "serialization",
            Self::Http(_) => "http",
        }
    }
}

/// Label for an arbitrary error, `internal` when it is not a [`FormcraftError`]
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<FormcraftError>()
        .map(FormcraftError::kind)
        .unwrap_or("internal")
}

/// Result type alias for Formcraft operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
