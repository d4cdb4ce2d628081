//! Error types for liftpipe
//!
//! One taxonomy for the whole pipeline: configuration errors are fatal and
//! surface before any connection is made; everything else is caught at the
//! batch boundary so later batches keep flowing.

use thiserror::Error;

/// The main error type for liftpipe
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors (fatal, pre-connection)
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required environment variable: {var}")]
    MissingEnv { var: String },

    #[error("Invalid batch size '{value}': must be a positive integer")]
    InvalidBatchSize { value: String },

    // ============================================================================
    // Record / Serialization Errors (abort one batch)
    // ============================================================================
    #[error("Malformed record at input line {line}: {message}")]
    Record { line: usize, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // Stage Upload Errors (local file retained, run continues)
    // ============================================================================
    #[error("Stage upload failed: {message}")]
    StageUpload { message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Ingestion Errors (reported, run continues)
    // ============================================================================
    #[error("Ingest request failed: {message}")]
    Ingest { message: String },

    #[error("Ingest service returned HTTP {status}: {body}")]
    IngestStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing environment variable error
    pub fn missing_env(var: impl Into<String>) -> Self {
        Self::MissingEnv { var: var.into() }
    }

    /// Create a malformed record error
    pub fn record(line: usize, message: impl Into<String>) -> Self {
        Self::Record {
            line,
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a stage upload error
    pub fn stage_upload(message: impl Into<String>) -> Self {
        Self::StageUpload {
            message: message.into(),
        }
    }

    /// Create an ingest error
    pub fn ingest(message: impl Into<String>) -> Self {
        Self::Ingest {
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying
    ///
    /// Upload-by-name and ingest-by-name are idempotent, so transient
    /// transport failures are safe to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::IngestStatus { status, .. } => is_retryable_status(*status),
            Error::ObjectStore(e) => !matches!(e, object_store::Error::NotFound { .. }),
            _ => false,
        }
    }

    /// Fatal errors abort the run before any batch is processed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::MissingEnv { .. } | Error::InvalidBatchSize { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for liftpipe
pub type Result<T> = std::result::Result<T, Error>;
