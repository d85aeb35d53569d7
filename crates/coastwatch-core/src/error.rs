//! Error types for the Coastwatch classification pipeline.
//!
//! Errors are organized by stage so callers can tell a caller bug (a path
//! that never existed) apart from the failures the orchestrator absorbs.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Coastwatch operations.
#[derive(Error, Debug)]
pub enum CoastwatchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Image could not be decoded or failed the integrity check
    #[error("Corrupt image {path}: {message}")]
    CorruptImage { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// A classification backend could not be initialized
    #[error("Backend {backend} unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// A backend failed while running inference on one image
    #[error("Inference failed in {backend} for {path}: {message}")]
    Inference {
        backend: String,
        path: PathBuf,
        message: String,
    },

    /// A backend emitted a label outside the mapping table
    #[error("Unmapped label {label:?} from backend {backend}")]
    UnmappedLabel { backend: String, label: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },
}

/// Convenience type alias for Coastwatch results.
pub type Result<T> = std::result::Result<T, CoastwatchError>;
