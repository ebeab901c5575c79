//! Error types for dualpack.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for dualpack operations.
pub type Result<T> = std::result::Result<T, DualError>;

/// Main error type for dualpack.
#[derive(Error, Debug)]
pub enum DualError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No package.json found for the project
    #[error("No package.json file found in {0}")]
    PackageJsonNotFound(String),

    /// The package is not an ES module
    #[error("Not an ES module. This tool is for packages that use \"type\": \"module\".")]
    NotEsModule,

    /// The parser could not produce a syntax tree for a file
    #[error("Failed to parse {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// The transform capability failed for a file
    #[error("Failed to transform {file}: {message}")]
    Transform { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl DualError {
    /// Whether this error aborts only the file that produced it, rather
    /// than the whole run. Parse and transform failures are per-file;
    /// everything else (IO in particular) is fatal to the run.
    pub fn is_per_file(&self) -> bool {
        matches!(self, DualError::Parse { .. } | DualError::Transform { .. })
    }
}

impl From<anyhow::Error> for DualError {
    fn from(err: anyhow::Error) -> Self {
        DualError::Other(err.to_string())
    }
}

impl From<String> for DualError {
    fn from(s: String) -> Self {
        DualError::Other(s)
    }
}
