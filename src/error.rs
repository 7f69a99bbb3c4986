use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ProfileError {
    #[error("invalid input location: {0}")]
    #[diagnostic(help("expected s3://bucket/prefix, file:///path or a local path"))]
    InvalidLocation(String),

    #[error("no objects under {location} end with suffix {suffix:?}")]
    NoMatchingObjects { location: String, suffix: String },

    #[error("invalid output path: {0}")]
    InvalidOutput(PathBuf),

    #[error("failed to list objects in bucket {bucket} with prefix {prefix:?}: {message}")]
    Listing {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("failed to retrieve object {bucket}/{key}: {message}")]
    Download {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("malformed profile {path} at line {line}: {message}")]
    MalformedProfile {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("failed to write aggregated table to {path}: {message}")]
    Output { path: PathBuf, message: String },

    #[error("storage client setup failed: {0}")]
    StorageSetup(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid version pattern for {tool}: {message}")]
    InvalidPattern { tool: String, message: String },

    #[error("worker pool failed: {0}")]
    WorkerPool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
