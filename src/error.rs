//! Error types for quizlog-fixtures

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, transforming or writing fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected document shape: {0}")]
    InvalidShape(String),

    #[error("Invalid sampling policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),

    #[error("Nothing to merge: {0}")]
    NothingToMerge(String),
}
