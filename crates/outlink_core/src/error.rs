//! Link table error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading or validating a link table.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("link table parsing error")]
    Json(#[from] serde_json::Error),

    #[error("link table fetch failed: {0}")]
    Fetch(String),

    #[error("link table validation error: {0}")]
    Validation(String),
}
