use std::path::PathBuf;
use thiserror::Error;

/// Pseudo function name used for errors outside the `functions` map.
pub const CATALOG_SCOPE: &str = "<catalog>";

/* A malformed catalog entry. Loading stops at the first one. */
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema error in '{function}' at '{field}': {reason}")]
pub struct SchemaError {
    pub function: String,
    pub field: String,
    pub reason: String,
}

impl SchemaError {
    pub fn new(function: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { function: function.into(), field: field.into(), reason: reason.into() }
    }

    pub fn category(&self) -> &'static str {
        "SchemaError"
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to render catalog description: {0}")]
    Describe(String),
}

pub type LoadResult<T> = Result<T, LoadError>;
