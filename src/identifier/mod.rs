mod mapping;
mod mysql;

pub use mapping::JsonIdentifierStore;
pub use mysql::{DbConfig, MySqlIdentifierStore, DEFAULT_FILENAME_COLUMN, DEFAULT_IDENTIFIER_COLUMN, DEFAULT_TABLE};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while looking up a product identifier
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Identifier column has unsupported type for {filename}")]
    UnsupportedValue { filename: String },

    #[error("Failed to read mapping file {path}: {message}")]
    Mapping { path: PathBuf, message: String },
}

/// Maps an image filename to its product identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Exact match on the full filename, extension included.
    async fn lookup(&self, filename: &str) -> Result<Option<String>, LookupError>;
}
