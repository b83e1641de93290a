use serde::Deserialize;
use thiserror::Error;

/// One listed item: a folder or a file, as returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entry {
    pub id: String,
    pub name: String,
}

impl Entry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<Entry>,
    /// Continuation token; `None` once the source has no more results.
    pub next_page_token: Option<String>,
}

impl Page {
    pub fn last(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            next_page_token: None,
        }
    }

    pub fn with_token(entries: Vec<Entry>, token: impl Into<String>) -> Self {
        Self {
            entries,
            next_page_token: Some(token.into()),
        }
    }
}

/// Google Drive `files.list` response, limited to the fields we request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<Entry>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google Drive error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DriveErrorResponse {
    pub error: DriveErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Errors raised by a file storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Rate limited by storage backend")]
    RateLimited,

    #[error("Storage API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Destination already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listing cancelled")]
    Cancelled,
}

impl StorageError {
    /// Errors that repeating the same request cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StorageError::AlreadyExists(_) | StorageError::NotFound(_))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Timeout
        } else if err.is_decode() {
            StorageError::Parse(err.to_string())
        } else {
            StorageError::Network(err.to_string())
        }
    }
}
