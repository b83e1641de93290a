mod codes;

pub use codes::ExitCode;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::identifier::LookupError;
use crate::journal::JournalError;
use crate::reconcile::ReconcileError;
use crate::retry::RetryError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Root folder not found: {name}")]
    RootNotFound { name: String },

    #[error("Failed to list folder {folder}: {source}")]
    Listing {
        folder: String,
        #[source]
        source: StorageError,
    },

    #[error("Identifier lookup failed: {message}")]
    Lookup {
        filename: Option<String>,
        message: String,
    },

    #[error("Rename failed: {from} -> {to}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: RetryError<StorageError>,
    },

    #[error("Outcome log error: {path}")]
    OutcomeLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::InvalidConfig { .. } => ExitCode::InvalidConfig,
            AppError::RootNotFound { .. } => ExitCode::RootNotFound,
            AppError::Listing { .. } => ExitCode::ListingError,
            AppError::Lookup { .. } => ExitCode::LookupError,
            AppError::RenameFailed { .. } => ExitCode::RenameError,
            AppError::OutcomeLog { .. } => ExitCode::OutcomeLogError,
            AppError::Auth(_) => ExitCode::AuthError,
            AppError::Cancelled => ExitCode::Cancelled,
            AppError::Other(_) => ExitCode::GeneralError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::InvalidConfig { message } => {
                format!(
                    "Invalid configuration:\n  {}\n\n\
                     Run with --help to see the available options.",
                    message
                )
            }

            AppError::RootNotFound { name } => {
                format!(
                    "No folder named \"{}\" was found.\n\n\
                     Check the folder name and that the account can see it.",
                    name
                )
            }

            AppError::Listing { folder, source } => {
                format!(
                    "Failed to list the contents of \"{}\":\n  {}\n\n\
                     This could be due to:\n\
                     - Network connectivity issues\n\
                     - An expired or revoked access token\n\
                     - API rate limiting\n\n\
                     Entries already processed are recorded in the outcome logs.",
                    folder, source
                )
            }

            AppError::Lookup { filename, message } => {
                let file_info = filename
                    .as_ref()
                    .map(|f| format!("File: {}\n", f))
                    .unwrap_or_default();

                format!(
                    "Identifier lookup failed:\n  {}\n{}\n\
                     Check the database settings (DATABASE_URL or DB_* variables) \
                     or the --mapping file.",
                    message, file_info
                )
            }

            AppError::RenameFailed { from, to, source } => {
                let detail = source
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| source.to_string());

                format!(
                    "Failed to rename image:\n\
                     From: {}\n\
                     To:   {}\n\
                     Error: {}\n\n\
                     The rename was recorded in the rename log before it was attempted.\n\
                     Raise --max-retries or --base-backoff-ms if the storage is rate limiting.",
                    from, to, detail
                )
            }

            AppError::OutcomeLog { path, source } => {
                format!(
                    "Could not write outcome log:\n  {}\n  {}\n\n\
                     Check that the directory exists and is writable.",
                    path.display(),
                    source
                )
            }

            AppError::Auth(err) => {
                format!(
                    "{}\n\n\
                     Export GOOGLE_ACCESS_TOKEN or pass --token-file.",
                    err
                )
            }

            AppError::Cancelled => {
                "Run cancelled. Lines already written to the outcome logs are complete."
                    .to_string()
            }

            AppError::Other(message) => message.clone(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl From<JournalError> for AppError {
    fn from(err: JournalError) -> Self {
        AppError::OutcomeLog {
            path: err.path,
            source: err.source,
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidIdentifier(_) | LookupError::NotConfigured(_) => {
                AppError::InvalidConfig {
                    message: err.to_string(),
                }
            }
            err => AppError::Lookup {
                filename: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => AppError::Cancelled,
            err => AppError::Other(format!("Storage error: {}", err)),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Query(e) => AppError::InvalidConfig {
                message: e.to_string(),
            },
            ReconcileError::RootNotFound(name) => AppError::RootNotFound { name },
            ReconcileError::Listing { folder, source } => AppError::Listing { folder, source },
            ReconcileError::Lookup { filename, source } => AppError::Lookup {
                filename: Some(filename),
                message: source.to_string(),
            },
            ReconcileError::RenameFailed { from, to, source } => {
                AppError::RenameFailed { from, to, source }
            }
            ReconcileError::Journal(e) => e.into(),
            ReconcileError::Cancelled => AppError::Cancelled,
        }
    }
}
