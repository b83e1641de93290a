use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::identifier::{DEFAULT_FILENAME_COLUMN, DEFAULT_IDENTIFIER_COLUMN, DEFAULT_TABLE};

/// Where the image folder tree lives
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Google Drive (needs an OAuth access token)
    Drive,
    /// A directory on the local filesystem
    Local,
}

#[derive(Parser, Debug)]
#[command(name = "skurename")]
#[command(author, version, long_about = None)]
#[command(about = "Rename product images in a folder tree to their catalog SKU")]
pub struct Args {
    /// Name of the folder to start from
    #[arg(env = "ROOT_FOLDER_NAME")]
    pub root_folder: String,

    /// Log planned renames without touching any file
    #[arg(short, long, env = "DRY_RUN")]
    pub dry: bool,

    /// Print one line per processed image
    #[arg(long, env = "LOG_OPERATIONS")]
    pub log_operations: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Attempts per rename before giving up
    #[arg(long, env = "MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// Wait after the first failed rename attempt, doubled on each further failure
    #[arg(long, env = "BASE_BACKOFF_MS", default_value_t = 30_000)]
    pub base_backoff_ms: u64,

    /// File that collects filenames with no matching product
    #[arg(long, env = "NOT_FOUND_LOG", default_value = "not-found.log")]
    pub not_found_log: PathBuf,

    /// File that collects `<old> -> <new>` lines
    #[arg(long, env = "RENAME_LOG", default_value = "renamed.log")]
    pub rename_log: PathBuf,

    /// Interval between progress lines
    #[arg(long, env = "REPORT_INTERVAL_MS", default_value_t = 10_000)]
    pub report_interval_ms: u64,

    /// Entries requested per listing page
    #[arg(long, env = "PAGE_SIZE", default_value_t = 100)]
    pub page_size: u32,

    /// Storage backend
    #[arg(long, value_enum, env = "STORAGE_BACKEND", default_value_t = Backend::Drive)]
    pub backend: Backend,

    /// Base directory for the local backend
    #[arg(long, env = "LOCAL_BASE", value_name = "DIR", default_value = ".")]
    pub local_base: PathBuf,

    /// OAuth token file for the Drive backend
    #[arg(long, env = "GOOGLE_TOKEN_FILE", value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// JSON file of filename -> SKU, used instead of the database
    #[arg(long, env = "IDENTIFIER_MAPPING", value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Product table
    #[arg(long, env = "DB_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Column holding the image filename
    #[arg(long, env = "DB_FILENAME_COLUMN", default_value = DEFAULT_FILENAME_COLUMN)]
    pub filename_column: String,

    /// Column holding the product identifier
    #[arg(long, env = "DB_IDENTIFIER_COLUMN", default_value = DEFAULT_IDENTIFIER_COLUMN)]
    pub identifier_column: String,
}
