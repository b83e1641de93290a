//! Validated run settings built from the parsed command line.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::auth::default_token_path;
use crate::cli::{Args, Backend};
use crate::identifier::DbConfig;
use crate::reconcile::ReconcileOptions;
use crate::retry::RetryPolicy;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Root folder name must not be empty")]
    EmptyRootName,

    #[error("{option} must be at least 1")]
    NotPositive { option: &'static str },

    #[error("Local base is not a directory: {0}")]
    LocalBaseNotDirectory(PathBuf),
}

/// Where the folder tree is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    Drive { token_file: PathBuf },
    Local { base: PathBuf },
}

/// Where filenames are resolved to identifiers
#[derive(Debug, Clone)]
pub enum IdentifierSettings {
    Mapping(PathBuf),
    Database(DbConfig),
}

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root_folder_name: String,
    pub dry_run: bool,
    pub log_operations: bool,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub not_found_log_path: PathBuf,
    pub rename_log_path: PathBuf,
    pub report_interval_ms: u64,
    pub page_size: u32,
    pub storage: StorageSettings,
    pub identifiers: IdentifierSettings,
}

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let root_folder_name = args.root_folder.trim();
        if root_folder_name.is_empty() {
            return Err(ConfigError::EmptyRootName);
        }

        require_positive("--max-retries", args.max_retries as u64)?;
        require_positive("--report-interval-ms", args.report_interval_ms)?;
        require_positive("--page-size", args.page_size as u64)?;

        let storage = match args.backend {
            Backend::Drive => StorageSettings::Drive {
                token_file: args.token_file.clone().unwrap_or_else(default_token_path),
            },
            Backend::Local => {
                if !args.local_base.is_dir() {
                    return Err(ConfigError::LocalBaseNotDirectory(args.local_base.clone()));
                }
                StorageSettings::Local {
                    base: args.local_base.clone(),
                }
            }
        };

        let identifiers = match &args.mapping {
            Some(path) => IdentifierSettings::Mapping(path.clone()),
            None => IdentifierSettings::Database(DbConfig::from_env().with_layout(
                &args.table,
                &args.filename_column,
                &args.identifier_column,
            )),
        };

        Ok(Self {
            root_folder_name: root_folder_name.to_string(),
            dry_run: args.dry,
            log_operations: args.log_operations,
            max_retries: args.max_retries,
            base_backoff_ms: args.base_backoff_ms,
            not_found_log_path: args.not_found_log.clone(),
            rename_log_path: args.rename_log.clone(),
            report_interval_ms: args.report_interval_ms,
            page_size: args.page_size,
            storage,
            identifiers,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_backoff_ms))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: self.dry_run,
            log_operations: self.log_operations,
            page_size: self.page_size,
        }
    }
}

fn require_positive(option: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::NotPositive { option })
    } else {
        Ok(())
    }
}
