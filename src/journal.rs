//! Append-only outcome logs: one line per image.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[derive(Error, Debug)]
#[error("Outcome log {path}: {source}")]
pub struct JournalError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A text file opened once per run and appended to line by line.
///
/// Each line goes out in a single write followed by a flush, and writers are
/// serialized, so lines never interleave and an interrupted run leaves every
/// earlier line intact.
pub struct OutcomeLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl OutcomeLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| JournalError {
                    path: path.clone(),
                    source,
                })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| JournalError {
                path: path.clone(),
                source,
            })?;

        debug!("Opened outcome log {:?}", path);

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` followed by a newline.
    pub async fn append(&self, line: &str) -> Result<(), JournalError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|source| self.error(source))?;
        file.flush().await.map_err(|source| self.error(source))?;

        trace!(log = ?self.path, line, "Appended line");
        Ok(())
    }

    /// Flush and sync to disk.
    pub async fn close(&self) -> Result<(), JournalError> {
        let mut file = self.file.lock().await;
        file.flush().await.map_err(|source| self.error(source))?;
        file.sync_all().await.map_err(|source| self.error(source))?;
        Ok(())
    }

    fn error(&self, source: std::io::Error) -> JournalError {
        JournalError {
            path: self.path.clone(),
            source,
        }
    }
}

/// The two logs a run writes.
pub struct OutcomeLogs {
    pub not_found: OutcomeLog,
    pub renamed: OutcomeLog,
}

impl OutcomeLogs {
    pub async fn open(not_found: &Path, renamed: &Path) -> Result<Self, JournalError> {
        Ok(Self {
            not_found: OutcomeLog::open(not_found).await?,
            renamed: OutcomeLog::open(renamed).await?,
        })
    }

    pub async fn record_not_found(&self, filename: &str) -> Result<(), JournalError> {
        self.not_found.append(filename).await
    }

    pub async fn record_rename(&self, old_name: &str, new_name: &str) -> Result<(), JournalError> {
        self.renamed
            .append(&format!("{} -> {}", old_name, new_name))
            .await
    }

    pub async fn close(&self) -> Result<(), JournalError> {
        self.not_found.close().await?;
        self.renamed.close().await
    }
}
