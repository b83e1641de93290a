//! Local directory backend. Entry ids are filesystem paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info, trace};

use super::query::{EntryKind, ListQuery, Scope};
use super::types::{Entry, Page, StorageError};
use super::FileStorage;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic", "avif", "svg",
];

/// True if the filename carries a known image extension.
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Directory-backed [`FileStorage`].
///
/// A listing is read once, on its first page; later pages are served from
/// that snapshot, so renames made while walking a folder never shift or
/// repeat entries. Page tokens are `<snapshot>:<offset>`.
pub struct LocalStorage {
    base: PathBuf,
    snapshots: Mutex<HashMap<u64, Vec<Entry>>>,
    next_snapshot: AtomicU64,
}

fn parse_page_token(token: &str) -> Result<(u64, usize), StorageError> {
    let invalid = || StorageError::Parse(format!("Invalid page token: {}", token));
    let (id, offset) = token.split_once(':').ok_or_else(invalid)?;
    Ok((
        id.parse().map_err(|_| invalid())?,
        offset.parse().map_err(|_| invalid())?,
    ))
}

impl LocalStorage {
    /// `base` is where folder-by-name lookups start.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            snapshots: Mutex::new(HashMap::new()),
            next_snapshot: AtomicU64::new(0),
        }
    }

    fn snapshot(&self, id: u64, token: &str) -> Result<Vec<Entry>, StorageError> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::Parse(format!("Expired page token: {}", token)))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    async fn children(&self, dir: &Path, kind: EntryKind) -> Result<Vec<Entry>, StorageError> {
        let mut read_dir = tokio::fs::read_dir(dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(dir.display().to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                trace!(name = %name, "Skipping hidden entry");
                continue;
            }

            let file_type = entry.file_type().await?;
            let wanted = match kind {
                EntryKind::Folder => file_type.is_dir(),
                EntryKind::Image => file_type.is_file() && is_image_name(&name),
            };

            if wanted {
                entries.push(Entry::new(entry.path().to_string_lossy(), name));
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn named_folders(&self, name: &str) -> Result<Vec<Entry>, StorageError> {
        let mut found = Vec::new();

        let base_name = self
            .base
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()));
        if base_name.as_deref() == Some(name) {
            found.push(Entry::new(self.base.to_string_lossy(), name));
        }

        found.extend(
            self.children(&self.base, EntryKind::Folder)
                .await?
                .into_iter()
                .filter(|e| e.name == name),
        );

        Ok(found)
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn list(&self, query: &ListQuery, page_token: Option<&str>) -> Result<Page, StorageError> {
        let (snapshot_id, offset, all) = match page_token {
            Some(token) => {
                let (id, offset) = parse_page_token(token)?;
                (id, offset, self.snapshot(id, token)?)
            }
            None => {
                let all = match query.scope() {
                    Scope::Parent(dir) => self.children(Path::new(dir), query.kind()).await?,
                    Scope::Name(name) if query.kind() == EntryKind::Folder => {
                        self.named_folders(name).await?
                    }
                    Scope::Name(_) => Vec::new(),
                };
                (self.next_snapshot.fetch_add(1, Ordering::Relaxed), 0, all)
            }
        };

        let end = (offset + query.page_size() as usize).min(all.len());
        let start = offset.min(end);

        debug!(snapshot = snapshot_id, total = all.len(), start, end, "Local listing page");

        let entries = all[start..end].to_vec();
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        if end < all.len() {
            snapshots.insert(snapshot_id, all);
            Ok(Page::with_token(entries, format!("{}:{}", snapshot_id, end)))
        } else {
            snapshots.remove(&snapshot_id);
            Ok(Page::last(entries))
        }
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<(), StorageError> {
        let source = PathBuf::from(id);
        let destination = source
            .parent()
            .map(|p| p.join(new_name))
            .unwrap_or_else(|| PathBuf::from(new_name));

        if source == destination {
            return Ok(());
        }

        if tokio::fs::try_exists(&destination).await? {
            return Err(StorageError::AlreadyExists(
                destination.display().to_string(),
            ));
        }

        tokio::fs::rename(&source, &destination).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        info!("Renamed {:?} -> {:?}", source, destination);
        Ok(())
    }
}
