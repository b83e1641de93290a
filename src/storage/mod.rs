mod drive;
mod local;
mod pager;
mod query;
mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use drive::{DriveConfig, GoogleDriveStorage};
pub use local::{is_image_name, LocalStorage};
pub use pager::PagedLister;
pub use query::{EntryKind, ListQuery, QueryError, Scope, DEFAULT_PAGE_SIZE};
pub use types::{Entry, Page, StorageError};

use async_trait::async_trait;

/// A remote (or local) folder tree that can be listed page by page and whose
/// files can be renamed.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Fetch one page of entries matching `query`.
    ///
    /// `page_token` is the continuation token from the previous page, or
    /// `None` for the first page.
    async fn list(&self, query: &ListQuery, page_token: Option<&str>) -> Result<Page, StorageError>;

    /// Change the display name of the entry with the given id.
    async fn rename(&self, id: &str, new_name: &str) -> Result<(), StorageError>;
}
