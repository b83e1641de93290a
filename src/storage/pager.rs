use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::query::ListQuery;
use super::types::{Entry, StorageError};
use super::FileStorage;

/// Lazily walks a paginated listing one page at a time.
///
/// The first call to [`next_page`](Self::next_page) always hits the backend;
/// later calls only do so while the previous page carried a continuation token.
pub struct PagedLister<'a, S: FileStorage + ?Sized> {
    storage: &'a S,
    query: ListQuery,
    next_token: Option<String>,
    started: bool,
    fetches: u32,
    cancel: Option<CancellationToken>,
}

impl<'a, S: FileStorage + ?Sized> PagedLister<'a, S> {
    pub fn new(storage: &'a S, query: ListQuery) -> Self {
        Self {
            storage,
            query,
            next_token: None,
            started: false,
            fetches: 0,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// True until the backend has reported that no further pages exist.
    pub fn has_more(&self) -> bool {
        !self.started || self.next_token.is_some()
    }

    /// Number of listing calls issued so far.
    pub fn fetches(&self) -> u32 {
        self.fetches
    }

    /// Fetch the next page. `Ok(None)` once the listing is exhausted.
    ///
    /// Backend errors are returned unchanged and leave the position as it was,
    /// so calling again retries the same page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Entry>>, StorageError> {
        if !self.has_more() {
            return Ok(None);
        }

        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(StorageError::Cancelled);
        }

        trace!(query = ?self.query, page_token = ?self.next_token, "Fetching page");

        let page = self
            .storage
            .list(&self.query, self.next_token.as_deref())
            .await?;

        self.started = true;
        self.fetches += 1;
        self.next_token = page.next_page_token;

        debug!(
            entries = page.entries.len(),
            more = self.next_token.is_some(),
            fetch = self.fetches,
            "Listing page received"
        );

        Ok(Some(page.entries))
    }

    /// Drain every remaining page into a single vector.
    pub async fn collect_all(&mut self) -> Result<Vec<Entry>, StorageError> {
        let mut all = Vec::new();
        while let Some(entries) = self.next_page().await? {
            all.extend(entries);
        }
        Ok(all)
    }
}
