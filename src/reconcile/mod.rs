mod counters;
mod naming;
mod types;

pub use counters::{CounterSnapshot, ReconciliationCounters};
pub use naming::{build_identifier_name, extension_with_dot};
pub use types::{FolderNode, ImageEntry, ImageOutcome, ReconcileOptions, ReconcileReport};

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::identifier::{IdentifierStore, LookupError};
use crate::journal::{JournalError, OutcomeLogs};
use crate::progress::Progress;
use crate::retry::{RetryError, RetryExecutor};
use crate::storage::{FileStorage, ListQuery, PagedLister, QueryError, StorageError};

/// Errors that end a reconciliation run
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid listing query: {0}")]
    Query(#[from] QueryError),

    #[error("Root folder not found: {0}")]
    RootNotFound(String),

    #[error("Failed to list folder {folder}: {source}")]
    Listing {
        folder: String,
        #[source]
        source: StorageError,
    },

    #[error("Identifier lookup failed for {filename}: {source}")]
    Lookup {
        filename: String,
        #[source]
        source: LookupError,
    },

    #[error("Rename failed: {from} -> {to}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: RetryError<StorageError>,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("Run cancelled")]
    Cancelled,
}

enum Visit {
    /// List the folder's children and schedule them
    Enter(FolderNode),
    /// Every subtree below is done; process this folder's images
    Images(FolderNode),
}

/// Walks a folder tree and renames every image that has a known identifier.
pub struct Reconciler<'a> {
    storage: &'a (dyn FileStorage + 'a),
    store: &'a (dyn IdentifierStore + 'a),
    logs: &'a OutcomeLogs,
    counters: Arc<ReconciliationCounters>,
    retry: RetryExecutor,
    options: ReconcileOptions,
    progress: Mutex<Progress>,
    cancel: CancellationToken,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        storage: &'a (dyn FileStorage + 'a),
        store: &'a (dyn IdentifierStore + 'a),
        logs: &'a OutcomeLogs,
        counters: Arc<ReconciliationCounters>,
        retry: RetryExecutor,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            storage,
            store,
            logs,
            counters,
            retry,
            options,
            progress: Mutex::new(Progress::silent()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Mutex::new(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn lister(&self, query: ListQuery) -> PagedLister<'a, dyn FileStorage + 'a> {
        PagedLister::new(self.storage, query.with_page_size(self.options.page_size))
            .with_cancellation(self.cancel.clone())
    }

    fn listing_error(folder: &str, source: StorageError) -> ReconcileError {
        match source {
            StorageError::Cancelled => ReconcileError::Cancelled,
            source => ReconcileError::Listing {
                folder: folder.to_string(),
                source,
            },
        }
    }

    fn with_progress_lock(&self, f: impl FnOnce(&mut Progress)) {
        if let Ok(mut progress) = self.progress.lock() {
            f(&mut progress);
        }
    }

    /// Find the folder the traversal starts from.
    ///
    /// When several folders share the name, the first one listed wins.
    pub async fn resolve_root(&self, name: &str) -> Result<FolderNode, ReconcileError> {
        let query = ListQuery::folders(None, Some(name))?;
        let matches = self
            .lister(query)
            .collect_all()
            .await
            .map_err(|e| Self::listing_error(name, e))?;

        let mut matches = matches.into_iter();
        let root = matches
            .next()
            .map(FolderNode::root)
            .ok_or_else(|| ReconcileError::RootNotFound(name.to_string()))?;

        let others = matches.count();
        if others > 0 {
            warn!(
                "{} folders named {:?} found, using the first ({})",
                others + 1,
                name,
                root.id
            );
            self.with_progress_lock(|p| {
                p.warn(&format!(
                    "{} folders named \"{}\" found, using {}",
                    others + 1,
                    name,
                    root.id
                ))
            });
        }

        info!(id = %root.id, "Resolved root folder {:?}", name);
        self.with_progress_lock(|p| p.root_resolved(&root.name, &root.id));

        Ok(root)
    }

    /// Walk the tree under `root` depth-first.
    ///
    /// Every sub-folder's subtree finishes, in listing order, before the
    /// images of its parent are processed.
    pub async fn run(&self, root: FolderNode) -> Result<ReconcileReport, ReconcileError> {
        let mut stack = vec![Visit::Enter(root.clone())];
        let mut folders_visited = 0u64;

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(folder) => {
                    folders_visited += 1;
                    debug!(id = %folder.id, name = %folder.name, "Entering folder");

                    let children = self
                        .lister(ListQuery::subfolders(&folder.id))
                        .collect_all()
                        .await
                        .map_err(|e| Self::listing_error(&folder.name, e))?;

                    let subfolders: Vec<_> = children
                        .into_iter()
                        .map(|entry| FolderNode::child(entry, &folder))
                        .collect();

                    stack.push(Visit::Images(folder));
                    stack.extend(subfolders.into_iter().rev().map(Visit::Enter));
                }
                Visit::Images(folder) => self.process_folder_images(&folder).await?,
            }
        }

        let counters = self.counters.snapshot();
        info!(folders = folders_visited, %counters, "Traversal complete");
        self.with_progress_lock(|p| p.run_complete(&counters, self.options.dry_run));

        Ok(ReconcileReport {
            root,
            folders_visited,
            counters,
            dry_run: self.options.dry_run,
        })
    }

    async fn process_folder_images(&self, folder: &FolderNode) -> Result<(), ReconcileError> {
        let mut lister = self.lister(ListQuery::images(&folder.id));

        while let Some(page) = lister
            .next_page()
            .await
            .map_err(|e| Self::listing_error(&folder.name, e))?
        {
            for entry in page {
                let image = ImageEntry::new(entry, folder);
                self.process_image(&image).await?;
            }
        }

        Ok(())
    }

    /// Look up one image and rename it when an identifier exists.
    pub async fn process_image(&self, image: &ImageEntry) -> Result<ImageOutcome, ReconcileError> {
        let index = self.counters.record_image();

        let identifier = self
            .store
            .lookup(&image.name)
            .await
            .map_err(|source| ReconcileError::Lookup {
                filename: image.name.clone(),
                source,
            })?;

        let outcome = match identifier {
            None => {
                self.counters.record_not_found();
                self.logs.record_not_found(&image.name).await?;
                debug!(name = %image.name, "No identifier found");
                ImageOutcome::NotFound
            }
            Some(identifier) => {
                let new_name = build_identifier_name(&identifier, &image.name);
                self.logs.record_rename(&image.name, &new_name).await?;

                if self.options.dry_run {
                    info!("Dry run: {} -> {}", image.name, new_name);
                    ImageOutcome::Planned { new_name }
                } else {
                    self.rename(image, &new_name).await?;
                    self.counters.record_renamed();
                    info!("Renamed: {} -> {}", image.name, new_name);
                    ImageOutcome::Renamed { new_name }
                }
            }
        };

        if self.options.log_operations {
            self.with_progress_lock(|p| p.image_outcome(index, &image.name, &outcome));
        }

        Ok(outcome)
    }

    async fn rename(&self, image: &ImageEntry, new_name: &str) -> Result<(), ReconcileError> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let label = format!("rename {}", image.name);
        self.retry
            .run_unless(
                &label,
                || self.storage.rename(&image.id, new_name),
                StorageError::is_permanent,
            )
            .await
            .map_err(|source| match source {
                RetryError::Cancelled => ReconcileError::Cancelled,
                source => ReconcileError::RenameFailed {
                    from: image.name.clone(),
                    to: new_name.to_string(),
                    source,
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{JsonIdentifierStore, MockIdentifierStore};
    use crate::retry::RetryPolicy;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::LocalStorage;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Harness {
        dir: TempDir,
        logs: OutcomeLogs,
        counters: Arc<ReconciliationCounters>,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = tempdir().unwrap();
            let logs = OutcomeLogs::open(&dir.path().join("not-found.log"), &dir.path().join("renamed.log"))
                .await
                .unwrap();
            Self {
                dir,
                logs,
                counters: Arc::new(ReconciliationCounters::new()),
            }
        }

        fn reconciler<'a>(
            &'a self,
            storage: &'a dyn FileStorage,
            store: &'a dyn IdentifierStore,
            options: ReconcileOptions,
            max_attempts: u32,
        ) -> Reconciler<'a> {
            let retry = RetryExecutor::new(
                RetryPolicy::new(max_attempts, Duration::ZERO),
                self.counters.clone(),
                CancellationToken::new(),
            );
            Reconciler::new(storage, store, &self.logs, self.counters.clone(), retry, options)
        }

        fn log_path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn lines(&self, name: &str) -> Vec<String> {
            std::fs::read_to_string(self.log_path(name))
                .unwrap()
                .lines()
                .map(String::from)
                .collect()
        }
    }

    fn options(dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            dry_run,
            ..Default::default()
        }
    }

    /// Root "Products" with sub-folder "A" holding x.jpg, and y.png at the root.
    fn scenario() -> (MemoryStorage, String) {
        let storage = MemoryStorage::new("root", "Products");
        let folder_a = storage.add_folder("root", "A");
        let x = storage.add_image(&folder_a, "x.jpg");
        storage.add_image("root", "y.png");
        (storage, x)
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let harness = Harness::new().await;
        let (storage, x_id) = scenario();
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let report = reconciler.run(root).await.unwrap();

        assert_eq!(report.folders_visited, 2);
        assert_eq!(report.counters.total_images, 2);
        assert_eq!(report.counters.renamed_images, 1);
        assert_eq!(report.counters.not_found_images, 1);
        assert_eq!(harness.lines("not-found.log"), vec!["y.png"]);
        assert_eq!(harness.lines("renamed.log"), vec!["x.jpg -> 1001.jpg"]);
        assert_eq!(storage.name_of(&x_id).as_deref(), Some("1001.jpg"));
    }

    #[tokio::test]
    async fn test_dry_run_logs_but_does_not_rename() {
        let harness = Harness::new().await;
        let (storage, x_id) = scenario();
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(true), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let report = reconciler.run(root).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.counters.total_images, 2);
        assert_eq!(report.counters.renamed_images, 0);
        assert_eq!(report.counters.not_found_images, 1);
        assert_eq!(report.counters.matched_images(), 1);
        assert_eq!(harness.lines("renamed.log"), vec!["x.jpg -> 1001.jpg"]);
        assert_eq!(storage.rename_calls(), 0);
        assert_eq!(storage.name_of(&x_id).as_deref(), Some("x.jpg"));
    }

    #[tokio::test]
    async fn test_subtrees_complete_before_parent_images() {
        let harness = Harness::new().await;
        let storage = MemoryStorage::new("root", "Products");
        let a = storage.add_folder("root", "A");
        let b = storage.add_folder(&a, "B");
        let c = storage.add_folder("root", "C");
        storage.add_image("root", "r1.jpg");
        storage.add_image(&a, "a1.jpg");
        storage.add_image(&b, "b1.jpg");
        storage.add_image(&c, "c1.jpg");
        let store = JsonIdentifierStore::default();
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let report = reconciler
            .run(FolderNode::root(crate::storage::Entry::new("root", "Products")))
            .await
            .unwrap();

        assert_eq!(report.folders_visited, 4);
        assert_eq!(
            harness.lines("not-found.log"),
            vec!["b1.jpg", "a1.jpg", "c1.jpg", "r1.jpg"]
        );
    }

    #[tokio::test]
    async fn test_counts_every_image_across_pages() {
        let harness = Harness::new().await;
        let storage = MemoryStorage::new("root", "Products");
        let mut pairs = Vec::new();
        for i in 0..11 {
            let name = format!("p{}.jpg", i);
            storage.add_image("root", &name);
            if i % 3 == 0 {
                pairs.push((name, format!("{}", 5000 + i)));
            }
        }
        let store = JsonIdentifierStore::from_pairs(pairs);
        let opts = ReconcileOptions {
            page_size: 2,
            ..Default::default()
        };
        let reconciler = harness.reconciler(&storage, &store, opts, 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let report = reconciler.run(root).await.unwrap();

        let c = report.counters;
        assert_eq!(c.total_images, 11);
        assert_eq!(c.renamed_images, 4);
        assert_eq!(c.not_found_images, 7);
        assert_eq!(c.total_images, c.renamed_images + c.not_found_images);
        assert_eq!(harness.lines("renamed.log").len(), 4);
        assert_eq!(harness.lines("not-found.log").len(), 7);
    }

    #[tokio::test]
    async fn test_local_renames_do_not_disturb_later_pages() {
        let harness = Harness::new().await;
        let tree = tempdir().unwrap();
        let products = tree.path().join("Products");
        std::fs::create_dir(&products).unwrap();
        for i in 1..=4 {
            std::fs::write(products.join(format!("{}.jpg", i)), b"x").unwrap();
        }
        let storage = LocalStorage::new(tree.path());
        // 500.jpg sorts after unprocessed files, 100.jpg before them
        let store = JsonIdentifierStore::from_pairs([("1.jpg", "500"), ("3.jpg", "100")]);
        let opts = ReconcileOptions {
            page_size: 2,
            ..Default::default()
        };
        let reconciler = harness.reconciler(&storage, &store, opts, 1);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let report = reconciler.run(root).await.unwrap();

        assert_eq!(report.counters.total_images, 4);
        assert_eq!(report.counters.renamed_images, 2);
        assert_eq!(report.counters.not_found_images, 2);
        assert_eq!(harness.lines("not-found.log"), vec!["2.jpg", "4.jpg"]);
        assert_eq!(
            harness.lines("renamed.log"),
            vec!["1.jpg -> 500.jpg", "3.jpg -> 100.jpg"]
        );
        for name in ["500.jpg", "2.jpg", "100.jpg", "4.jpg"] {
            assert!(products.join(name).exists(), "{} missing", name);
        }
    }

    #[tokio::test]
    async fn test_name_collision_fails_without_retrying() {
        let harness = Harness::new().await;
        let tree = tempdir().unwrap();
        let products = tree.path().join("Products");
        std::fs::create_dir(&products).unwrap();
        std::fs::write(products.join("x.jpg"), b"x").unwrap();
        std::fs::write(products.join("1001.jpg"), b"taken").unwrap();
        let storage = LocalStorage::new(tree.path());
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let err = reconciler.run(root).await.unwrap_err();

        match err {
            ReconcileError::RenameFailed { from, source, .. } => {
                assert_eq!(from, "x.jpg");
                assert!(matches!(source, RetryError::Permanent { attempts: 1, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(harness.counters.snapshot().retries_triggered, 1);
        assert!(products.join("x.jpg").exists());
    }

    #[tokio::test]
    async fn test_transient_rename_failures_are_retried() {
        let harness = Harness::new().await;
        let (storage, x_id) = scenario();
        storage.fail_renames(2);
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let report = reconciler.run(root).await.unwrap();

        assert_eq!(report.counters.renamed_images, 1);
        assert_eq!(report.counters.retries_triggered, 2);
        assert_eq!(storage.rename_calls(), 3);
        assert_eq!(storage.name_of(&x_id).as_deref(), Some("1001.jpg"));
    }

    #[tokio::test]
    async fn test_exhausted_rename_aborts_but_keeps_log_line() {
        let harness = Harness::new().await;
        let (storage, _) = scenario();
        storage.fail_renames(100);
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(false), 3);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let err = reconciler.run(root).await.unwrap_err();

        match err {
            ReconcileError::RenameFailed { from, to, source } => {
                assert_eq!(from, "x.jpg");
                assert_eq!(to, "1001.jpg");
                assert!(matches!(source, RetryError::LimitExceeded { attempts: 3, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(harness.lines("renamed.log"), vec!["x.jpg -> 1001.jpg"]);
        assert_eq!(harness.counters.snapshot().retries_triggered, 3);
        assert_eq!(harness.counters.snapshot().renamed_images, 0);
    }

    #[tokio::test]
    async fn test_root_not_found() {
        let harness = Harness::new().await;
        let (storage, _) = scenario();
        let store = JsonIdentifierStore::default();
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let err = reconciler.resolve_root("Missing").await.unwrap_err();
        assert!(matches!(err, ReconcileError::RootNotFound(ref n) if n == "Missing"));
    }

    #[tokio::test]
    async fn test_duplicate_root_names_use_first() {
        let harness = Harness::new().await;
        let storage = MemoryStorage::new("root", "Products");
        storage.add_folder("root", "Products");
        let store = JsonIdentifierStore::default();
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        assert_eq!(root.id, "root");
        assert!(root.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts() {
        let harness = Harness::new().await;
        let (storage, _) = scenario();
        let mut store = MockIdentifierStore::new();
        store
            .expect_lookup()
            .returning(|_| Err(LookupError::NotConfigured("down".to_string())));
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);

        let root = reconciler.resolve_root("Products").await.unwrap();
        let err = reconciler.run(root).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Lookup { ref filename, .. } if filename == "x.jpg"));
        assert_eq!(storage.rename_calls(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let harness = Harness::new().await;
        let (storage, _) = scenario();
        let store = JsonIdentifierStore::default();
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);
        let root = reconciler.resolve_root("Products").await.unwrap();

        storage.fail_listing_after(storage.list_calls() + 1);
        let err = reconciler.run(root).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Listing { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_before_listing() {
        let harness = Harness::new().await;
        let (storage, _) = scenario();
        let store = JsonIdentifierStore::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reconciler = harness
            .reconciler(&storage, &store, options(false), 5)
            .with_cancellation(cancel);

        let err = reconciler
            .run(FolderNode::root(crate::storage::Entry::new("root", "Products")))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Cancelled));
        assert_eq!(storage.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_process_image_outcomes() {
        let harness = Harness::new().await;
        let (storage, x_id) = scenario();
        let store = JsonIdentifierStore::from_pairs([("x.jpg", "1001")]);
        let reconciler = harness.reconciler(&storage, &store, options(false), 5);
        let folder = FolderNode::root(crate::storage::Entry::new("root", "Products"));

        let hit = ImageEntry::new(crate::storage::Entry::new(x_id, "x.jpg"), &folder);
        let miss = ImageEntry::new(crate::storage::Entry::new("zz", "nope.gif"), &folder);

        assert_eq!(
            reconciler.process_image(&hit).await.unwrap(),
            ImageOutcome::Renamed {
                new_name: "1001.jpg".to_string()
            }
        );
        assert_eq!(
            reconciler.process_image(&miss).await.unwrap(),
            ImageOutcome::NotFound
        );
    }
}
