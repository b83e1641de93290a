use crate::storage::{Entry, DEFAULT_PAGE_SIZE};

use super::counters::CounterSnapshot;

/// A folder discovered during traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    /// `None` for the root folder
    pub parent_id: Option<String>,
}

impl FolderNode {
    pub fn root(entry: Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            parent_id: None,
        }
    }

    pub fn child(entry: Entry, parent: &FolderNode) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            parent_id: Some(parent.id.clone()),
        }
    }
}

/// An image file discovered during traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

impl ImageEntry {
    pub fn new(entry: Entry, parent: &FolderNode) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            parent_id: parent.id.clone(),
        }
    }
}

/// What happened to one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// No identifier matched the filename
    NotFound,
    /// Matched and renamed remotely
    Renamed { new_name: String },
    /// Matched, but dry-run left the file alone
    Planned { new_name: String },
}

/// Behaviour switches for a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub dry_run: bool,
    pub log_operations: bool,
    pub page_size: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            log_operations: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Summary returned when a traversal finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub root: FolderNode,
    pub folders_visited: u64,
    pub counters: CounterSnapshot,
    pub dry_run: bool,
}
