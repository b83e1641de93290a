//! In-memory storage double for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::query::{EntryKind, ListQuery, Scope};
use super::types::{Entry, Page, StorageError};
use super::FileStorage;

#[derive(Debug, Clone)]
struct Node {
    id: String,
    name: String,
    parent: Option<String>,
    kind: EntryKind,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    next_id: u32,
    list_calls: u32,
    fail_listing_after: Option<u32>,
    rename_calls: u32,
    rename_failures: u32,
}

pub struct MemoryStorage {
    root_id: String,
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new(root_id: &str, root_name: &str) -> Self {
        let storage = Self {
            root_id: root_id.to_string(),
            state: Mutex::new(State::default()),
        };
        storage.state.lock().unwrap().nodes.push(Node {
            id: root_id.to_string(),
            name: root_name.to_string(),
            parent: None,
            kind: EntryKind::Folder,
        });
        storage
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    fn add(&self, parent: &str, name: &str, kind: EntryKind) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("n{}", state.next_id);
        state.nodes.push(Node {
            id: id.clone(),
            name: name.to_string(),
            parent: Some(parent.to_string()),
            kind,
        });
        id
    }

    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        self.add(parent, name, EntryKind::Folder)
    }

    pub fn add_image(&self, parent: &str, name: &str) -> String {
        self.add(parent, name, EntryKind::Image)
    }

    /// Let `n` listing calls succeed, then fail every later one.
    pub fn fail_listing_after(&self, n: u32) {
        self.state.lock().unwrap().fail_listing_after = Some(n);
    }

    pub fn resume_listing(&self) {
        self.state.lock().unwrap().fail_listing_after = None;
    }

    /// Fail the next `n` rename calls.
    pub fn fail_renames(&self, n: u32) {
        self.state.lock().unwrap().rename_failures = n;
    }

    pub fn list_calls(&self) -> u32 {
        self.state.lock().unwrap().list_calls
    }

    pub fn rename_calls(&self) -> u32 {
        self.state.lock().unwrap().rename_calls
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.name.clone())
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn list(&self, query: &ListQuery, page_token: Option<&str>) -> Result<Page, StorageError> {
        let mut state = self.state.lock().unwrap();

        if let Some(limit) = state.fail_listing_after {
            if state.list_calls >= limit {
                return Err(StorageError::Network("connection reset".to_string()));
            }
        }
        state.list_calls += 1;

        let matching: Vec<Entry> = state
            .nodes
            .iter()
            .filter(|n| n.kind == query.kind())
            .filter(|n| match query.scope() {
                Scope::Parent(p) => n.parent.as_deref() == Some(p.as_str()),
                Scope::Name(name) => &n.name == name,
            })
            .map(|n| Entry::new(n.id.clone(), n.name.clone()))
            .collect();

        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + query.page_size() as usize).min(matching.len());
        let entries = matching[offset.min(end)..end].to_vec();

        if end < matching.len() {
            Ok(Page::with_token(entries, end.to_string()))
        } else {
            Ok(Page::last(entries))
        }
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.rename_calls += 1;

        if state.rename_failures > 0 {
            state.rename_failures -= 1;
            return Err(StorageError::RateLimited);
        }

        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        node.name = new_name.to_string();
        Ok(())
    }
}
