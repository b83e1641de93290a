use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub(crate) const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const IMAGE_MIME_PREFIX: &str = "image/";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Folder query accepts either a parent id or a folder name, not both")]
    AmbiguousFolderFilter,

    #[error("Folder query needs a parent id or a folder name")]
    MissingFolderFilter,
}

/// What kind of entry a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    Image,
}

/// Which entries of that kind to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Direct children of the folder with this id
    Parent(String),
    /// Folders with exactly this display name, anywhere
    Name(String),
}

/// A validated listing query descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    kind: EntryKind,
    scope: Scope,
    page_size: u32,
}

impl ListQuery {
    /// Folder query by parent or by name.
    ///
    /// Exactly one filter must be supplied.
    pub fn folders(parent: Option<&str>, name: Option<&str>) -> Result<Self, QueryError> {
        let scope = match (parent, name) {
            (Some(_), Some(_)) => return Err(QueryError::AmbiguousFolderFilter),
            (None, None) => return Err(QueryError::MissingFolderFilter),
            (Some(parent), None) => Scope::Parent(parent.to_string()),
            (None, Some(name)) => Scope::Name(name.to_string()),
        };

        Ok(Self {
            kind: EntryKind::Folder,
            scope,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn subfolders(parent: &str) -> Self {
        Self {
            kind: EntryKind::Folder,
            scope: Scope::Parent(parent.to_string()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn images(parent: &str) -> Self {
        Self {
            kind: EntryKind::Image,
            scope: Scope::Parent(parent.to_string()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Render as a Google Drive `q` search expression.
    pub fn to_drive_expression(&self) -> String {
        let mut clauses = Vec::with_capacity(3);

        match self.kind {
            EntryKind::Folder => clauses.push(format!("mimeType = '{}'", FOLDER_MIME_TYPE)),
            EntryKind::Image => clauses.push(format!("mimeType contains '{}'", IMAGE_MIME_PREFIX)),
        }

        match &self.scope {
            Scope::Parent(id) => clauses.push(format!("'{}' in parents", escape_literal(id))),
            Scope::Name(name) => clauses.push(format!("name = '{}'", escape_literal(name))),
        }

        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
