//! Document handles and marker locations.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Host-assigned document handle, typically a vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How the host currently presents a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// In-place range edits are available.
    Editable,
    /// Only whole-file read/write is available.
    ReadOnly,
}

/// Last known site of a timer marker.
///
/// May be stale; callers re-validate against current line content before
/// writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    pub document: DocumentId,
    pub line: usize,
}

impl DocumentLocation {
    pub fn new(document: DocumentId, line: usize) -> Self {
        Self { document, line }
    }
}
