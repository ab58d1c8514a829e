//! Shared option types that replace boolean flag parameters in the Rust API.

use serde::{Deserialize, Serialize};

/// Indicates whether the caller wants to ignore caches or reuse fresh ones.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RefreshStrategy {
    /// Recompute even when a fresh cache exists.
    Force,
    /// Reuse cached data when available and fresh.
    UseCache,
}

impl RefreshStrategy {
    pub fn is_force(self) -> bool {
        matches!(self, RefreshStrategy::Force)
    }
}

impl From<bool> for RefreshStrategy {
    fn from(value: bool) -> Self {
        if value {
            RefreshStrategy::Force
        } else {
            RefreshStrategy::UseCache
        }
    }
}

/// How a document store maps a basefile onto the filesystem.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePolicy {
    /// `<maindir>/<basefile><suffix>`
    #[default]
    File,
    /// `<maindir>/<basefile>/index<suffix>`, leaving room for attachments.
    Dir,
}

/// Selects which of the three relate steps should run for a document.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RelateNeeded {
    pub fulltext: bool,
    pub dependencies: bool,
    pub triples: bool,
}

impl RelateNeeded {
    pub fn all() -> Self {
        RelateNeeded {
            fulltext: true,
            dependencies: true,
            triples: true,
        }
    }

    pub fn none() -> Self {
        RelateNeeded {
            fulltext: false,
            dependencies: false,
            triples: false,
        }
    }

    pub fn any(self) -> bool {
        self.fulltext || self.dependencies || self.triples
    }
}

impl Default for RelateNeeded {
    fn default() -> Self {
        RelateNeeded::all()
    }
}

impl From<bool> for RelateNeeded {
    fn from(value: bool) -> Self {
        if value {
            RelateNeeded::all()
        } else {
            RelateNeeded::none()
        }
    }
}
