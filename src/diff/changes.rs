//! Path-keyed change stream
//!
//! A [`Change`] is one atomic edit of a tree; [`Changes`] is an ordered
//! sequence of them, strictly ascending by full path. The emission order is
//! contractual: consumers (the merge iterator above all) rely on it to walk
//! two streams in lockstep.

use crate::error::{EngineError, Result};
use crate::objects::tree::TreeEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Add,
    Modify,
    Remove,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Modify => "modify",
            ChangeAction::Remove => "remove",
        }
    }
}

/// One path-keyed edit: what the entry was, and what it becomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Slash-separated path from the tree root
    pub path: String,
    pub from: Option<TreeEntry>,
    pub to: Option<TreeEntry>,
}

impl Change {
    pub fn add(path: impl Into<String>, to: TreeEntry) -> Self {
        Change {
            path: path.into(),
            from: None,
            to: Some(to),
        }
    }

    pub fn modify(path: impl Into<String>, from: TreeEntry, to: TreeEntry) -> Self {
        Change {
            path: path.into(),
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn remove(path: impl Into<String>, from: TreeEntry) -> Self {
        Change {
            path: path.into(),
            from: Some(from),
            to: None,
        }
    }

    /// Classify the edit, enforcing the per-action invariants
    pub fn action(&self) -> Result<ChangeAction> {
        match (&self.from, &self.to) {
            (None, Some(_)) => Ok(ChangeAction::Add),
            (Some(_), None) => Ok(ChangeAction::Remove),
            (Some(from), Some(to)) if from.hash != to.hash => Ok(ChangeAction::Modify),
            (Some(_), Some(_)) => Err(EngineError::InvalidArg(format!(
                "change at {} modifies nothing",
                self.path
            ))),
            (None, None) => Err(EngineError::InvalidArg(format!(
                "change at {} has neither side",
                self.path
            ))),
        }
    }

    /// Resulting content address, `None` for a removal
    pub fn to_hash(&self) -> Option<&crate::objects::hash::Hash> {
        self.to.as_ref().map(|e| &e.hash)
    }
}

/// Ordered change sequence with cursor-style iteration
#[derive(Debug, Clone, Default)]
pub struct Changes {
    items: Vec<Change>,
    cursor: usize,
}

impl Changes {
    /// Build from changes in any order; they are sorted by path
    pub fn new(mut items: Vec<Change>) -> Self {
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Changes { items, cursor: 0 }
    }

    pub(crate) fn from_sorted(map: BTreeMap<String, Change>) -> Self {
        Changes {
            items: map.into_values().collect(),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has(&self) -> bool {
        self.cursor < self.items.len()
    }

    pub fn next(&mut self) -> Option<&Change> {
        let change = self.items.get(self.cursor)?;
        self.cursor += 1;
        Some(change)
    }

    /// Rewind the cursor to the first change
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Change) -> Result<()>,
    {
        for change in &self.items {
            f(change)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.items.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.items.iter().map(|c| c.path.as_str()).collect()
    }

    /// Keep only changes under the given path prefix (used by path-scoped
    /// diff listings); an empty prefix keeps everything
    pub fn with_prefix(&self, prefix: &str) -> Changes {
        if prefix.is_empty() {
            return self.clone();
        }
        let items = self
            .items
            .iter()
            .filter(|c| {
                c.path == prefix
                    || c.path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .cloned()
            .collect();
        Changes { items, cursor: 0 }
    }

    pub(crate) fn into_vec(self) -> Vec<Change> {
        self.items
    }
}

impl IntoIterator for Changes {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
