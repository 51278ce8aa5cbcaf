//! Work tree
//!
//! An in-memory, mutable view of a tree rooted at a [`TreeEntry`]. Sub-trees
//! load lazily from the object store on first touch; edits copy-on-write the
//! dirty spine only, so untouched siblings keep their hashes and are never
//! re-serialized. [`WorkTree::root`] walks the dirty spine bottom-up, writes
//! each rebuilt sub-tree through the store, and returns the new root entry.
//!
//! A dirty node's entry holds the empty hash until `root()` recomputes it;
//! the old hash is never reused for mutated content.
//!
//! Work trees are per-operation values and are never shared across tasks.

use crate::diff::changes::{Change, ChangeAction, Changes};
use crate::error::{EngineError, Result, guard_cancel};
use crate::objects::hash::Hash;
use crate::objects::kind::ObjectKind;
use crate::objects::tree::{Tree, TreeEntry};
use crate::store::object_store::ObjectStore;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

type BoxedFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Mutable tree view over one repository's object store
pub struct WorkTree<'s> {
    store: &'s dyn ObjectStore,
    root: TreeCell,
}

#[derive(Debug)]
enum Node {
    Blob(TreeEntry),
    Tree(TreeCell),
}

impl Node {
    fn entry(&self) -> &TreeEntry {
        match self {
            Node::Blob(entry) => entry,
            Node::Tree(cell) => &cell.entry,
        }
    }
}

#[derive(Debug)]
struct TreeCell {
    entry: TreeEntry,
    /// `None` until the sub-tree is materialized from the store
    children: Option<BTreeMap<String, Node>>,
    dirty: bool,
}

impl TreeCell {
    fn fresh(name: &str) -> Self {
        TreeCell {
            entry: TreeEntry::tree(name, Hash::empty()),
            children: Some(BTreeMap::new()),
            dirty: true,
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.entry.hash = Hash::empty();
    }

    /// Materialize children on first touch and hand them out mutably
    async fn loaded_children(
        &mut self,
        store: &dyn ObjectStore,
        cancel: &CancellationToken,
    ) -> Result<&mut BTreeMap<String, Node>> {
        if self.children.is_none() {
            let map = if self.entry.hash.is_empty() {
                BTreeMap::new()
            } else {
                let tree = store.get_tree(cancel, &self.entry.hash).await?;
                tree.entries()
                    .iter()
                    .map(|entry| {
                        let node = if entry.is_tree() {
                            Node::Tree(TreeCell {
                                entry: entry.clone(),
                                children: None,
                                dirty: false,
                            })
                        } else {
                            Node::Blob(entry.clone())
                        };
                        (entry.name.clone(), node)
                    })
                    .collect()
            };
            self.children = Some(map);
        }
        Ok(self.children.get_or_insert_with(BTreeMap::new))
    }
}

impl<'s> WorkTree<'s> {
    /// Root a work tree at the given entry; an empty hash means an empty tree
    pub fn new(store: &'s dyn ObjectStore, root_entry: TreeEntry) -> Result<Self> {
        if !root_entry.is_tree() {
            return Err(EngineError::NotATree(format!(
                "work tree root {}",
                root_entry.hash
            )));
        }
        Ok(WorkTree {
            store,
            root: TreeCell {
                entry: root_entry,
                children: None,
                dirty: false,
            },
        })
    }

    /// List the immediate children at `path` (empty path lists the root)
    pub async fn ls(&mut self, cancel: &CancellationToken, path: &str) -> Result<Vec<TreeEntry>> {
        guard_cancel(cancel)?;
        let segments = split_path(path)?;
        let store = self.store;
        let cell = cell_at(&mut self.root, store, cancel, path, &segments).await?;
        let children = cell.loaded_children(store, cancel).await?;
        Ok(children.values().map(|n| n.entry().clone()).collect())
    }

    /// Look up the entry at `path`; the empty path names the root entry
    pub async fn find_entry(
        &mut self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<TreeEntry> {
        guard_cancel(cancel)?;
        let segments = split_path(path)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Ok(self.root.entry.clone());
        };
        let store = self.store;
        let cell = cell_at(&mut self.root, store, cancel, path, parents).await?;
        let children = cell.loaded_children(store, cancel).await?;
        children
            .get(*leaf)
            .map(|n| n.entry().clone())
            .ok_or_else(|| EngineError::PathNotFound(path.to_string()))
    }

    /// Insert a blob, creating intermediate trees as needed.
    ///
    /// Fails `AlreadyExists` when any entry already occupies the path.
    pub async fn add_blob(
        &mut self,
        cancel: &CancellationToken,
        path: &str,
        entry: TreeEntry,
    ) -> Result<()> {
        guard_cancel(cancel)?;
        let segments = split_path_non_empty(path)?;
        let entry = leaf_blob(path, entry)?;
        insert_blob(&mut self.root, self.store, cancel, path, &segments, entry).await
    }

    /// Replace an existing blob with new content
    pub async fn replace_blob(
        &mut self,
        cancel: &CancellationToken,
        path: &str,
        entry: TreeEntry,
    ) -> Result<()> {
        guard_cancel(cancel)?;
        let segments = split_path_non_empty(path)?;
        let entry = leaf_blob(path, entry)?;
        replace_blob(&mut self.root, self.store, cancel, path, &segments, entry).await
    }

    /// Remove the blob or tree at `path`; parents left empty are pruned
    pub async fn remove(&mut self, cancel: &CancellationToken, path: &str) -> Result<()> {
        guard_cancel(cancel)?;
        let segments = split_path_non_empty(path)?;
        remove_at(&mut self.root, self.store, cancel, path, &segments).await?;
        Ok(())
    }

    /// Apply one path-keyed change, dispatching on its action
    pub async fn apply_one_change(
        &mut self,
        cancel: &CancellationToken,
        change: &Change,
    ) -> Result<()> {
        match change.action()? {
            ChangeAction::Add => {
                let to = required_side(change, &change.to)?;
                self.add_blob(cancel, &change.path, to).await
            }
            ChangeAction::Modify => {
                let to = required_side(change, &change.to)?;
                self.replace_blob(cancel, &change.path, to).await
            }
            ChangeAction::Remove => self.remove(cancel, &change.path).await,
        }
    }

    /// Apply an ordered change stream, removals first.
    ///
    /// A type change arrives as a removal on one side of the path and adds
    /// on the other, and the lexicographic stream order puts a blob add at
    /// `p` *before* the removals under `p/`. Applying every removal first
    /// keeps both directions of a directory/file swap applicable.
    pub async fn apply_changes(
        &mut self,
        cancel: &CancellationToken,
        changes: &Changes,
    ) -> Result<()> {
        for change in changes.iter() {
            if change.action()? == ChangeAction::Remove {
                self.apply_one_change(cancel, change).await?;
            }
        }
        for change in changes.iter() {
            if change.action()? != ChangeAction::Remove {
                self.apply_one_change(cancel, change).await?;
            }
        }
        Ok(())
    }

    /// Serialize every dirty sub-tree bottom-up and return the new root.
    ///
    /// After this returns, everything the returned hash references is
    /// reachable through the store. A root left without entries collapses to
    /// the empty sentinel hash.
    pub async fn root(&mut self, cancel: &CancellationToken) -> Result<TreeEntry> {
        guard_cancel(cancel)?;
        if self.root.dirty && self.root.children.as_ref().is_some_and(|c| c.is_empty()) {
            self.root.entry.hash = Hash::empty();
            self.root.dirty = false;
        } else {
            flush(&mut self.root, self.store, cancel).await?;
        }
        Ok(self.root.entry.clone())
    }
}

/// Split and validate a slash-separated path; empty input means the root
fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    if path.starts_with('/') {
        return Err(EngineError::path_invalid(path, "leading slash"));
    }
    if path.ends_with('/') {
        return Err(EngineError::path_invalid(path, "trailing slash"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(EngineError::path_invalid(path, "empty segment"));
        }
        if *segment == "." || *segment == ".." {
            return Err(EngineError::path_invalid(path, "relative segment"));
        }
    }
    Ok(segments)
}

fn split_path_non_empty(path: &str) -> Result<Vec<&str>> {
    let segments = split_path(path)?;
    if segments.is_empty() {
        return Err(EngineError::path_invalid(path, "path is empty"));
    }
    Ok(segments)
}

/// Normalize an edit payload: must be a blob, named after its path leaf
fn leaf_blob(path: &str, mut entry: TreeEntry) -> Result<TreeEntry> {
    if entry.kind != ObjectKind::Blob {
        return Err(EngineError::NotABlob(path.to_string()));
    }
    if let Some(leaf) = path.rsplit('/').next() {
        entry.name = leaf.to_string();
    }
    Ok(entry)
}

fn required_side(change: &Change, side: &Option<TreeEntry>) -> Result<TreeEntry> {
    side.clone().ok_or_else(|| {
        EngineError::InvalidArg(format!("change at {} is missing its target entry", change.path))
    })
}

fn cell_at<'a>(
    cell: &'a mut TreeCell,
    store: &'a dyn ObjectStore,
    cancel: &'a CancellationToken,
    full_path: &'a str,
    segments: &'a [&'a str],
) -> BoxedFut<'a, &'a mut TreeCell> {
    Box::pin(async move {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(cell);
        };
        let children = cell.loaded_children(store, cancel).await?;
        match children.get_mut(*head) {
            Some(Node::Tree(sub)) => cell_at(sub, store, cancel, full_path, rest).await,
            Some(Node::Blob(_)) => Err(EngineError::NotATree(full_path.to_string())),
            None => Err(EngineError::PathNotFound(full_path.to_string())),
        }
    })
}

fn insert_blob<'a>(
    cell: &'a mut TreeCell,
    store: &'a dyn ObjectStore,
    cancel: &'a CancellationToken,
    full_path: &'a str,
    segments: &'a [&'a str],
    entry: TreeEntry,
) -> BoxedFut<'a, ()> {
    Box::pin(async move {
        let children = cell.loaded_children(store, cancel).await?;
        match segments {
            [leaf] => {
                if children.contains_key(*leaf) {
                    return Err(EngineError::AlreadyExists(full_path.to_string()));
                }
                children.insert((*leaf).to_string(), Node::Blob(entry));
            }
            [head, rest @ ..] => {
                let child = children
                    .entry((*head).to_string())
                    .or_insert_with(|| Node::Tree(TreeCell::fresh(head)));
                match child {
                    Node::Tree(sub) => {
                        insert_blob(sub, store, cancel, full_path, rest, entry).await?
                    }
                    Node::Blob(_) => return Err(EngineError::NotATree(full_path.to_string())),
                }
            }
            [] => {
                return Err(EngineError::path_invalid(full_path, "path is empty"));
            }
        }
        cell.mark_dirty();
        Ok(())
    })
}

fn replace_blob<'a>(
    cell: &'a mut TreeCell,
    store: &'a dyn ObjectStore,
    cancel: &'a CancellationToken,
    full_path: &'a str,
    segments: &'a [&'a str],
    entry: TreeEntry,
) -> BoxedFut<'a, ()> {
    Box::pin(async move {
        let children = cell.loaded_children(store, cancel).await?;
        match segments {
            [leaf] => match children.get_mut(*leaf) {
                Some(Node::Blob(slot)) => *slot = entry,
                Some(Node::Tree(_)) => return Err(EngineError::NotABlob(full_path.to_string())),
                None => return Err(EngineError::PathNotFound(full_path.to_string())),
            },
            [head, rest @ ..] => match children.get_mut(*head) {
                Some(Node::Tree(sub)) => {
                    replace_blob(sub, store, cancel, full_path, rest, entry).await?
                }
                Some(Node::Blob(_)) => return Err(EngineError::NotATree(full_path.to_string())),
                None => return Err(EngineError::PathNotFound(full_path.to_string())),
            },
            [] => {
                return Err(EngineError::path_invalid(full_path, "path is empty"));
            }
        }
        cell.mark_dirty();
        Ok(())
    })
}

/// Remove at `segments`; the returned flag tells the parent whether this
/// sub-tree is now empty and should itself be dropped
fn remove_at<'a>(
    cell: &'a mut TreeCell,
    store: &'a dyn ObjectStore,
    cancel: &'a CancellationToken,
    full_path: &'a str,
    segments: &'a [&'a str],
) -> BoxedFut<'a, bool> {
    Box::pin(async move {
        let children = cell.loaded_children(store, cancel).await?;
        match segments {
            [leaf] => {
                if children.remove(*leaf).is_none() {
                    return Err(EngineError::PathNotFound(full_path.to_string()));
                }
            }
            [head, rest @ ..] => match children.get_mut(*head) {
                Some(Node::Tree(sub)) => {
                    let now_empty = remove_at(sub, store, cancel, full_path, rest).await?;
                    if now_empty {
                        children.remove(*head);
                    }
                }
                Some(Node::Blob(_)) => return Err(EngineError::NotATree(full_path.to_string())),
                None => return Err(EngineError::PathNotFound(full_path.to_string())),
            },
            [] => {
                return Err(EngineError::path_invalid(full_path, "path is empty"));
            }
        }
        let now_empty = children.is_empty();
        cell.mark_dirty();
        Ok(now_empty)
    })
}

fn flush<'a>(
    cell: &'a mut TreeCell,
    store: &'a dyn ObjectStore,
    cancel: &'a CancellationToken,
) -> BoxedFut<'a, ()> {
    Box::pin(async move {
        if !cell.dirty {
            return Ok(());
        }
        let Some(children) = cell.children.as_mut() else {
            // Never materialized, so nothing was edited underneath.
            cell.dirty = false;
            return Ok(());
        };

        for node in children.values_mut() {
            if let Node::Tree(sub) = node {
                flush(sub, store, cancel).await?;
            }
        }

        let entries: Vec<TreeEntry> = children.values().map(|n| n.entry().clone()).collect();
        let tree = Tree::new(entries)?;
        let hash = store.put_tree(cancel, &tree).await?;
        cell.entry.hash = hash;
        cell.dirty = false;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::blob::Blob;
    use crate::objects::codec::EncodeObject;
    use crate::objects::hash::HashKind;
    use crate::store::memory::MemoryObjectStore;
    use uuid::Uuid;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    async fn stored_blob(store: &MemoryObjectStore, content: &[u8]) -> TreeEntry {
        let blob = Blob::from_content(content.to_vec(), HashKind::Sha256).unwrap();
        let hash = store.put_blob(&token(), &blob).await.unwrap();
        TreeEntry::blob("", hash, blob.size())
    }

    fn empty_tree(store: &MemoryObjectStore) -> WorkTree<'_> {
        WorkTree::new(store, TreeEntry::root(Hash::empty())).unwrap()
    }

    #[tokio::test]
    async fn builds_nested_trees_and_matches_manual_hash() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);

        let blob = stored_blob(&store, b"hi\n").await;
        tree.add_blob(&cancel, "docs/readme.md", blob.clone())
            .await
            .unwrap();
        let root = tree.root(&cancel).await.unwrap();

        // tree{docs -> tree{readme.md -> blob}}
        let inner = Tree::new(vec![TreeEntry::blob("readme.md", blob.hash.clone(), blob.size)])
            .unwrap();
        let inner_hash = inner.hash_of(HashKind::Sha256).unwrap();
        let outer = Tree::new(vec![TreeEntry::tree("docs", inner_hash)]).unwrap();
        assert_eq!(root.hash, outer.hash_of(HashKind::Sha256).unwrap());

        // Everything the root references is reachable through the store.
        let mut reopened = WorkTree::new(&store, root).unwrap();
        let listed = reopened.ls(&cancel, "docs").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "readme.md");
    }

    #[tokio::test]
    async fn ls_distinguishes_missing_from_blob() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let blob = stored_blob(&store, b"x").await;
        tree.add_blob(&cancel, "src/a.txt", blob).await.unwrap();

        assert!(matches!(
            tree.ls(&cancel, "src/missing").await,
            Err(EngineError::PathNotFound(_))
        ));
        assert!(matches!(
            tree.ls(&cancel, "src/a.txt").await,
            Err(EngineError::NotATree(_))
        ));
        let root_entries = tree.ls(&cancel, "").await.unwrap();
        assert_eq!(root_entries.len(), 1);
        assert_eq!(root_entries[0].name, "src");
    }

    #[tokio::test]
    async fn add_collision_is_already_exists() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let blob = stored_blob(&store, b"x").await;

        tree.add_blob(&cancel, "a/b.txt", blob.clone()).await.unwrap();
        assert!(matches!(
            tree.add_blob(&cancel, "a/b.txt", blob.clone()).await,
            Err(EngineError::AlreadyExists(_))
        ));
        // A whole sub-tree also blocks an add at its path.
        assert!(matches!(
            tree.add_blob(&cancel, "a", blob.clone()).await,
            Err(EngineError::AlreadyExists(_))
        ));
        // Descending through a blob is a kind mismatch.
        assert!(matches!(
            tree.add_blob(&cancel, "a/b.txt/c.txt", blob).await,
            Err(EngineError::NotATree(_))
        ));
    }

    #[tokio::test]
    async fn replace_requires_an_existing_blob() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let first = stored_blob(&store, b"one").await;
        let second = stored_blob(&store, b"two").await;

        tree.add_blob(&cancel, "dir/file.txt", first.clone()).await.unwrap();

        assert!(matches!(
            tree.replace_blob(&cancel, "dir/other.txt", second.clone()).await,
            Err(EngineError::PathNotFound(_))
        ));
        assert!(matches!(
            tree.replace_blob(&cancel, "dir", second.clone()).await,
            Err(EngineError::NotABlob(_))
        ));

        tree.replace_blob(&cancel, "dir/file.txt", second.clone())
            .await
            .unwrap();
        let entry = tree.find_entry(&cancel, "dir/file.txt").await.unwrap();
        assert_eq!(entry.hash, second.hash);
    }

    #[tokio::test]
    async fn removing_the_last_blob_prunes_upward() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let blob = stored_blob(&store, b"deep").await;

        tree.add_blob(&cancel, "a/b/c.txt", blob.clone()).await.unwrap();
        tree.add_blob(&cancel, "a/d.txt", blob.clone()).await.unwrap();

        tree.remove(&cancel, "a/b/c.txt").await.unwrap();
        // `a/b` became empty and is gone; `a` still holds d.txt.
        let entries = tree.ls(&cancel, "a").await.unwrap();
        assert_eq!(
            entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["d.txt"]
        );

        tree.remove(&cancel, "a/d.txt").await.unwrap();
        let root = tree.root(&cancel).await.unwrap();
        assert!(root.hash.is_empty());
    }

    #[tokio::test]
    async fn remove_missing_path_is_not_found() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        assert!(matches!(
            tree.remove(&cancel, "nope.txt").await,
            Err(EngineError::PathNotFound(_))
        ));
    }

    #[tokio::test]
    async fn path_validation_rejects_unsafe_shapes() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let blob = stored_blob(&store, b"x").await;

        for path in ["/lead", "trail/", "a//b", ".", "..", "a/./b", ""] {
            let result = tree.add_blob(&cancel, path, blob.clone()).await;
            assert!(
                matches!(result, Err(EngineError::PathInvalid { .. })),
                "path {path:?} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn disjoint_edit_order_does_not_change_the_root() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let one = stored_blob(&store, b"one").await;
        let two = stored_blob(&store, b"two").await;

        let mut forward = empty_tree(&store);
        forward.add_blob(&cancel, "x/a.txt", one.clone()).await.unwrap();
        forward.add_blob(&cancel, "y/b.txt", two.clone()).await.unwrap();
        let forward_root = forward.root(&cancel).await.unwrap();

        let mut backward = empty_tree(&store);
        backward.add_blob(&cancel, "y/b.txt", two).await.unwrap();
        backward.add_blob(&cancel, "x/a.txt", one).await.unwrap();
        let backward_root = backward.root(&cancel).await.unwrap();

        assert_eq!(forward_root.hash, backward_root.hash);
    }

    #[tokio::test]
    async fn only_the_dirty_spine_is_rewritten() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let blob = stored_blob(&store, b"seed").await;

        let mut tree = empty_tree(&store);
        tree.add_blob(&cancel, "left/a.txt", blob.clone()).await.unwrap();
        tree.add_blob(&cancel, "right/b.txt", blob.clone()).await.unwrap();
        let first_root = tree.root(&cancel).await.unwrap();

        let mut second = WorkTree::new(&store, first_root).unwrap();
        let untouched_before = second.find_entry(&cancel, "left").await.unwrap();
        let replacement = stored_blob(&store, b"changed").await;
        second
            .replace_blob(&cancel, "right/b.txt", replacement)
            .await
            .unwrap();

        let written_before = store.object_count();
        let new_root = second.root(&cancel).await.unwrap();
        // Exactly the rebuilt `right` tree and the new root were written.
        assert_eq!(store.object_count(), written_before + 2);

        let mut reopened = WorkTree::new(&store, new_root).unwrap();
        let untouched_after = reopened.find_entry(&cancel, "left").await.unwrap();
        assert_eq!(untouched_before.hash, untouched_after.hash);
    }

    #[tokio::test]
    async fn root_without_edits_returns_the_original_entry() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let root = tree.root(&cancel).await.unwrap();
        assert!(root.hash.is_empty());

        let blob = stored_blob(&store, b"v").await;
        tree.add_blob(&cancel, "f.txt", blob).await.unwrap();
        let first = tree.root(&cancel).await.unwrap();
        let second = tree.root(&cancel).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn apply_one_change_dispatches_on_action() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let mut tree = empty_tree(&store);
        let v1 = stored_blob(&store, b"v1").await;
        let v2 = stored_blob(&store, b"v2").await;

        let add = Change::add("f.txt", v1.clone());
        tree.apply_one_change(&cancel, &add).await.unwrap();

        let modify = Change::modify("f.txt", v1.clone(), v2.clone());
        tree.apply_one_change(&cancel, &modify).await.unwrap();
        assert_eq!(
            tree.find_entry(&cancel, "f.txt").await.unwrap().hash,
            v2.hash
        );

        let remove = Change::remove("f.txt", v2);
        tree.apply_one_change(&cancel, &remove).await.unwrap();
        assert!(tree.root(&cancel).await.unwrap().hash.is_empty());
    }

    #[tokio::test]
    async fn canceled_token_aborts_before_store_io() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let blob = stored_blob(&store, b"x").await;
        let mut tree = empty_tree(&store);
        tree.add_blob(&cancel, "f.txt", blob).await.unwrap();

        cancel.cancel();
        assert!(matches!(
            tree.root(&cancel).await,
            Err(EngineError::Canceled)
        ));
    }
}
