//! Tree-to-tree diffing
//!
//! A single synchronized walk over two trees. At each level the sorted child
//! names are merged; sub-trees whose hashes match are skipped whole, so the
//! walk touches only the divergent spine of the two snapshots.
//!
//! A type change (blob vs tree at the same path) is modeled as delete+add at
//! all leaves, never as a modify.
//!
//! Changes are collected keyed by full path, which yields the contractual
//! lexicographic emission order: note that this is *not* the per-level entry
//! order (`a.txt` sorts before `a/b` because `.` < `/`).

use crate::diff::changes::{Change, Changes};
use crate::error::{Result, guard_cancel};
use crate::objects::hash::Hash;
use crate::objects::tree::{Tree, TreeEntry};
use crate::store::object_store::ObjectStore;
use derive_new::new;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

type BoxedFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Diff engine over one repository's object store
#[derive(new)]
pub struct TreeDiff<'s> {
    store: &'s dyn ObjectStore,
}

impl<'s> TreeDiff<'s> {
    /// Compute all changes turning the `old` tree into the `new` tree,
    /// ordered lexicographically by full path
    pub async fn diff(
        &self,
        cancel: &CancellationToken,
        old: &Hash,
        new: &Hash,
    ) -> Result<Changes> {
        let mut out = BTreeMap::new();
        self.walk(cancel, old.clone(), new.clone(), String::new(), &mut out)
            .await?;
        Ok(Changes::from_sorted(out))
    }

    /// The empty hash is the absent sentinel and loads as an empty tree
    async fn load_tree(&self, cancel: &CancellationToken, hash: &Hash) -> Result<Tree> {
        if hash.is_empty() {
            return Ok(Tree::empty());
        }
        self.store.get_tree(cancel, hash).await
    }

    fn walk<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        old_hash: Hash,
        new_hash: Hash,
        prefix: String,
        out: &'a mut BTreeMap<String, Change>,
    ) -> BoxedFut<'a, ()> {
        Box::pin(async move {
            guard_cancel(cancel)?;
            if old_hash == new_hash {
                return Ok(());
            }

            let old_tree = self.load_tree(cancel, &old_hash).await?;
            let new_tree = self.load_tree(cancel, &new_hash).await?;

            let old_entries = old_tree.entries();
            let new_entries = new_tree.entries();
            let (mut i, mut j) = (0, 0);

            loop {
                let order = match (old_entries.get(i), new_entries.get(j)) {
                    (Some(old), Some(new)) => old.name.cmp(&new.name),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => break,
                };

                match order {
                    Ordering::Less => {
                        let old = &old_entries[i];
                        i += 1;
                        self.emit_removed(cancel, old, &prefix, out).await?;
                    }
                    Ordering::Greater => {
                        let new = &new_entries[j];
                        j += 1;
                        self.emit_added(cancel, new, &prefix, out).await?;
                    }
                    Ordering::Equal => {
                        let old = &old_entries[i];
                        let new = &new_entries[j];
                        i += 1;
                        j += 1;
                        if old.hash == new.hash && old.kind == new.kind {
                            continue;
                        }
                        let path = join(&prefix, &old.name);
                        match (old.is_tree(), new.is_tree()) {
                            (false, false) => {
                                out.insert(
                                    path.clone(),
                                    Change::modify(path, old.clone(), new.clone()),
                                );
                            }
                            (true, true) => {
                                self.walk(cancel, old.hash.clone(), new.hash.clone(), path, out)
                                    .await?;
                            }
                            (false, true) => {
                                // blob replaced by a tree: delete the blob,
                                // then add every leaf of the new side
                                out.insert(path.clone(), Change::remove(path.clone(), old.clone()));
                                self.walk(cancel, Hash::empty(), new.hash.clone(), path, out)
                                    .await?;
                            }
                            (true, false) => {
                                self.walk(
                                    cancel,
                                    old.hash.clone(),
                                    Hash::empty(),
                                    path.clone(),
                                    out,
                                )
                                .await?;
                                out.insert(path.clone(), Change::add(path, new.clone()));
                            }
                        }
                    }
                }
            }

            Ok(())
        })
    }

    async fn emit_removed(
        &self,
        cancel: &CancellationToken,
        entry: &TreeEntry,
        prefix: &str,
        out: &mut BTreeMap<String, Change>,
    ) -> Result<()> {
        let path = join(prefix, &entry.name);
        if entry.is_tree() {
            self.walk(cancel, entry.hash.clone(), Hash::empty(), path, out)
                .await
        } else {
            out.insert(path.clone(), Change::remove(path, entry.clone()));
            Ok(())
        }
    }

    async fn emit_added(
        &self,
        cancel: &CancellationToken,
        entry: &TreeEntry,
        prefix: &str,
        out: &mut BTreeMap<String, Change>,
    ) -> Result<()> {
        let path = join(prefix, &entry.name);
        if entry.is_tree() {
            self.walk(cancel, Hash::empty(), entry.hash.clone(), path, out)
                .await
        } else {
            out.insert(path.clone(), Change::add(path, entry.clone()));
            Ok(())
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::changes::ChangeAction;
    use crate::objects::blob::Blob;
    use crate::objects::hash::HashKind;
    use crate::store::memory::MemoryObjectStore;
    use crate::worktree::WorkTree;
    use uuid::Uuid;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    async fn stored_blob(store: &MemoryObjectStore, content: &[u8]) -> TreeEntry {
        let blob = Blob::from_content(content.to_vec(), HashKind::Sha256).unwrap();
        let hash = store.put_blob(&token(), &blob).await.unwrap();
        TreeEntry::blob("", hash, blob.size())
    }

    /// Build a tree out of `(path, content)` pairs and return its root hash
    async fn build_tree(store: &MemoryObjectStore, files: &[(&str, &[u8])]) -> Hash {
        let cancel = token();
        let mut tree = WorkTree::new(store, TreeEntry::root(Hash::empty())).unwrap();
        for (path, content) in files {
            let entry = stored_blob(store, content).await;
            tree.add_blob(&cancel, path, entry).await.unwrap();
        }
        tree.root(&cancel).await.unwrap().hash
    }

    fn actions(changes: &Changes) -> Vec<(String, ChangeAction)> {
        changes
            .iter()
            .map(|c| (c.path.clone(), c.action().unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn identical_trees_diff_to_nothing() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let root = build_tree(&store, &[("a.txt", b"1"), ("d/b.txt", b"2")]).await;

        let diff = TreeDiff::new(&store);
        assert!(diff.diff(&cancel, &root, &root).await.unwrap().is_empty());
        assert!(
            diff.diff(&cancel, &Hash::empty(), &Hash::empty())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn detects_adds_removes_and_modifies() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let old = build_tree(&store, &[("a.txt", b"v1"), ("docs/b.txt", b"x")]).await;
        let new = build_tree(&store, &[("a.txt", b"v2"), ("c.txt", b"y")]).await;

        let changes = TreeDiff::new(&store).diff(&cancel, &old, &new).await.unwrap();
        assert_eq!(
            actions(&changes),
            vec![
                ("a.txt".to_string(), ChangeAction::Modify),
                ("c.txt".to_string(), ChangeAction::Add),
                ("docs/b.txt".to_string(), ChangeAction::Remove),
            ]
        );
    }

    #[tokio::test]
    async fn emission_order_is_lexicographic_on_full_paths() {
        // `a.txt` < `a/x.txt` because `.` sorts before `/`, even though the
        // per-level entry order visits `a` before `a.txt`.
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let new = build_tree(
            &store,
            &[("a/x.txt", b"1"), ("a.txt", b"2"), ("a/b/y.txt", b"3")],
        )
        .await;

        let changes = TreeDiff::new(&store)
            .diff(&cancel, &Hash::empty(), &new)
            .await
            .unwrap();
        assert_eq!(changes.paths(), vec!["a.txt", "a/b/y.txt", "a/x.txt"]);
    }

    #[tokio::test]
    async fn blob_to_tree_change_removes_before_adding() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let old = build_tree(&store, &[("p", b"was a file")]).await;
        let new = build_tree(&store, &[("p/x.txt", b"1"), ("p/y.txt", b"2")]).await;

        let changes = TreeDiff::new(&store).diff(&cancel, &old, &new).await.unwrap();
        assert_eq!(
            actions(&changes),
            vec![
                ("p".to_string(), ChangeAction::Remove),
                ("p/x.txt".to_string(), ChangeAction::Add),
                ("p/y.txt".to_string(), ChangeAction::Add),
            ]
        );
    }

    #[tokio::test]
    async fn tree_to_blob_change_is_delete_plus_add() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let old = build_tree(&store, &[("p/x.txt", b"1")]).await;
        let new = build_tree(&store, &[("p", b"now a file")]).await;

        let changes = TreeDiff::new(&store).diff(&cancel, &old, &new).await.unwrap();
        assert_eq!(
            actions(&changes),
            vec![
                ("p".to_string(), ChangeAction::Add),
                ("p/x.txt".to_string(), ChangeAction::Remove),
            ]
        );
    }

    #[tokio::test]
    async fn applying_a_diff_reproduces_the_target_tree() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let old = build_tree(
            &store,
            &[("a.txt", b"v1"), ("src/lib.rs", b"old"), ("docs/guide.md", b"g")],
        )
        .await;
        let new = build_tree(
            &store,
            &[("a.txt", b"v2"), ("src/lib.rs", b"old"), ("src/main.rs", b"m")],
        )
        .await;

        let changes = TreeDiff::new(&store).diff(&cancel, &old, &new).await.unwrap();

        let mut work_tree = WorkTree::new(&store, TreeEntry::root(old)).unwrap();
        work_tree.apply_changes(&cancel, &changes).await.unwrap();
        let root = work_tree.root(&cancel).await.unwrap();
        assert_eq!(root.hash, new);
    }

    #[tokio::test]
    async fn applying_a_type_change_diff_reproduces_the_target() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let dir = build_tree(
            &store,
            &[("p/x.txt", b"1"), ("p/y.txt", b"2"), ("keep.txt", b"k")],
        )
        .await;
        let flat = build_tree(&store, &[("p", b"now a file"), ("keep.txt", b"k")]).await;

        // Directory to file and back again; the stream must apply either way.
        for (old, new) in [(dir.clone(), flat.clone()), (flat, dir)] {
            let changes = TreeDiff::new(&store).diff(&cancel, &old, &new).await.unwrap();

            let mut work_tree = WorkTree::new(&store, TreeEntry::root(old)).unwrap();
            work_tree.apply_changes(&cancel, &changes).await.unwrap();
            let root = work_tree.root(&cancel).await.unwrap();
            assert_eq!(root.hash, new);
        }
    }

    #[tokio::test]
    async fn diff_to_the_empty_tree_removes_every_leaf() {
        let store = MemoryObjectStore::new(Uuid::new_v4());
        let cancel = token();
        let old = build_tree(&store, &[("a/b/c.txt", b"1"), ("a/d.txt", b"2")]).await;

        let changes = TreeDiff::new(&store)
            .diff(&cancel, &old, &Hash::empty())
            .await
            .unwrap();
        assert_eq!(
            actions(&changes),
            vec![
                ("a/b/c.txt".to_string(), ChangeAction::Remove),
                ("a/d.txt".to_string(), ChangeAction::Remove),
            ]
        );
    }
}
