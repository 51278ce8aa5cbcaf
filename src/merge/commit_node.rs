//! Commit graph traversal
//!
//! [`CommitNode`] wraps a commit and resolves parents on demand through the
//! object store. The graph is a DAG by construction (a commit's hash depends
//! on its parents, so a cycle would need a hash collision), which lets every
//! traversal terminate on a visited-set.
//!
//! `merge_base` returns the *lowest* common ancestors: commits reachable from
//! both inputs that are not strict ancestors of another such commit. Criss-
//! cross histories legitimately produce more than one.

use crate::error::{Result, guard_cancel};
use crate::objects::commit::Commit;
use crate::objects::hash::Hash;
use crate::store::object_store::ObjectStore;
use bitflags::bitflags;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio_util::sync::CancellationToken;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Reach: u8 {
        const FROM_SOURCE = 0b01;
        const FROM_TARGET = 0b10;
        const FROM_BOTH = Self::FROM_SOURCE.bits() | Self::FROM_TARGET.bits();
    }
}

/// Lazy wrapper over a commit in one repository's object store
#[derive(Clone)]
pub struct CommitNode<'s> {
    store: &'s dyn ObjectStore,
    commit: Commit,
}

impl<'s> CommitNode<'s> {
    pub fn new(store: &'s dyn ObjectStore, commit: Commit) -> Self {
        CommitNode { store, commit }
    }

    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    pub fn hash(&self) -> &Hash {
        &self.commit.hash
    }

    /// Resolve parent commits through the store
    pub async fn parents(&self, cancel: &CancellationToken) -> Result<Vec<CommitNode<'s>>> {
        let mut parents = Vec::with_capacity(self.commit.parent_hashes.len());
        for hash in &self.commit.parent_hashes {
            let commit = self.store.commit_by_hash(cancel, hash).await?;
            parents.push(CommitNode::new(self.store, commit));
        }
        Ok(parents)
    }

    /// True when `self` is reachable from `descendant` over parent edges.
    ///
    /// Every commit is an ancestor of itself.
    pub async fn is_ancestor_of(
        &self,
        cancel: &CancellationToken,
        descendant: &CommitNode<'_>,
    ) -> Result<bool> {
        let target = &self.commit.hash;
        if target == &descendant.commit.hash {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue: VecDeque<Hash> = descendant.commit.parent_hashes.iter().cloned().collect();
        while let Some(hash) = queue.pop_front() {
            guard_cancel(cancel)?;
            if &hash == target {
                return Ok(true);
            }
            if !visited.insert(hash.clone()) {
                continue;
            }
            let commit = self.store.commit_by_hash(cancel, &hash).await?;
            queue.extend(commit.parent_hashes);
        }
        Ok(false)
    }

    /// Lowest common ancestors of `self` and `other`, ordered by hash.
    ///
    /// Empty when the histories share no root; more than one entry for
    /// criss-cross histories.
    pub async fn merge_base(
        &self,
        cancel: &CancellationToken,
        other: &CommitNode<'_>,
    ) -> Result<Vec<CommitNode<'s>>> {
        let mut reach: HashMap<Hash, Reach> = HashMap::new();
        let mut cache: HashMap<Hash, Commit> = HashMap::new();

        self.tag_ancestors(cancel, &self.commit, Reach::FROM_SOURCE, &mut reach, &mut cache)
            .await?;
        self.tag_ancestors(cancel, &other.commit, Reach::FROM_TARGET, &mut reach, &mut cache)
            .await?;

        let common: HashSet<Hash> = reach
            .iter()
            .filter(|(_, flags)| flags.contains(Reach::FROM_BOTH))
            .map(|(hash, _)| hash.clone())
            .collect();
        if common.is_empty() {
            return Ok(Vec::new());
        }

        // A common ancestor that is a strict ancestor of another common
        // ancestor is not lowest; walk up from each member and mark every
        // common commit found above it.
        let mut redundant: HashSet<Hash> = HashSet::new();
        for hash in &common {
            let mut visited = HashSet::new();
            let mut queue: VecDeque<Hash> = self
                .cached_commit(cancel, &mut cache, hash)
                .await?
                .parent_hashes
                .into();
            while let Some(above) = queue.pop_front() {
                guard_cancel(cancel)?;
                if !visited.insert(above.clone()) {
                    continue;
                }
                if common.contains(&above) {
                    redundant.insert(above.clone());
                }
                queue.extend(self.cached_commit(cancel, &mut cache, &above).await?.parent_hashes);
            }
        }

        let mut best: Vec<Hash> = common.difference(&redundant).cloned().collect();
        best.sort();

        let mut nodes = Vec::with_capacity(best.len());
        for hash in best {
            let commit = self.cached_commit(cancel, &mut cache, &hash).await?;
            nodes.push(CommitNode::new(self.store, commit));
        }
        Ok(nodes)
    }

    /// BFS over parent edges tagging every reachable commit with `flag`
    async fn tag_ancestors(
        &self,
        cancel: &CancellationToken,
        start: &Commit,
        flag: Reach,
        reach: &mut HashMap<Hash, Reach>,
        cache: &mut HashMap<Hash, Commit>,
    ) -> Result<()> {
        cache.insert(start.hash.clone(), start.clone());
        let mut queue: VecDeque<Hash> = VecDeque::from([start.hash.clone()]);
        while let Some(hash) = queue.pop_front() {
            guard_cancel(cancel)?;
            let flags = reach.entry(hash.clone()).or_insert(Reach::empty());
            if flags.contains(flag) {
                continue;
            }
            *flags |= flag;
            let commit = self.cached_commit(cancel, cache, &hash).await?;
            queue.extend(commit.parent_hashes);
        }
        Ok(())
    }

    async fn cached_commit(
        &self,
        cancel: &CancellationToken,
        cache: &mut HashMap<Hash, Commit>,
        hash: &Hash,
    ) -> Result<Commit> {
        if let Some(commit) = cache.get(hash) {
            return Ok(commit.clone());
        }
        let commit = self.store.commit_by_hash(cancel, hash).await?;
        cache.insert(hash.clone(), commit.clone());
        Ok(commit)
    }
}
