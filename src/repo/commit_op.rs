//! Commit operations: append, diff, three-way merge
//!
//! [`CommitOp`] wraps the current head of a line of history (`None` for an
//! empty repository) together with the adapters it needs. Appending reads the
//! staged tree out of a WIP; merging reconciles two diff streams computed
//! from the merge base and applies them to a work tree rooted at that base.
//!
//! Nothing here touches branch heads: the caller publishes the returned
//! commit with a compare-and-set after the objects are durable.

use crate::diff::changes::Changes;
use crate::diff::merge_iter::{MergeIter, ResolveConflict};
use crate::diff::tree_diff::TreeDiff;
use crate::error::{EngineError, Result, guard_cancel};
use crate::merge::commit_node::CommitNode;
use crate::models::user::User;
use crate::objects::commit::{Commit, Signature};
use crate::objects::hash::Hash;
use crate::objects::tree::TreeEntry;
use crate::store::metadata::{UserStore, WipStore};
use crate::store::object_store::ObjectStore;
use crate::worktree::WorkTree;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

type BoxedFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Operation handle anchored at a head commit (`None` = empty repository)
pub struct CommitOp<'s> {
    store: &'s dyn ObjectStore,
    users: &'s dyn UserStore,
    wips: &'s dyn WipStore,
    commit: Option<Commit>,
}

impl<'s> CommitOp<'s> {
    pub fn new(
        store: &'s dyn ObjectStore,
        users: &'s dyn UserStore,
        wips: &'s dyn WipStore,
        commit: Option<Commit>,
    ) -> Self {
        CommitOp {
            store,
            users,
            wips,
            commit,
        }
    }

    pub fn commit(&self) -> Option<&Commit> {
        self.commit.as_ref()
    }

    fn with_commit(&self, commit: Option<Commit>) -> CommitOp<'s> {
        CommitOp::new(self.store, self.users, self.wips, commit)
    }

    fn tree_hash(&self) -> Hash {
        self.commit
            .as_ref()
            .map(|c| c.tree_hash.clone())
            .unwrap_or_default()
    }

    /// Append a commit on top of the current head from a WIP's staged tree.
    ///
    /// The author is the WIP creator with the WIP's last-update time; the
    /// committer is the submitter with the current time. The first commit of
    /// a repository has no parents.
    pub async fn add_commit(
        &self,
        cancel: &CancellationToken,
        committer: &User,
        wip_id: Uuid,
        message: &str,
    ) -> Result<CommitOp<'s>> {
        guard_cancel(cancel)?;
        let wip = self.wips.wip_by_id(cancel, wip_id).await?;
        let creator = self.users.user_by_id(cancel, wip.creator_id).await?;

        let parent_hashes = match &self.commit {
            Some(head) => vec![head.hash.clone()],
            None => Vec::new(),
        };
        let now = Utc::now();
        let commit = Commit {
            hash: Hash::empty(),
            author: Signature::new(creator.name, creator.email, wip.updated_at),
            committer: Signature::new(committer.name.clone(), committer.email.clone(), now),
            merge_tag: String::new(),
            message: message.to_string(),
            tree_hash: wip.current_tree.clone(),
            parent_hashes,
            created_at: now,
            updated_at: now,
        };
        let commit = self.store.insert_commit(cancel, commit).await?;
        debug!(hash = %commit.hash, "appended commit");
        Ok(self.with_commit(Some(commit)))
    }

    /// Changes turning this head's tree into `to_commit`'s tree
    pub async fn diff_commit(
        &self,
        cancel: &CancellationToken,
        to_commit: &Hash,
    ) -> Result<Changes> {
        guard_cancel(cancel)?;
        let to = self.store.commit_by_hash(cancel, to_commit).await?;
        TreeDiff::new(self.store)
            .diff(cancel, &self.tree_hash(), &to.tree_hash)
            .await
    }

    /// Three-way merge of `to_merge` into the current head.
    ///
    /// Degenerate cases return an existing commit: merging an ancestor is a
    /// no-op on the head, and a head that is itself an ancestor of `to_merge`
    /// fast-forwards without creating anything. Otherwise the two diff
    /// streams from the merge base are reconciled (collecting *every*
    /// conflicting path before failing) and committed with parents
    /// `[ours, theirs]`.
    pub async fn merge(
        &self,
        cancel: &CancellationToken,
        merger: &User,
        to_merge: &Hash,
        message: &str,
        resolver: &dyn ResolveConflict,
    ) -> Result<Commit> {
        self.merge_boxed(cancel, merger, to_merge, message, resolver)
            .await
    }

    fn merge_boxed<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        merger: &'a User,
        to_merge: &'a Hash,
        message: &'a str,
        resolver: &'a dyn ResolveConflict,
    ) -> BoxedFut<'a, Commit> {
        Box::pin(async move {
            guard_cancel(cancel)?;
            let base = self.commit.clone().ok_or_else(|| {
                EngineError::InvalidArg("cannot merge into an empty repository".to_string())
            })?;
            let to_merge_commit = self.store.commit_by_hash(cancel, to_merge).await?;

            let base_node = CommitNode::new(self.store, base.clone());
            let merge_node = CommitNode::new(self.store, to_merge_commit.clone());

            // Merging something already contained in the head changes nothing.
            if merge_node.is_ancestor_of(cancel, &base_node).await? {
                warn!(merge = %to_merge, head = %base.hash, "merge commit is an ancestor of the head");
                return Ok(base);
            }

            // The head is behind: fast-forward without creating a commit.
            if base_node.is_ancestor_of(cancel, &merge_node).await? {
                debug!(merge = %to_merge, head = %base.hash, "fast-forward merge");
                return Ok(to_merge_commit);
            }

            let bases = base_node.merge_base(cancel, &merge_node).await?;
            let Some(first_base) = bases.first() else {
                return Err(EngineError::NoCommonAncestor {
                    ours: base.hash.clone(),
                    theirs: to_merge.clone(),
                });
            };

            // Criss-cross: reduce the bases pairwise into a virtual base
            // commit. Its objects are persisted so the merged tree stays
            // reachable, but no branch ever points at it.
            let mut best = first_base.commit().clone();
            for other in &bases[1..] {
                debug!(left = %best.hash, right = %other.hash(), "merging merge-bases into a virtual base");
                let op = self.with_commit(Some(best));
                best = op
                    .merge_boxed(cancel, merger, other.hash(), "", resolver)
                    .await?;
            }

            let base_op = self.with_commit(Some(best.clone()));
            let base_diff = base_op.diff_commit(cancel, &base.hash).await?;
            let merge_diff = base_op.diff_commit(cancel, &to_merge_commit.hash).await?;

            let reconciled = MergeIter::new(base_diff, merge_diff, resolver).reconcile()?;

            let mut work_tree =
                WorkTree::new(self.store, TreeEntry::root(best.tree_hash.clone()))?;
            work_tree.apply_changes(cancel, &reconciled).await?;
            let root = work_tree.root(cancel).await?;

            let now = Utc::now();
            let sig = Signature::new(merger.name.clone(), merger.email.clone(), now);
            let commit = Commit {
                hash: Hash::empty(),
                author: sig.clone(),
                committer: sig,
                merge_tag: String::new(),
                message: message.to_string(),
                tree_hash: root.hash,
                parent_hashes: vec![base.hash.clone(), to_merge.clone()],
                created_at: now,
                updated_at: now,
            };
            let commit = self.store.insert_commit(cancel, commit).await?;
            debug!(hash = %commit.hash, "created merge commit");
            Ok(commit)
        })
    }
}
