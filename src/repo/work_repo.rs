//! Working view of a repository for one operator
//!
//! [`WorkRepo`] glues the version core to the metadata adapters: it resolves
//! tip references, manages branches and per-user staging areas, and publishes
//! new heads. Publication is always write-then-publish: objects are durable
//! in the object store before the branch row moves, and the move itself is a
//! compare-and-set against the head observed at the start of the operation.

use crate::diff::changes::{Change, Changes};
use crate::diff::merge_iter::ResolveConflict;
use crate::diff::tree_diff::TreeDiff;
use crate::error::{EngineError, Result, guard_cancel};
use crate::models::branch::{Branch, HEAD_NAME, validate_branch_name};
use crate::models::repository::Repository;
use crate::models::user::User;
use crate::models::wip::Wip;
use crate::objects::commit::Commit;
use crate::objects::hash::Hash;
use crate::objects::tree::TreeEntry;
use crate::repo::commit_op::CommitOp;
use crate::store::metadata::{BranchStore, UserStore, WipStore};
use crate::store::object_store::ObjectStore;
use crate::worktree::WorkTree;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Expected hex length of a full commit hash (32-byte sha family)
const FULL_HASH_HEX_LEN: usize = 64;

/// A tip reference: branch name, full hex commit hash, or the literal `HEAD`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSpec {
    /// The repository's default branch
    Head,
    Branch(String),
    Commit(Hash),
}

impl RefSpec {
    /// Classify a tip string.
    ///
    /// Branch names are capped well below a full hash's hex length, so a
    /// 64-character lower-case hex string is always a commit address.
    pub fn parse(s: &str) -> Result<RefSpec> {
        if s.is_empty() {
            return Err(EngineError::InvalidArg("empty ref".to_string()));
        }
        if s == HEAD_NAME {
            return Ok(RefSpec::Head);
        }
        if s.len() == FULL_HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(RefSpec::Commit(Hash::from_hex(s)?));
        }
        Ok(RefSpec::Branch(s.to_string()))
    }
}

/// Per-operator working view over one repository
pub struct WorkRepo<'s> {
    operator: User,
    repository: Repository,
    store: &'s dyn ObjectStore,
    branches: &'s dyn BranchStore,
    wips: &'s dyn WipStore,
    users: &'s dyn UserStore,
}

impl<'s> WorkRepo<'s> {
    pub fn new(
        operator: User,
        repository: Repository,
        store: &'s dyn ObjectStore,
        branches: &'s dyn BranchStore,
        wips: &'s dyn WipStore,
        users: &'s dyn UserStore,
    ) -> Self {
        WorkRepo {
            operator,
            repository,
            store,
            branches,
            wips,
            users,
        }
    }

    pub fn operator(&self) -> &User {
        &self.operator
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    fn commit_op(&self, head: Option<Commit>) -> CommitOp<'s> {
        CommitOp::new(self.store, self.users, self.wips, head)
    }

    /// Resolve a tip to its commit; `None` for a branch with no commits yet
    pub async fn resolve_commit(
        &self,
        cancel: &CancellationToken,
        spec: &RefSpec,
    ) -> Result<Option<Commit>> {
        guard_cancel(cancel)?;
        let head_hash = match spec {
            RefSpec::Head => self.branch(cancel, &self.repository.head).await?.commit_hash,
            RefSpec::Branch(name) => self.branch(cancel, name).await?.commit_hash,
            RefSpec::Commit(hash) => hash.clone(),
        };
        if head_hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.store.commit_by_hash(cancel, &head_hash).await?))
    }

    pub async fn branch(&self, cancel: &CancellationToken, name: &str) -> Result<Branch> {
        self.branches
            .branch_by_name(cancel, self.repository.id, name)
            .await
    }

    pub async fn list_branches(&self, cancel: &CancellationToken) -> Result<Vec<Branch>> {
        self.branches.list_branches(cancel, self.repository.id).await
    }

    /// Create a branch pointing at the source tip
    pub async fn create_branch(
        &self,
        cancel: &CancellationToken,
        name: &str,
        source: &RefSpec,
    ) -> Result<Branch> {
        guard_cancel(cancel)?;
        validate_branch_name(name)?;
        let source_commit = self.resolve_commit(cancel, source).await?;
        let commit_hash = source_commit.map(|c| c.hash).unwrap_or_default();
        let branch = Branch::new(self.repository.id, name, commit_hash, self.operator.id);
        self.branches.insert_branch(cancel, branch).await
    }

    /// Delete a branch and every staging area attached to it.
    ///
    /// The repository's default branch is protected.
    pub async fn delete_branch(&self, cancel: &CancellationToken, name: &str) -> Result<()> {
        guard_cancel(cancel)?;
        if name == self.repository.head {
            return Err(EngineError::InvalidArg(
                "cannot delete the repository HEAD branch".to_string(),
            ));
        }
        let branch = self.branch(cancel, name).await?;
        self.wips
            .delete_wips_for_branch(cancel, self.repository.id, branch.id)
            .await?;
        self.branches.delete_branch(cancel, branch.id).await
    }

    /// Fetch the operator's staging area on a branch, creating it from the
    /// branch head on first access. The created WIP starts with
    /// `current_tree` equal to the base commit's tree.
    pub async fn get_or_create_wip(
        &self,
        cancel: &CancellationToken,
        branch_name: &str,
    ) -> Result<(Wip, bool)> {
        guard_cancel(cancel)?;
        let branch = self.branch(cancel, branch_name).await?;
        if let Some(existing) = self
            .wips
            .wip_for_branch(cancel, self.repository.id, branch.id, self.operator.id)
            .await?
        {
            return Ok((existing, false));
        }

        let current_tree = match self
            .resolve_commit(cancel, &RefSpec::Commit(branch.commit_hash.clone()))
            .await?
        {
            Some(commit) => commit.tree_hash,
            None => Hash::empty(),
        };
        let wip = Wip::new(
            self.repository.id,
            branch.id,
            self.operator.id,
            branch.commit_hash,
            current_tree,
        );
        let wip = self.wips.insert_wip(cancel, wip).await?;
        Ok((wip, true))
    }

    pub async fn list_wips(&self, cancel: &CancellationToken) -> Result<Vec<Wip>> {
        self.wips
            .list_wips(cancel, self.repository.id, self.operator.id)
            .await
    }

    /// Drop the operator's staging area on a branch
    pub async fn delete_wip(&self, cancel: &CancellationToken, branch_name: &str) -> Result<()> {
        guard_cancel(cancel)?;
        let branch = self.branch(cancel, branch_name).await?;
        let wip = self
            .wips
            .wip_for_branch(cancel, self.repository.id, branch.id, self.operator.id)
            .await?
            .ok_or_else(|| EngineError::WipNotFound(branch_name.to_string()))?;
        self.wips.delete_wip(cancel, wip.id).await
    }

    /// Stage one edit into a WIP: apply it to the WIP's tree, serialize the
    /// dirty spine, and advance `current_tree`
    pub async fn stage_change(
        &self,
        cancel: &CancellationToken,
        wip: &mut Wip,
        change: &Change,
    ) -> Result<()> {
        guard_cancel(cancel)?;
        let mut work_tree = WorkTree::new(self.store, TreeEntry::root(wip.current_tree.clone()))?;
        work_tree.apply_one_change(cancel, change).await?;
        let root = work_tree.root(cancel).await?;

        wip.current_tree = root.hash;
        wip.updated_at = Utc::now();
        self.wips.update_wip(cancel, wip.clone()).await
    }

    /// Commit the operator's staged tree onto a branch.
    ///
    /// The branch advances by compare-and-set from the head observed here; a
    /// concurrent writer makes this fail `StaleBranch` without publishing
    /// anything. On success the WIP is reset onto the new head.
    pub async fn commit_changes(
        &self,
        cancel: &CancellationToken,
        branch_name: &str,
        message: &str,
    ) -> Result<Commit> {
        guard_cancel(cancel)?;
        let branch = self.branch(cancel, branch_name).await?;
        let mut wip = self
            .wips
            .wip_for_branch(cancel, self.repository.id, branch.id, self.operator.id)
            .await?
            .ok_or_else(|| EngineError::WipNotFound(branch_name.to_string()))?;

        let observed_head = branch.commit_hash.clone();
        let head_commit = if observed_head.is_empty() {
            None
        } else {
            Some(self.store.commit_by_hash(cancel, &observed_head).await?)
        };

        let op = self.commit_op(head_commit);
        let committed = op
            .add_commit(cancel, &self.operator, wip.id, message)
            .await?;
        let commit = committed
            .commit()
            .cloned()
            .ok_or_else(|| EngineError::Internal(anyhow::anyhow!("add_commit returned no head")))?;

        self.branches
            .update_branch_head(cancel, branch.id, &observed_head, &commit.hash)
            .await?;
        debug!(branch = %branch.name, head = %commit.hash, "branch advanced");

        wip.base_commit = commit.hash.clone();
        wip.current_tree = commit.tree_hash.clone();
        wip.updated_at = Utc::now();
        self.wips.update_wip(cancel, wip).await?;

        Ok(commit)
    }

    /// Merge a source tip into a branch and publish the result.
    ///
    /// Fast-forwards and ancestor no-ops publish without creating a commit;
    /// a real three-way merge publishes the new merge commit.
    pub async fn merge_into(
        &self,
        cancel: &CancellationToken,
        branch_name: &str,
        source: &RefSpec,
        message: &str,
        resolver: &dyn ResolveConflict,
    ) -> Result<Commit> {
        guard_cancel(cancel)?;
        let branch = self.branch(cancel, branch_name).await?;
        let observed_head = branch.commit_hash.clone();
        let head_commit = if observed_head.is_empty() {
            None
        } else {
            Some(self.store.commit_by_hash(cancel, &observed_head).await?)
        };
        let source_commit = self
            .resolve_commit(cancel, source)
            .await?
            .ok_or_else(|| EngineError::InvalidArg("merge source has no commits".to_string()))?;

        let op = self.commit_op(head_commit);
        let merged = op
            .merge(
                cancel,
                &self.operator,
                &source_commit.hash,
                message,
                resolver,
            )
            .await?;

        self.branches
            .update_branch_head(cancel, branch.id, &observed_head, &merged.hash)
            .await?;
        debug!(branch = %branch.name, head = %merged.hash, "merge published");
        Ok(merged)
    }

    /// Diff a `base...head` range (three dots), optionally scoped to a path
    /// prefix
    pub async fn diff_range(
        &self,
        cancel: &CancellationToken,
        range: &str,
        path: Option<&str>,
    ) -> Result<Changes> {
        guard_cancel(cancel)?;
        let (base, head) = range.split_once("...").ok_or_else(|| {
            EngineError::InvalidArg(format!("diff range must be base...head, got {range:?}"))
        })?;
        let base_commit = self.resolve_commit(cancel, &RefSpec::parse(base)?).await?;
        let head_commit = self.resolve_commit(cancel, &RefSpec::parse(head)?).await?;

        let base_tree = base_commit.map(|c| c.tree_hash).unwrap_or_default();
        let head_tree = head_commit.map(|c| c.tree_hash).unwrap_or_default();
        let changes = TreeDiff::new(self.store)
            .diff(cancel, &base_tree, &head_tree)
            .await?;
        Ok(match path {
            Some(prefix) => changes.with_prefix(prefix),
            None => changes,
        })
    }

    /// List the entries at `path` in a tip's tree
    pub async fn ls(
        &self,
        cancel: &CancellationToken,
        spec: &RefSpec,
        path: &str,
    ) -> Result<Vec<TreeEntry>> {
        guard_cancel(cancel)?;
        let tree_hash = self
            .resolve_commit(cancel, spec)
            .await?
            .map(|c| c.tree_hash)
            .unwrap_or_default();
        let mut work_tree = WorkTree::new(self.store, TreeEntry::root(tree_hash))?;
        work_tree.ls(cancel, path).await
    }
}
