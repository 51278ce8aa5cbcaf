//! Metadata adapter traits
//!
//! Branch, WIP and user persistence. The engine touches these at the start
//! and end of an operation; intermediate object writes go straight to the
//! object store. Branch head movement is compare-and-set: the update carries
//! the head the caller observed, and a mismatch fails `StaleBranch` so the
//! caller can retry against the new head.

use crate::error::Result;
use crate::models::branch::Branch;
use crate::models::user::User;
use crate::models::wip::Wip;
use crate::objects::hash::Hash;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Insert a branch; `(repository_id, name)` must be unique
    async fn insert_branch(&self, cancel: &CancellationToken, branch: Branch) -> Result<Branch>;

    async fn branch_by_name(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        name: &str,
    ) -> Result<Branch>;

    async fn list_branches(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
    ) -> Result<Vec<Branch>>;

    /// Advance the head from `expected` to `next`; fails `StaleBranch` when
    /// the stored head is no longer `expected`
    async fn update_branch_head(
        &self,
        cancel: &CancellationToken,
        branch_id: Uuid,
        expected: &Hash,
        next: &Hash,
    ) -> Result<()>;

    async fn delete_branch(&self, cancel: &CancellationToken, branch_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait WipStore: Send + Sync {
    async fn insert_wip(&self, cancel: &CancellationToken, wip: Wip) -> Result<Wip>;

    async fn wip_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<Wip>;

    /// The staging area a user holds on a branch, if any
    async fn wip_for_branch(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        ref_id: Uuid,
        creator_id: Uuid,
    ) -> Result<Option<Wip>>;

    async fn list_wips(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        creator_id: Uuid,
    ) -> Result<Vec<Wip>>;

    async fn update_wip(&self, cancel: &CancellationToken, wip: Wip) -> Result<()>;

    async fn delete_wip(&self, cancel: &CancellationToken, id: Uuid) -> Result<()>;

    /// Drop every staging area attached to a branch; returns how many
    async fn delete_wips_for_branch(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        ref_id: Uuid,
    ) -> Result<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, cancel: &CancellationToken, user: User) -> Result<User>;

    async fn user_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<User>;

    async fn user_by_name(&self, cancel: &CancellationToken, name: &str) -> Result<User>;
}
