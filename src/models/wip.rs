//! Work-in-progress row
//!
//! A WIP is the per-(branch, user) staging area held between commits. It is
//! created from the branch head (so `current_tree` starts equal to the base
//! commit's tree) and advances as edits are staged; committing resets it onto
//! the new head.

use crate::objects::hash::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WipState {
    Init,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wip {
    pub id: Uuid,
    pub repository_id: Uuid,
    /// Branch this WIP stages onto
    pub ref_id: Uuid,
    pub creator_id: Uuid,
    /// Commit the staging area was created from; empty on an empty branch
    pub base_commit: Hash,
    /// Tree being mutated; starts as the base commit's tree
    pub current_tree: Hash,
    pub state: WipState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wip {
    pub fn new(
        repository_id: Uuid,
        ref_id: Uuid,
        creator_id: Uuid,
        base_commit: Hash,
        current_tree: Hash,
    ) -> Self {
        let now = Utc::now();
        Wip {
            id: Uuid::new_v4(),
            repository_id,
            ref_id,
            creator_id,
            base_commit,
            current_tree,
            state: WipState::Init,
            created_at: now,
            updated_at: now,
        }
    }
}
