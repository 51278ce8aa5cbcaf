//! In-memory reference adapters
//!
//! Process-local implementations of the store traits, used by the test suite
//! and by embedders that do not need durability. Each table sits behind its
//! own mutex, which also gives the compare-and-set on branch heads its
//! atomicity.

use crate::error::{EngineError, Result, guard_cancel};
use crate::models::branch::Branch;
use crate::models::user::User;
use crate::models::wip::Wip;
use crate::objects::hash::{Hash, HashKind};
use crate::objects::kind::ObjectKind;
use crate::store::metadata::{BranchStore, UserStore, WipStore};
use crate::store::object_store::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Content-addressed object table for one repository
#[derive(Debug)]
pub struct MemoryObjectStore {
    repository_id: Uuid,
    hash_kind: HashKind,
    objects: Mutex<HashMap<(ObjectKind, Hash), Bytes>>,
}

impl MemoryObjectStore {
    pub fn new(repository_id: Uuid) -> Self {
        MemoryObjectStore {
            repository_id,
            hash_kind: HashKind::default(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored objects, handy for reachability assertions
    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn contains(&self, kind: ObjectKind, hash: &Hash) -> bool {
        self.objects.lock().contains_key(&(kind, hash.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn repository_id(&self) -> Uuid {
        self.repository_id
    }

    fn hash_kind(&self) -> HashKind {
        self.hash_kind
    }

    async fn put(
        &self,
        cancel: &CancellationToken,
        kind: ObjectKind,
        hash: &Hash,
        bytes: Bytes,
    ) -> Result<()> {
        guard_cancel(cancel)?;
        self.objects
            .lock()
            .entry((kind, hash.clone()))
            .or_insert(bytes);
        Ok(())
    }

    async fn get(
        &self,
        cancel: &CancellationToken,
        kind: ObjectKind,
        hash: &Hash,
    ) -> Result<Bytes> {
        guard_cancel(cancel)?;
        self.objects
            .lock()
            .get(&(kind, hash.clone()))
            .cloned()
            .ok_or_else(|| EngineError::ObjectNotFound(hash.clone()))
    }
}

/// Branch, WIP and user tables
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    branches: Mutex<Vec<Branch>>,
    wips: Mutex<Vec<Wip>>,
    users: Mutex<Vec<User>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        MemoryMetadataStore::default()
    }
}

#[async_trait]
impl BranchStore for MemoryMetadataStore {
    async fn insert_branch(&self, cancel: &CancellationToken, branch: Branch) -> Result<Branch> {
        guard_cancel(cancel)?;
        let mut branches = self.branches.lock();
        if branches
            .iter()
            .any(|b| b.repository_id == branch.repository_id && b.name == branch.name)
        {
            return Err(EngineError::AlreadyExists(format!("branch {}", branch.name)));
        }
        branches.push(branch.clone());
        Ok(branch)
    }

    async fn branch_by_name(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        name: &str,
    ) -> Result<Branch> {
        guard_cancel(cancel)?;
        self.branches
            .lock()
            .iter()
            .find(|b| b.repository_id == repository_id && b.name == name)
            .cloned()
            .ok_or_else(|| EngineError::BranchNotFound(name.to_string()))
    }

    async fn list_branches(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
    ) -> Result<Vec<Branch>> {
        guard_cancel(cancel)?;
        let mut branches: Vec<Branch> = self
            .branches
            .lock()
            .iter()
            .filter(|b| b.repository_id == repository_id)
            .cloned()
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn update_branch_head(
        &self,
        cancel: &CancellationToken,
        branch_id: Uuid,
        expected: &Hash,
        next: &Hash,
    ) -> Result<()> {
        guard_cancel(cancel)?;
        let mut branches = self.branches.lock();
        let branch = branches
            .iter_mut()
            .find(|b| b.id == branch_id)
            .ok_or_else(|| EngineError::BranchNotFound(branch_id.to_string()))?;
        if &branch.commit_hash != expected {
            return Err(EngineError::StaleBranch {
                branch: branch.name.clone(),
                expected: expected.clone(),
                actual: branch.commit_hash.clone(),
            });
        }
        branch.commit_hash = next.clone();
        branch.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_branch(&self, cancel: &CancellationToken, branch_id: Uuid) -> Result<()> {
        guard_cancel(cancel)?;
        let mut branches = self.branches.lock();
        let before = branches.len();
        branches.retain(|b| b.id != branch_id);
        if branches.len() == before {
            return Err(EngineError::BranchNotFound(branch_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WipStore for MemoryMetadataStore {
    async fn insert_wip(&self, cancel: &CancellationToken, wip: Wip) -> Result<Wip> {
        guard_cancel(cancel)?;
        let mut wips = self.wips.lock();
        if wips
            .iter()
            .any(|w| w.ref_id == wip.ref_id && w.creator_id == wip.creator_id)
        {
            return Err(EngineError::AlreadyExists(format!("wip on ref {}", wip.ref_id)));
        }
        wips.push(wip.clone());
        Ok(wip)
    }

    async fn wip_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<Wip> {
        guard_cancel(cancel)?;
        self.wips
            .lock()
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| EngineError::WipNotFound(id.to_string()))
    }

    async fn wip_for_branch(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        ref_id: Uuid,
        creator_id: Uuid,
    ) -> Result<Option<Wip>> {
        guard_cancel(cancel)?;
        Ok(self
            .wips
            .lock()
            .iter()
            .find(|w| {
                w.repository_id == repository_id
                    && w.ref_id == ref_id
                    && w.creator_id == creator_id
            })
            .cloned())
    }

    async fn list_wips(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        creator_id: Uuid,
    ) -> Result<Vec<Wip>> {
        guard_cancel(cancel)?;
        Ok(self
            .wips
            .lock()
            .iter()
            .filter(|w| w.repository_id == repository_id && w.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn update_wip(&self, cancel: &CancellationToken, wip: Wip) -> Result<()> {
        guard_cancel(cancel)?;
        let mut wips = self.wips.lock();
        let slot = wips
            .iter_mut()
            .find(|w| w.id == wip.id)
            .ok_or_else(|| EngineError::WipNotFound(wip.id.to_string()))?;
        *slot = wip;
        Ok(())
    }

    async fn delete_wip(&self, cancel: &CancellationToken, id: Uuid) -> Result<()> {
        guard_cancel(cancel)?;
        let mut wips = self.wips.lock();
        let before = wips.len();
        wips.retain(|w| w.id != id);
        if wips.len() == before {
            return Err(EngineError::WipNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_wips_for_branch(
        &self,
        cancel: &CancellationToken,
        repository_id: Uuid,
        ref_id: Uuid,
    ) -> Result<u64> {
        guard_cancel(cancel)?;
        let mut wips = self.wips.lock();
        let before = wips.len();
        wips.retain(|w| !(w.repository_id == repository_id && w.ref_id == ref_id));
        Ok((before - wips.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryMetadataStore {
    async fn insert_user(&self, cancel: &CancellationToken, user: User) -> Result<User> {
        guard_cancel(cancel)?;
        let mut users = self.users.lock();
        if users.iter().any(|u| u.name == user.name) {
            return Err(EngineError::AlreadyExists(format!("user {}", user.name)));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, cancel: &CancellationToken, id: Uuid) -> Result<User> {
        guard_cancel(cancel)?;
        self.users
            .lock()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(id.to_string()))
    }

    async fn user_by_name(&self, cancel: &CancellationToken, name: &str) -> Result<User> {
        guard_cancel(cancel)?;
        self.users
            .lock()
            .iter()
            .find(|u| u.name == name)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(name.to_string()))
    }
}
