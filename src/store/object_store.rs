//! Object store interface
//!
//! Content-addressed put/get of canonical object bytes, scoped to one
//! repository. The engine assumes a successful `put` is durable before any
//! reference (branch head, commit parent) naming the hash is published, and
//! that the implementation is linearizable per repository.
//!
//! Implementations (SQL, S3, local FS) live outside the engine; the typed
//! helpers below are the only codec-aware surface the core uses.

use crate::error::{EngineError, Result, guard_cancel};
use crate::objects::blob::Blob;
use crate::objects::codec::{DecodeObject, EncodeObject};
use crate::objects::commit::Commit;
use crate::objects::hash::{Hash, HashKind};
use crate::objects::kind::ObjectKind;
use crate::objects::tree::Tree;
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Repository this store is scoped to
    fn repository_id(&self) -> Uuid;

    /// Digest algorithm used for every address in this repository
    fn hash_kind(&self) -> HashKind;

    /// Store canonical bytes under `(kind, hash)`.
    ///
    /// Idempotent: writing an existing hash is a no-op.
    async fn put(
        &self,
        cancel: &CancellationToken,
        kind: ObjectKind,
        hash: &Hash,
        bytes: Bytes,
    ) -> Result<()>;

    /// Fetch canonical bytes, or `ObjectNotFound`
    async fn get(&self, cancel: &CancellationToken, kind: ObjectKind, hash: &Hash)
    -> Result<Bytes>;

    async fn put_blob(&self, cancel: &CancellationToken, blob: &Blob) -> Result<Hash> {
        guard_cancel(cancel)?;
        let hash = blob.hash_of(self.hash_kind())?;
        self.put(cancel, ObjectKind::Blob, &hash, blob.encode()?)
            .await?;
        Ok(hash)
    }

    async fn get_blob(&self, cancel: &CancellationToken, hash: &Hash) -> Result<Blob> {
        guard_cancel(cancel)?;
        let bytes = self.get(cancel, ObjectKind::Blob, hash).await?;
        Ok(Blob::decode(&bytes)?.with_hash(hash.clone()))
    }

    async fn put_tree(&self, cancel: &CancellationToken, tree: &Tree) -> Result<Hash> {
        guard_cancel(cancel)?;
        let hash = tree.hash_of(self.hash_kind())?;
        self.put(cancel, ObjectKind::Tree, &hash, tree.encode()?)
            .await?;
        Ok(hash)
    }

    async fn get_tree(&self, cancel: &CancellationToken, hash: &Hash) -> Result<Tree> {
        guard_cancel(cancel)?;
        let bytes = self.get(cancel, ObjectKind::Tree, hash).await?;
        Tree::decode(&bytes)
    }

    /// Persist a commit and return the stored form with its address attached.
    ///
    /// An empty `hash` field is computed here; a pre-sealed commit must carry
    /// the address its content actually hashes to.
    async fn insert_commit(&self, cancel: &CancellationToken, commit: Commit) -> Result<Commit> {
        guard_cancel(cancel)?;
        let computed = commit.hash_of(self.hash_kind())?;
        if !commit.hash.is_empty() && commit.hash != computed {
            return Err(EngineError::InvalidArg(format!(
                "commit hash {} does not match its content {computed}",
                commit.hash
            )));
        }
        let sealed = Commit {
            hash: computed.clone(),
            ..commit
        };
        self.put(cancel, ObjectKind::Commit, &computed, sealed.encode()?)
            .await?;
        Ok(sealed)
    }

    async fn commit_by_hash(&self, cancel: &CancellationToken, hash: &Hash) -> Result<Commit> {
        guard_cancel(cancel)?;
        let bytes = self.get(cancel, ObjectKind::Commit, hash).await?;
        Commit::decode(&bytes)?.sealed(self.hash_kind())
    }
}
