//! Commit object
//!
//! A commit is a snapshot: a tree hash, ordered parent hashes (zero for a
//! root commit, one for a normal commit, two for a merge), author/committer
//! signatures and a message. The commit's address is the hash of its
//! canonical encoding, which covers every field except the hash itself.

use crate::error::{EngineError, Result};
use crate::objects::codec::{self, DecodeObject, EncodeObject};
use crate::objects::hash::{Hash, HashKind};
use crate::objects::kind::ObjectKind;
use byteorder::{ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// Author or committer identity with the time of the action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<Utc>) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        codec::write_str(out, &self.name)?;
        codec::write_str(out, &self.email)?;
        codec::write_millis(out, &self.when)
    }

    fn read_from(reader: &mut impl Read) -> Result<Self> {
        const KIND: ObjectKind = ObjectKind::Commit;
        Ok(Signature {
            name: codec::read_str(reader, KIND)?,
            email: codec::read_str(reader, KIND)?,
            when: codec::read_millis(reader, KIND)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Content address; empty until computed over the remaining fields
    pub hash: Hash,
    pub author: Signature,
    pub committer: Signature,
    pub merge_tag: String,
    pub message: String,
    pub tree_hash: Hash,
    /// Ordered parents: `[]` root, `[h]` normal, `[ours, theirs]` merge
    pub parent_hashes: Vec<Hash>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commit {
    pub fn parent(&self) -> Option<&Hash> {
        self.parent_hashes.first()
    }

    pub fn is_root(&self) -> bool {
        self.parent_hashes.is_empty()
    }

    /// First line of the message, for compact display
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Compute and attach the content address
    pub fn sealed(mut self, hash_kind: HashKind) -> Result<Self> {
        self.hash = self.hash_of(hash_kind)?;
        Ok(self)
    }
}

impl EncodeObject for Commit {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }

    fn encode(&self) -> Result<Bytes> {
        let mut out = Vec::new();
        self.author.write_to(&mut out)?;
        self.committer.write_to(&mut out)?;
        codec::write_str(&mut out, &self.merge_tag)?;
        codec::write_str(&mut out, &self.message)?;
        codec::write_hash(&mut out, &self.tree_hash)?;
        out.write_u8(self.parent_hashes.len() as u8)
            .map_err(anyhow::Error::from)?;
        for parent in &self.parent_hashes {
            codec::write_hash(&mut out, parent)?;
        }
        codec::write_millis(&mut out, &self.created_at)?;
        codec::write_millis(&mut out, &self.updated_at)?;
        Ok(Bytes::from(out))
    }
}

impl DecodeObject for Commit {
    fn decode(bytes: &[u8]) -> Result<Self> {
        const KIND: ObjectKind = ObjectKind::Commit;
        let mut reader = Cursor::new(bytes);

        let author = Signature::read_from(&mut reader)?;
        let committer = Signature::read_from(&mut reader)?;
        let merge_tag = codec::read_str(&mut reader, KIND)?;
        let message = codec::read_str(&mut reader, KIND)?;
        let tree_hash = codec::read_hash(&mut reader, KIND)?;
        let parent_count = reader
            .read_u8()
            .map_err(|_| EngineError::malformed(KIND, "truncated parent count"))?;
        let mut parent_hashes = Vec::with_capacity(parent_count as usize);
        for _ in 0..parent_count {
            parent_hashes.push(codec::read_hash(&mut reader, KIND)?);
        }
        let created_at = codec::read_millis(&mut reader, KIND)?;
        let updated_at = codec::read_millis(&mut reader, KIND)?;
        codec::expect_end(&mut reader, KIND)?;

        Ok(Commit {
            hash: Hash::empty(),
            author,
            committer,
            merge_tag,
            message,
            tree_hash,
            parent_hashes,
            created_at,
            updated_at,
        })
    }
}
