//! Blob object
//!
//! Immutable byte content. The canonical encoding of a blob is its content,
//! so the blob's address is the hash of the bytes themselves.

use crate::error::Result;
use crate::objects::codec::{DecodeObject, EncodeObject};
use crate::objects::hash::{Hash, HashKind};
use crate::objects::kind::ObjectKind;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    hash: Hash,
    size: u64,
    content: Bytes,
}

impl Blob {
    /// Wrap content and compute its address
    pub fn from_content(content: impl Into<Bytes>, hash_kind: HashKind) -> Result<Self> {
        let content = content.into();
        let mut blob = Blob {
            hash: Hash::empty(),
            size: content.len() as u64,
            content,
        };
        blob.hash = blob.hash_of(hash_kind)?;
        Ok(blob)
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Attach the address after decoding (the codec does not know the digest)
    pub(crate) fn with_hash(mut self, hash: Hash) -> Self {
        self.hash = hash;
        self
    }
}

impl EncodeObject for Blob {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Blob
    }

    fn encode(&self) -> Result<Bytes> {
        Ok(self.content.clone())
    }
}

impl DecodeObject for Blob {
    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Blob {
            hash: Hash::empty(),
            size: bytes.len() as u64,
            content: Bytes::copy_from_slice(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_hash_of_content() {
        let blob = Blob::from_content(&b"hi\n"[..], HashKind::Sha256).unwrap();
        assert_eq!(blob.size(), 3);
        assert_eq!(blob.hash(), &blob.hash_of(HashKind::Sha256).unwrap());
        assert_eq!(blob.hash().len(), 32);
    }

    #[test]
    fn round_trip_keeps_hash_stable() {
        let blob = Blob::from_content(&b"some content"[..], HashKind::Sha256).unwrap();
        let decoded = Blob::decode(&blob.encode().unwrap()).unwrap();
        assert_eq!(
            decoded.hash_of(HashKind::Sha256).unwrap(),
            *blob.hash(),
        );
        assert_eq!(decoded.content(), blob.content());
    }

    #[test]
    fn identical_content_yields_identical_hash() {
        let a = Blob::from_content(&b"same"[..], HashKind::Sha256).unwrap();
        let b = Blob::from_content(Bytes::from_static(b"same"), HashKind::Sha256).unwrap();
        assert_eq!(a.hash(), b.hash());
    }
}
