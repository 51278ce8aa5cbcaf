//! Content hashes
//!
//! A [`Hash`] is an opaque byte string: the content hash of an object's
//! canonical encoding. The empty hash is a sentinel meaning "absent" (no
//! parent, empty tree root, branch with no commits). Ordering is lexicographic
//! on the raw bytes; the external representation is lower-case hex with no
//! prefix.

use crate::error::{EngineError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Content address of a persistent object
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(Vec<u8>);

impl Hash {
    pub fn new(bytes: Vec<u8>) -> Self {
        Hash(bytes)
    }

    /// The "absent" sentinel
    pub fn empty() -> Self {
        Hash(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Lower-case hex with no prefix; empty string for the absent hash
    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse the external lower-case hex form
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(EngineError::InvalidArg(format!(
                "hash hex must be lower-case: {s}"
            )));
        }
        let bytes =
            hex::decode(s).map_err(|e| EngineError::InvalidArg(format!("invalid hash hex: {e}")))?;
        Ok(Hash(bytes))
    }
}

impl From<Vec<u8>> for Hash {
    fn from(bytes: Vec<u8>) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", self.hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Hash algorithm selector
///
/// The algorithm is a configuration of the codec; every digest in the
/// sha-family here produces 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashKind {
    #[default]
    Sha256,
}

/// Incremental hasher over canonical object bytes
pub struct Hasher {
    inner: HasherInner,
}

enum HasherInner {
    Sha256(Sha256),
}

impl Hasher {
    pub fn new(kind: HashKind) -> Self {
        let inner = match kind {
            HashKind::Sha256 => HasherInner::Sha256(Sha256::new()),
        };
        Hasher { inner }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match &mut self.inner {
            HasherInner::Sha256(digest) => digest.update(bytes),
        }
    }

    pub fn finalize(self) -> Hash {
        match self.inner {
            HasherInner::Sha256(digest) => Hash(digest.finalize().to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let hash = Hash::new(vec![0xab, 0x01, 0xff]);
        assert_eq!(hash.hex(), "ab01ff");
        assert_eq!(Hash::from_hex("ab01ff").unwrap(), hash);
    }

    #[test]
    fn empty_hash_is_absent_sentinel() {
        let hash = Hash::empty();
        assert!(hash.is_empty());
        assert_eq!(hash.hex(), "");
        assert_eq!(Hash::from_hex("").unwrap(), hash);
    }

    #[test]
    fn rejects_upper_case_hex() {
        assert!(Hash::from_hex("AB01").is_err());
    }

    #[test]
    fn ordering_is_lexicographic_on_bytes() {
        let a = Hash::new(vec![0x01, 0xff]);
        let b = Hash::new(vec![0x02, 0x00]);
        assert!(a < b);
        assert!(Hash::empty() < a);
    }

    #[test]
    fn sha256_digest_is_32_bytes_and_deterministic() {
        let mut first = Hasher::new(HashKind::Sha256);
        first.update(b"hello");
        let mut second = Hasher::new(HashKind::Sha256);
        second.update(b"hel");
        second.update(b"lo");

        let first = first.finalize();
        assert_eq!(first.len(), 32);
        assert_eq!(first, second.finalize());
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = Hash::new(vec![0xde, 0xad]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"dead\"");

        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);

        let absent: Hash = serde_json::from_str("\"\"").unwrap();
        assert!(absent.is_empty());
    }
}
