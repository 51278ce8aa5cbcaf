//! Tree object
//!
//! A tree is a directory snapshot: a sequence of named entries pointing at
//! blobs or sub-trees. Entries are uniquely keyed by name and kept in
//! ascending name order so that the canonical encoding, and therefore the
//! tree hash, is stable regardless of insertion order.
//!
//! ## Canonical entry layout
//!
//! `[u32 count]` then per entry:
//! `[str name][u8 kind][hash][u32 mode][u64 size]`

use crate::error::{EngineError, Result};
use crate::objects::codec::{self, DecodeObject, EncodeObject};
use crate::objects::hash::Hash;
use crate::objects::kind::ObjectKind;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Entry modes, in the classic octal convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryMode {
    Regular,
    Executable,
    Directory,
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Directory => 0o040000,
        }
    }

    pub fn from_u32(mode: u32) -> Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::Regular),
            0o100755 => Ok(EntryMode::Executable),
            0o040000 => Ok(EntryMode::Directory),
            _ => Err(EngineError::InvalidArg(format!("unknown entry mode {mode:o}"))),
        }
    }
}

/// One child of a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name, non-empty and free of `/`; empty only for the root entry
    pub name: String,
    pub kind: ObjectKind,
    pub hash: Hash,
    pub mode: u32,
    /// Content size for blobs, zero for trees
    pub size: u64,
}

impl TreeEntry {
    pub fn blob(name: impl Into<String>, hash: Hash, size: u64) -> Self {
        TreeEntry {
            name: name.into(),
            kind: ObjectKind::Blob,
            hash,
            mode: EntryMode::Regular.as_u32(),
            size,
        }
    }

    pub fn tree(name: impl Into<String>, hash: Hash) -> Self {
        TreeEntry {
            name: name.into(),
            kind: ObjectKind::Tree,
            hash,
            mode: EntryMode::Directory.as_u32(),
            size: 0,
        }
    }

    /// Synthetic entry with an empty name pointing at a tree root.
    ///
    /// An empty hash means the tree has no content yet.
    pub fn root(hash: Hash) -> Self {
        TreeEntry::tree("", hash)
    }

    pub fn is_tree(&self) -> bool {
        self.kind == ObjectKind::Tree
    }

    pub fn is_blob(&self) -> bool {
        self.kind == ObjectKind::Blob
    }
}

/// Directory snapshot with canonically ordered entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from entries in any order.
    ///
    /// Entries are sorted ascending by name; duplicate, empty, or
    /// slash-bearing names are rejected so every constructed tree is already
    /// in canonical form.
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(EngineError::AlreadyExists(format!(
                    "tree entry {}",
                    pair[0].name
                )));
            }
        }
        for entry in &entries {
            if entry.name.is_empty() || entry.name.contains('/') {
                return Err(EngineError::InvalidArg(format!(
                    "invalid tree entry name {:?}",
                    entry.name
                )));
            }
            if entry.kind == ObjectKind::Commit {
                return Err(EngineError::InvalidArg(
                    "tree entries must be blobs or trees".to_string(),
                ));
            }
        }
        Ok(Tree { entries })
    }

    pub fn empty() -> Self {
        Tree::default()
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }
}

impl EncodeObject for Tree {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Tree
    }

    fn encode(&self) -> Result<Bytes> {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(self.entries.len() as u32)
            .map_err(anyhow::Error::from)?;
        for entry in &self.entries {
            codec::write_str(&mut out, &entry.name)?;
            out.write_u8(entry.kind.as_u8()).map_err(anyhow::Error::from)?;
            codec::write_hash(&mut out, &entry.hash)?;
            out.write_u32::<LittleEndian>(entry.mode)
                .map_err(anyhow::Error::from)?;
            out.write_u64::<LittleEndian>(entry.size)
                .map_err(anyhow::Error::from)?;
        }
        Ok(Bytes::from(out))
    }
}

impl DecodeObject for Tree {
    fn decode(bytes: &[u8]) -> Result<Self> {
        const KIND: ObjectKind = ObjectKind::Tree;
        let mut reader = Cursor::new(bytes);
        let count = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| EngineError::malformed(KIND, "truncated entry count"))?;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = codec::read_str(&mut reader, KIND)?;
            let tag = reader
                .read_u8()
                .map_err(|_| EngineError::malformed(KIND, "truncated entry kind"))?;
            let kind = ObjectKind::from_u8(tag)
                .map_err(|_| EngineError::malformed(KIND, format!("bad entry kind tag {tag}")))?;
            let hash = codec::read_hash(&mut reader, KIND)?;
            let mode = reader
                .read_u32::<LittleEndian>()
                .map_err(|_| EngineError::malformed(KIND, "truncated entry mode"))?;
            let size = reader
                .read_u64::<LittleEndian>()
                .map_err(|_| EngineError::malformed(KIND, "truncated entry size"))?;
            entries.push(TreeEntry {
                name,
                kind,
                hash,
                mode,
                size,
            });
        }
        codec::expect_end(&mut reader, KIND)?;

        // Stored trees must already be canonical; a violation means the bytes
        // were not produced by this codec.
        for pair in entries.windows(2) {
            if pair[0].name >= pair[1].name {
                return Err(EngineError::malformed(KIND, "entries out of canonical order"));
            }
        }
        Tree::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::hash::HashKind;

    fn entry(name: &str, seed: u8) -> TreeEntry {
        TreeEntry::blob(name, Hash::new(vec![seed; 32]), seed as u64)
    }

    #[test]
    fn insertion_order_does_not_change_the_hash() {
        let forward = Tree::new(vec![entry("a.txt", 1), entry("b.txt", 2), entry("zz", 3)]).unwrap();
        let shuffled = Tree::new(vec![entry("zz", 3), entry("a.txt", 1), entry("b.txt", 2)]).unwrap();

        assert_eq!(
            forward.hash_of(HashKind::Sha256).unwrap(),
            shuffled.hash_of(HashKind::Sha256).unwrap()
        );
        assert_eq!(
            forward.entries().iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["a.txt", "b.txt", "zz"]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = Tree::new(vec![entry("same", 1), entry("same", 2)]);
        assert!(matches!(result, Err(EngineError::AlreadyExists(_))));
    }

    #[test]
    fn round_trip_stability() {
        let tree = Tree::new(vec![
            entry("readme.md", 9),
            TreeEntry::tree("src", Hash::new(vec![7; 32])),
        ])
        .unwrap();

        let decoded = Tree::decode(&tree.encode().unwrap()).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(
            decoded.hash_of(HashKind::Sha256).unwrap(),
            tree.hash_of(HashKind::Sha256).unwrap()
        );
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let tree = Tree::new(vec![entry("a", 1)]).unwrap();
        let mut bytes = tree.encode().unwrap().to_vec();
        bytes.push(0);
        assert!(matches!(
            Tree::decode(&bytes),
            Err(EngineError::MalformedObject { .. })
        ));
    }

    #[test]
    fn decode_rejects_out_of_order_entries() {
        // Hand-build bytes with entries reversed.
        let tree_b = Tree::new(vec![entry("b", 2)]).unwrap();
        let tree_a = Tree::new(vec![entry("a", 1)]).unwrap();
        let mut bytes = vec![2, 0, 0, 0];
        bytes.extend_from_slice(&tree_b.encode().unwrap()[4..]);
        bytes.extend_from_slice(&tree_a.encode().unwrap()[4..]);
        assert!(matches!(
            Tree::decode(&bytes),
            Err(EngineError::MalformedObject { .. })
        ));
    }

    #[test]
    fn empty_tree_encodes_and_hashes() {
        let tree = Tree::empty();
        let hash = tree.hash_of(HashKind::Sha256).unwrap();
        assert_eq!(hash.len(), 32);
        assert_eq!(Tree::decode(&tree.encode().unwrap()).unwrap(), tree);
    }

    #[test]
    fn entry_lookup_uses_binary_search() {
        let tree = Tree::new(vec![entry("a", 1), entry("m", 2), entry("z", 3)]).unwrap();
        assert_eq!(tree.entry("m").map(|e| e.size), Some(2));
        assert!(tree.entry("q").is_none());
    }
}
