//! Content-addressed object model and codec
//!
//! Blobs, trees and commits, each with one canonical byte encoding and one
//! content hash. See [`codec`] for the determinism rules.

pub mod blob;
pub mod codec;
pub mod commit;
pub mod hash;
pub mod kind;
pub mod tree;

pub use blob::Blob;
pub use codec::{DecodeObject, EncodeObject};
pub use commit::{Commit, Signature};
pub use hash::{Hash, HashKind, Hasher};
pub use kind::ObjectKind;
pub use tree::{EntryMode, Tree, TreeEntry};
