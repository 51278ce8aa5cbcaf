//! Persistent object kinds

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Kind tag for every persistent, content-addressed object
///
/// The kind travels out-of-band: the store keys bytes by `(kind, hash)` and
/// the codec is told which kind to decode. Canonical encodings never embed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ObjectKind::Blob => 1,
            ObjectKind::Tree => 2,
            ObjectKind::Commit => 3,
        }
    }

    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ObjectKind::Blob),
            2 => Ok(ObjectKind::Tree),
            3 => Ok(ObjectKind::Commit),
            _ => Err(EngineError::InvalidArg(format!(
                "unknown object kind tag {tag}"
            ))),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
