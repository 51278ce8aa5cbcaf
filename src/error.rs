//! Engine error taxonomy
//!
//! Every fallible operation in the crate returns [`EngineError`]. Variants are
//! tagged so that callers dispatch on kind instead of matching message text;
//! adapter failures that fit no other kind are folded into `Internal`.

use crate::objects::hash::Hash;
use crate::objects::kind::ObjectKind;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result alias used across the crate
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Error kinds surfaced by the version engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// An object hash was dereferenced but the store has no bytes for it
    #[error("object {0} not found")]
    ObjectNotFound(Hash),

    /// A branch was looked up by name and does not exist in the repository
    #[error("branch {0} not found")]
    BranchNotFound(String),

    /// A work-in-progress record is missing
    #[error("wip {0} not found")]
    WipNotFound(String),

    /// A user record is missing
    #[error("user {0} not found")]
    UserNotFound(String),

    /// A path does not resolve inside the tree being walked
    #[error("path {0} not found")]
    PathNotFound(String),

    /// Branch name or tree path collision
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Malformed or unsafe path (empty segment, leading/trailing slash, `.` or `..`)
    #[error("invalid path {path}: {reason}")]
    PathInvalid { path: String, reason: String },

    /// Tried to descend into (or list) an entry that is a blob
    #[error("{0} is not a tree")]
    NotATree(String),

    /// Tried to replace an entry that is a tree with blob semantics
    #[error("{0} is not a blob")]
    NotABlob(String),

    /// Stored bytes do not decode as the requested object kind
    #[error("malformed {} object: {reason}", kind.as_str())]
    MalformedObject { kind: ObjectKind, reason: String },

    /// Compare-and-set on a branch head observed a different commit
    #[error("stale branch {branch}: expected head {expected}, found {actual}")]
    StaleBranch {
        branch: String,
        expected: Hash,
        actual: Hash,
    },

    /// Three-way merge found no merge base between the two commits
    #[error("no common ancestor between {ours} and {theirs}")]
    NoCommonAncestor { ours: Hash, theirs: Hash },

    /// The conflict resolver declined; carries every conflicting path
    #[error("unresolved merge conflicts: {}", paths.join(", "))]
    UnresolvedConflict { paths: Vec<String> },

    /// The operation observed its cancellation signal at an I/O boundary
    #[error("operation canceled")]
    Canceled,

    /// Caller-supplied argument is invalid (branch name, ref spec, diff range)
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Adapter failure that fits no other kind
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub(crate) fn path_invalid(path: &str, reason: &str) -> Self {
        EngineError::PathInvalid {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(kind: ObjectKind, reason: impl Into<String>) -> Self {
        EngineError::MalformedObject {
            kind,
            reason: reason.into(),
        }
    }
}

/// Observe the cancellation signal at a suspension boundary.
///
/// Cheap enough to call before every store round-trip; partial object writes
/// left behind by a canceled operation are content-addressed and harmless.
pub(crate) fn guard_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Canceled);
    }
    Ok(())
}
