//! Branch row and branch-name validation
//!
//! A branch is a named mutable pointer to a commit, unique per
//! `(repository_id, name)`. The head moves only through compare-and-set
//! updates against the observed commit hash.

use crate::error::{EngineError, Result};
use crate::objects::hash::Hash;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

/// Reserved ref name that always resolves to the repository's default branch
pub const HEAD_NAME: &str = "HEAD";

const MAX_BRANCH_NAME_LEN: usize = 40;

static BRANCH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*(/[a-z0-9][a-z0-9_-]*)?$").expect("branch name pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub repository_id: Uuid,
    pub name: String,
    /// Commit the branch points at; empty for a branch with no commits yet
    pub commit_hash: Hash,
    pub creator_id: Uuid,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(
        repository_id: Uuid,
        name: impl Into<String>,
        commit_hash: Hash,
        creator_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Branch {
            id: Uuid::new_v4(),
            repository_id,
            name: name.into(),
            commit_hash,
            creator_id,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validate a branch name at creation time.
///
/// Names are lower-case alphanumeric segments (with `_` and `-`), at most one
/// `/`, at most 40 characters, and never the reserved literal `HEAD`. The
/// length cap also keeps branch names shorter than a hex commit hash, so tip
/// references stay unambiguous.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EngineError::InvalidArg("branch name is empty".to_string()));
    }
    if name.len() > MAX_BRANCH_NAME_LEN {
        return Err(EngineError::InvalidArg(format!(
            "branch name {name:?} exceeds {MAX_BRANCH_NAME_LEN} characters"
        )));
    }
    if name == HEAD_NAME {
        return Err(EngineError::InvalidArg(
            "branch name HEAD is reserved".to_string(),
        ));
    }
    if !BRANCH_NAME_RE.is_match(name) {
        return Err(EngineError::InvalidArg(format!(
            "branch name {name:?} is not a valid ref name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("main")]
    #[case("feat/wip_test")]
    #[case("release-1")]
    #[case("a")]
    fn accepts_valid_names(#[case] name: &str) {
        assert!(validate_branch_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("HEAD")]
    #[case("Feature")]
    #[case("feat//double")]
    #[case("/lead")]
    #[case("trail/")]
    #[case("a/b/c")]
    #[case("spa ce")]
    #[case("this-branch-name-is-way-too-long-to-be-accepted")]
    fn rejects_invalid_names(#[case] name: &str) {
        assert!(matches!(
            validate_branch_name(name),
            Err(EngineError::InvalidArg(_))
        ));
    }
}
