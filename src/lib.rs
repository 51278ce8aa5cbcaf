//! grove: a server-side versioned storage engine
//!
//! Git-like version management for repositories of files: content-addressed
//! blobs, trees and commits, per-branch staging areas, path-ordered diffs,
//! and three-way merge with pluggable conflict resolution.
//!
//! The engine is stateless between calls. Durable state lives behind the
//! [`store`] traits (a content-addressed object store plus branch/WIP/user
//! adapters); every operation takes its inputs, talks to the stores, and
//! returns. Branch heads only move through compare-and-set, and objects are
//! always written before anything that references them is published.
//!
//! Entry points:
//! - [`repo::WorkRepo`]: branches, staging areas, commit and merge publish
//! - [`repo::CommitOp`]: commit append, diff and the three-way merge driver
//! - [`worktree::WorkTree`]: path-addressed mutation of a tree snapshot
//! - [`diff::TreeDiff`] and [`diff::MergeIter`]: change streams and their
//!   reconciliation

pub mod diff;
pub mod error;
pub mod merge;
pub mod models;
pub mod objects;
pub mod repo;
pub mod store;
pub mod worktree;

pub use diff::{Change, ChangeAction, Changes, MergeIter, ResolveConflict, TreeDiff};
pub use error::{EngineError, Result};
pub use merge::CommitNode;
pub use objects::{Blob, Commit, Hash, HashKind, ObjectKind, Signature, Tree, TreeEntry};
pub use repo::{CommitOp, RefSpec, WorkRepo};
pub use worktree::WorkTree;
