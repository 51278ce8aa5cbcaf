//! Diff and change streams
//!
//! Path-ordered changes between two trees, and the synchronized merge of two
//! change streams with injected conflict arbitration.

pub mod changes;
pub mod merge_iter;
pub mod tree_diff;

pub use changes::{Change, ChangeAction, Changes};
pub use merge_iter::{MergeIter, Merged, PickOurs, PickTheirs, RejectAll, ResolveConflict};
pub use tree_diff::TreeDiff;
