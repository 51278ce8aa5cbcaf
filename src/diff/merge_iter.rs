//! Merging two change streams
//!
//! Given `base→ours` and `base→theirs` diffs, walk both in path order and
//! reconcile each path into a single change. Paths touched on one side pass
//! through; paths with the same outcome on both sides collapse to one; paths
//! with diverging outcomes go to the injected [`ResolveConflict`] policy.
//!
//! The resolver is the only injected policy in the engine. Declining a
//! conflict does not stop the walk: every conflicting path is collected so
//! the caller can report the full set at once.

use crate::diff::changes::{Change, Changes};
use crate::error::{EngineError, Result};
use std::cmp::Ordering;

/// Conflict arbitration between two changes at the same path.
///
/// Return the change to keep, or `None` to decline; declining makes the
/// merge fail with `UnresolvedConflict` listing every declined path.
pub trait ResolveConflict: Send + Sync {
    fn resolve(&self, ours: &Change, theirs: &Change) -> Option<Change>;
}

impl<F> ResolveConflict for F
where
    F: Fn(&Change, &Change) -> Option<Change> + Send + Sync,
{
    fn resolve(&self, ours: &Change, theirs: &Change) -> Option<Change> {
        self(ours, theirs)
    }
}

/// Always keep our side
pub struct PickOurs;

impl ResolveConflict for PickOurs {
    fn resolve(&self, ours: &Change, _theirs: &Change) -> Option<Change> {
        Some(ours.clone())
    }
}

/// Always keep their side
pub struct PickTheirs;

impl ResolveConflict for PickTheirs {
    fn resolve(&self, _ours: &Change, theirs: &Change) -> Option<Change> {
        Some(theirs.clone())
    }
}

/// Decline every conflict
pub struct RejectAll;

impl ResolveConflict for RejectAll {
    fn resolve(&self, _ours: &Change, _theirs: &Change) -> Option<Change> {
        None
    }
}

/// One reconciled position of the merge walk
#[derive(Debug, Clone)]
pub enum Merged {
    Change(Change),
    Conflict { ours: Change, theirs: Change },
}

/// Synchronized walk over two path-ordered change streams
pub struct MergeIter<'r> {
    ours: Vec<Change>,
    theirs: Vec<Change>,
    i: usize,
    j: usize,
    resolver: &'r dyn ResolveConflict,
}

impl<'r> MergeIter<'r> {
    pub fn new(base_diff: Changes, merge_diff: Changes, resolver: &'r dyn ResolveConflict) -> Self {
        MergeIter {
            ours: base_diff.into_vec(),
            theirs: merge_diff.into_vec(),
            i: 0,
            j: 0,
            resolver,
        }
    }

    pub fn has(&self) -> bool {
        self.i < self.ours.len() || self.j < self.theirs.len()
    }

    pub fn next(&mut self) -> Option<Merged> {
        let order = match (self.ours.get(self.i), self.theirs.get(self.j)) {
            (Some(ours), Some(theirs)) => ours.path.cmp(&theirs.path),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => return None,
        };

        match order {
            Ordering::Less => {
                let change = self.ours[self.i].clone();
                self.i += 1;
                Some(Merged::Change(change))
            }
            Ordering::Greater => {
                let change = self.theirs[self.j].clone();
                self.j += 1;
                Some(Merged::Change(change))
            }
            Ordering::Equal => {
                let ours = self.ours[self.i].clone();
                let theirs = self.theirs[self.j].clone();
                self.i += 1;
                self.j += 1;

                // Both diffs start from the same base, so the `from` sides
                // already agree; equal outcomes collapse to our copy.
                if ours.to_hash() == theirs.to_hash() {
                    return Some(Merged::Change(ours));
                }
                match self.resolver.resolve(&ours, &theirs) {
                    Some(change) => Some(Merged::Change(change)),
                    None => Some(Merged::Conflict { ours, theirs }),
                }
            }
        }
    }

    /// Drain the walk into a single reconciled stream.
    ///
    /// Fails with `UnresolvedConflict` carrying *all* declined paths, never
    /// just the first.
    pub fn reconcile(mut self) -> Result<Changes> {
        let mut merged = Vec::new();
        let mut conflicts = Vec::new();
        while let Some(step) = self.next() {
            match step {
                Merged::Change(change) => merged.push(change),
                Merged::Conflict { ours, .. } => conflicts.push(ours.path.clone()),
            }
        }
        if !conflicts.is_empty() {
            return Err(EngineError::UnresolvedConflict { paths: conflicts });
        }
        Ok(Changes::new(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::hash::Hash;
    use crate::objects::tree::TreeEntry;

    fn entry(name: &str, seed: u8) -> TreeEntry {
        TreeEntry::blob(name, Hash::new(vec![seed; 32]), 1)
    }

    fn ours_only() -> Changes {
        Changes::new(vec![
            Change::add("a.txt", entry("a.txt", 1)),
            Change::modify("shared.txt", entry("shared.txt", 9), entry("shared.txt", 2)),
        ])
    }

    fn theirs_only() -> Changes {
        Changes::new(vec![
            Change::add("b.txt", entry("b.txt", 3)),
            Change::modify("shared.txt", entry("shared.txt", 9), entry("shared.txt", 4)),
        ])
    }

    #[test]
    fn disjoint_paths_pass_through_in_order() {
        let base = Changes::new(vec![Change::add("a.txt", entry("a.txt", 1))]);
        let merge = Changes::new(vec![Change::add("b.txt", entry("b.txt", 2))]);
        let merged = MergeIter::new(base, merge, &RejectAll).reconcile().unwrap();
        assert_eq!(merged.paths(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn identical_outcomes_collapse_without_the_resolver() {
        let base = Changes::new(vec![Change::add("same.txt", entry("same.txt", 5))]);
        let merge = Changes::new(vec![Change::add("same.txt", entry("same.txt", 5))]);
        // RejectAll would fail the merge if the resolver were consulted.
        let merged = MergeIter::new(base, merge, &RejectAll).reconcile().unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn both_removals_collapse() {
        let base = Changes::new(vec![Change::remove("gone.txt", entry("gone.txt", 5))]);
        let merge = Changes::new(vec![Change::remove("gone.txt", entry("gone.txt", 5))]);
        let merged = MergeIter::new(base, merge, &RejectAll).reconcile().unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged.iter().next().unwrap().to.is_none());
    }

    #[test]
    fn resolver_picks_a_side() {
        let merged = MergeIter::new(ours_only(), theirs_only(), &PickTheirs)
            .reconcile()
            .unwrap();
        assert_eq!(merged.paths(), vec!["a.txt", "b.txt", "shared.txt"]);
        let shared = merged.iter().find(|c| c.path == "shared.txt").unwrap();
        assert_eq!(shared.to.as_ref().unwrap().hash, Hash::new(vec![4; 32]));
    }

    #[test]
    fn declined_conflicts_collect_every_path() {
        let base = Changes::new(vec![
            Change::modify("x.txt", entry("x.txt", 9), entry("x.txt", 1)),
            Change::modify("y.txt", entry("y.txt", 9), entry("y.txt", 2)),
            Change::add("ours.txt", entry("ours.txt", 7)),
        ]);
        let merge = Changes::new(vec![
            Change::modify("x.txt", entry("x.txt", 9), entry("x.txt", 3)),
            Change::modify("y.txt", entry("y.txt", 9), entry("y.txt", 4)),
        ]);

        let result = MergeIter::new(base, merge, &RejectAll).reconcile();
        match result {
            Err(EngineError::UnresolvedConflict { paths }) => {
                assert_eq!(paths, vec!["x.txt".to_string(), "y.txt".to_string()]);
            }
            other => panic!("expected UnresolvedConflict, got {other:?}"),
        }
    }

    #[test]
    fn closure_resolvers_are_accepted() {
        let keep_ours = |ours: &Change, _: &Change| Some(ours.clone());
        let merged = MergeIter::new(ours_only(), theirs_only(), &keep_ours)
            .reconcile()
            .unwrap();
        let shared = merged.iter().find(|c| c.path == "shared.txt").unwrap();
        assert_eq!(shared.to.as_ref().unwrap().hash, Hash::new(vec![2; 32]));
    }
}
