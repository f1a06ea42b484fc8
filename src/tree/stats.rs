use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;

/// Snapshot of tree statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeStatsSnapshot {
    /// Number of leaf nodes searched
    pub leaf_searches: u64,
    /// Number of interior nodes searched
    pub internal_searches: u64,
    /// Number of leaf splits performed
    pub leaf_splits: u64,
    /// Number of interior node splits performed
    pub internal_splits: u64,
    /// Number of times a full root was pushed under a fresh root
    pub root_demotions: u64,
    /// Number of single items moved from a sibling during deletion
    pub borrows: u64,
    /// Number of leaf merges performed
    pub leaf_merges: u64,
    /// Number of interior node merges performed
    pub internal_merges: u64,
    /// Number of times the root absorbed its single remaining kid
    pub root_collapses: u64,
}

/// Statistics counters for tree maintenance.
#[derive(Default, Debug)]
pub struct TreeStats {
    leaf_searches: AtomicU64,
    internal_searches: AtomicU64,
    leaf_splits: AtomicU64,
    internal_splits: AtomicU64,
    root_demotions: AtomicU64,
    borrows: AtomicU64,
    leaf_merges: AtomicU64,
    internal_merges: AtomicU64,
    root_collapses: AtomicU64,
}

impl TreeStats {
    /// Returns the current count of leaf searches.
    pub fn leaf_searches(&self) -> u64 {
        self.leaf_searches.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of interior node searches.
    pub fn internal_searches(&self) -> u64 {
        self.internal_searches.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of leaf splits.
    pub fn leaf_splits(&self) -> u64 {
        self.leaf_splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of interior node splits.
    pub fn internal_splits(&self) -> u64 {
        self.internal_splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of root demotions.
    pub fn root_demotions(&self) -> u64 {
        self.root_demotions.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of sibling borrows.
    pub fn borrows(&self) -> u64 {
        self.borrows.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of leaf merges.
    pub fn leaf_merges(&self) -> u64 {
        self.leaf_merges.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of interior node merges.
    pub fn internal_merges(&self) -> u64 {
        self.internal_merges.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of root collapses.
    pub fn root_collapses(&self) -> u64 {
        self.root_collapses.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn inc_leaf_searches(&self) {
        self.leaf_searches.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_internal_searches(&self) {
        self.internal_searches.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_splits(&self, leaf: bool) {
        let counter = if leaf {
            &self.leaf_splits
        } else {
            &self.internal_splits
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_root_demotions(&self) {
        self.root_demotions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_borrows(&self) {
        self.borrows.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_merges(&self, leaf: bool) {
        let counter = if leaf {
            &self.leaf_merges
        } else {
            &self.internal_merges
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_root_collapses(&self) {
        self.root_collapses.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> TreeStatsSnapshot {
        TreeStatsSnapshot {
            leaf_searches: self.leaf_searches(),
            internal_searches: self.internal_searches(),
            leaf_splits: self.leaf_splits(),
            internal_splits: self.internal_splits(),
            root_demotions: self.root_demotions(),
            borrows: self.borrows(),
            leaf_merges: self.leaf_merges(),
            internal_merges: self.internal_merges(),
            root_collapses: self.root_collapses(),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "doctree::stats",
            leaf_searches = snapshot.leaf_searches,
            internal_searches = snapshot.internal_searches,
            leaf_splits = snapshot.leaf_splits,
            internal_splits = snapshot.internal_splits,
            root_demotions = snapshot.root_demotions,
            borrows = snapshot.borrows,
            leaf_merges = snapshot.leaf_merges,
            internal_merges = snapshot.internal_merges,
            root_collapses = snapshot.root_collapses,
            "tree stats snapshot"
        );
    }
}
