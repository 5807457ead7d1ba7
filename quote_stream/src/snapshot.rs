//! Snapshot reconstruction from quote-change fragments.
//!
//! The stream sends a full record the first time a symbol appears and only the
//! changed fields afterwards. `SnapshotBuilder` folds fragments, strictly in
//! arrival order, into a per-session `SnapshotTable` and emits the updated
//! snapshot for every fragment it can key.

use indexmap::IndexMap;
use log::debug;
use quote_common::quote::{QuoteFragment, QuoteSnapshot};

/// Latest snapshot per symbol, in the order symbols were first seen.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    entries: IndexMap<String, QuoteSnapshot>,
}

impl SnapshotTable {
    /// Snapshot currently held for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<&QuoteSnapshot> {
        self.entries.get(symbol)
    }

    /// Number of distinct symbols seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` before the first keyed fragment.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &QuoteSnapshot> {
        self.entries.values()
    }
}

/// Stateful fragment → snapshot transform owned by one session.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    table: SnapshotTable,
}

impl SnapshotBuilder {
    /// Creates a builder with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one fragment and returns the resulting snapshot.
    ///
    /// - known symbol: supplied fields overwrite, the rest are kept;
    /// - new symbol: the fragment becomes the initial snapshot;
    /// - empty fragment, or one without a symbol: nothing to key, returns `None`.
    pub fn apply(&mut self, fragment: &QuoteFragment) -> Option<QuoteSnapshot> {
        let Some(symbol) = fragment.symbol() else {
            if !fragment.is_empty() {
                debug!("Dropping fragment without a symbol ({} fields)", fragment.len());
            }
            return None;
        };

        if let Some(existing) = self.table.entries.get_mut(symbol) {
            existing.overlay(fragment);
            return Some(existing.clone());
        }

        let snapshot = QuoteSnapshot::from_fragment(fragment)?;
        self.table
            .entries
            .insert(snapshot.symbol.clone(), snapshot.clone());
        Some(snapshot)
    }

    /// Read access to the accumulated table.
    pub fn table(&self) -> &SnapshotTable {
        &self.table
    }
}
