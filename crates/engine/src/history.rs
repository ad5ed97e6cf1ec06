//! Snapshot-based undo/redo history manager.
//!
//! - Undo/redo stacks of [`TimelineSnapshot`]s, each tagged with the label
//!   of the command that produced it
//! - Batch grouping to collapse a drag gesture into one undo step
//! - Configurable maximum depth; the oldest entries are dropped first
//!
//! # Usage
//!
//! ```ignore
//! let mut history = HistoryManager::new(100);
//!
//! // Before a command, capture the current state
//! history.push("Move clip", TimelineSnapshot::capture(&state, &comps));
//!
//! // Undo hands back the snapshot to restore and keeps `current` for redo
//! if let Some(prev) = history.undo(TimelineSnapshot::capture(&state, &comps)) {
//!     prev.restore(&mut state, &mut comps);
//! }
//! ```

use std::time::Instant;

use crate::snapshot::TimelineSnapshot;

/// A single entry in the undo/redo history.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Label of the command, e.g. "Trim item" or "Add transition".
    pub label: String,
    pub snapshot: TimelineSnapshot,
    pub timestamp: Instant,
}

/// Two stacks of snapshots.
///
/// Pushing a new entry clears the redo stack. While a batch is open,
/// individual pushes are suppressed and the batch produces at most one entry
/// when it ends.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
    batch_label: Option<String>,
    /// State before the batch began.
    batch_start_snapshot: Option<TimelineSnapshot>,
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
            batch_label: None,
            batch_start_snapshot: None,
        }
    }

    /// Record the state *before* a command.
    pub fn push(&mut self, label: &str, snapshot: TimelineSnapshot) {
        if self.batch_label.is_some() {
            tracing::debug!(label, "Push suppressed: batch in progress");
            return;
        }

        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry {
            label: label.to_string(),
            snapshot,
            timestamp: Instant::now(),
        });
        self.enforce_limit();

        tracing::debug!(
            label,
            undo_depth = self.undo_stack.len(),
            "History entry pushed"
        );
    }

    /// Pop the last entry. `current` is kept on the redo stack under the same
    /// label; the returned snapshot is what the caller restores.
    pub fn undo(&mut self, current: TimelineSnapshot) -> Option<TimelineSnapshot> {
        self.end_stuck_batch("undo");
        let entry = self.undo_stack.pop()?;
        tracing::debug!(
            label = %entry.label,
            undo_remaining = self.undo_stack.len(),
            "Undo"
        );
        self.redo_stack.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
            timestamp: Instant::now(),
        });
        Some(entry.snapshot)
    }

    /// Symmetric to [`undo`](Self::undo).
    pub fn redo(&mut self, current: TimelineSnapshot) -> Option<TimelineSnapshot> {
        self.end_stuck_batch("redo");
        let entry = self.redo_stack.pop()?;
        tracing::debug!(
            label = %entry.label,
            redo_remaining = self.redo_stack.len(),
            "Redo"
        );
        self.undo_stack.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
            timestamp: Instant::now(),
        });
        self.enforce_limit();
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Open a batch. Nested starts are ignored.
    pub fn start_batch(&mut self, label: &str, before_snapshot: TimelineSnapshot) {
        if self.batch_label.is_some() {
            tracing::warn!(label, "start_batch called while already batching, ignoring");
            return;
        }
        self.batch_label = Some(label.to_string());
        self.batch_start_snapshot = Some(before_snapshot);
        tracing::debug!(label, "Batch started");
    }

    /// Close the batch. Pushes one entry if the state changed since
    /// `start_batch`; returns whether an entry was recorded.
    pub fn end_batch(&mut self, current: &TimelineSnapshot) -> bool {
        let Some(label) = self.batch_label.take() else {
            return false;
        };
        let Some(start_snapshot) = self.batch_start_snapshot.take() else {
            return false;
        };
        if start_snapshot == *current {
            tracing::debug!(label = %label, "Batch ended without changes");
            return false;
        }
        self.push(&label, start_snapshot);
        true
    }

    pub fn is_batching(&self) -> bool {
        self.batch_label.is_some()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_label = None;
        self.batch_start_snapshot = None;
        tracing::debug!("History cleared");
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Set the maximum depth, trimming the oldest entries if needed.
    pub fn set_max_entries(&mut self, max: usize) {
        self.max_entries = max;
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.undo_stack.len() > self.max_entries {
            let excess = self.undo_stack.len() - self.max_entries;
            self.undo_stack.drain(..excess);
        }
    }

    // Lost mouseups leave batches open; undo/redo close them.
    fn end_stuck_batch(&mut self, during: &str) {
        if self.batch_label.is_some() {
            tracing::warn!(during, "Ending stuck batch");
            self.batch_label = None;
            self.batch_start_snapshot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{CompositionStore, TimelineItem, TimelineState};

    fn make_snapshot(tag: &str) -> TimelineSnapshot {
        let mut state = TimelineState::new();
        let _ = state.items.add_item(TimelineItem::text(tag, "t1", 0, 30, tag));
        TimelineSnapshot::capture(&state, &CompositionStore::new())
    }

    fn tag_of(snapshot: &TimelineSnapshot) -> &str {
        &snapshot.state.items.items()[0].id
    }

    #[test]
    fn new_history_is_empty() {
        let h = HistoryManager::new(10);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.undo_count(), 0);
        assert_eq!(h.max_entries(), 10);
        assert!(!h.is_batching());
    }

    #[test]
    fn push_and_undo() {
        let mut h = HistoryManager::new(10);
        h.push("Action 1", make_snapshot("s1"));
        h.push("Action 2", make_snapshot("s2"));
        assert_eq!(h.undo_count(), 2);

        let restored = h.undo(make_snapshot("now")).unwrap();
        assert_eq!(tag_of(&restored), "s2");
        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.redo_count(), 1);
        assert_eq!(h.redo_label(), Some("Action 2"));
    }

    #[test]
    fn undo_empty_returns_none() {
        let mut h = HistoryManager::new(10);
        assert!(h.undo(make_snapshot("now")).is_none());
        assert!(h.redo(make_snapshot("now")).is_none());
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn redo_returns_state_saved_by_undo() {
        let mut h = HistoryManager::new(10);
        h.push("Trim", make_snapshot("before"));
        let before = h.undo(make_snapshot("after")).unwrap();
        assert_eq!(tag_of(&before), "before");

        let after = h.redo(make_snapshot("before")).unwrap();
        assert_eq!(tag_of(&after), "after");
        assert_eq!(h.undo_label(), Some("Trim"));
        assert!(!h.can_redo());
    }

    #[test]
    fn push_clears_redo_stack() {
        let mut h = HistoryManager::new(10);
        h.push("A", make_snapshot("s1"));
        h.undo(make_snapshot("s2"));
        assert!(h.can_redo());
        h.push("B", make_snapshot("s3"));
        assert!(!h.can_redo());
    }

    #[test]
    fn max_entries_enforced() {
        let mut h = HistoryManager::new(3);
        for i in 0..5 {
            h.push(&format!("Action {i}"), make_snapshot(&format!("s{i}")));
        }
        assert_eq!(h.undo_count(), 3);
        let oldest_kept = {
            h.undo(make_snapshot("x"));
            h.undo(make_snapshot("x"));
            h.undo(make_snapshot("x")).unwrap()
        };
        assert_eq!(tag_of(&oldest_kept), "s2");
    }

    #[test]
    fn set_max_entries_trims() {
        let mut h = HistoryManager::new(10);
        for i in 0..5 {
            h.push(&format!("Action {i}"), make_snapshot(&format!("s{i}")));
        }
        h.set_max_entries(2);
        assert_eq!(h.undo_count(), 2);
        assert_eq!(h.undo_label(), Some("Action 4"));
    }

    #[test]
    fn batch_suppresses_pushes() {
        let mut h = HistoryManager::new(10);
        h.start_batch("Drag", make_snapshot("start"));
        h.push("step 1", make_snapshot("a"));
        h.push("step 2", make_snapshot("b"));
        assert_eq!(h.undo_count(), 0);

        assert!(h.end_batch(&make_snapshot("end")));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.undo_label(), Some("Drag"));
        let restored = h.undo(make_snapshot("end")).unwrap();
        assert_eq!(tag_of(&restored), "start");
    }

    #[test]
    fn unchanged_batch_records_nothing() {
        let mut h = HistoryManager::new(10);
        let snap = make_snapshot("same");
        h.start_batch("Drag", snap.clone());
        assert!(!h.end_batch(&snap));
        assert_eq!(h.undo_count(), 0);
        assert!(!h.is_batching());
    }

    #[test]
    fn end_batch_without_start_is_noop() {
        let mut h = HistoryManager::new(10);
        assert!(!h.end_batch(&make_snapshot("x")));
        assert_eq!(h.undo_count(), 0);
    }

    #[test]
    fn double_start_batch_ignored() {
        let mut h = HistoryManager::new(10);
        h.start_batch("First", make_snapshot("s1"));
        h.start_batch("Second", make_snapshot("s2"));
        h.end_batch(&make_snapshot("s3"));
        assert_eq!(h.undo_label(), Some("First"));
    }

    #[test]
    fn undo_ends_stuck_batch() {
        let mut h = HistoryManager::new(10);
        h.push("A", make_snapshot("s1"));
        h.start_batch("Stuck", make_snapshot("s2"));
        assert!(h.undo(make_snapshot("s3")).is_some());
        assert!(!h.is_batching());
    }

    #[test]
    fn clear_resets_everything() {
        let mut h = HistoryManager::new(10);
        h.push("A", make_snapshot("s1"));
        h.undo(make_snapshot("s2"));
        h.start_batch("B", make_snapshot("s3"));
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(!h.is_batching());
    }

    #[test]
    fn multiple_undo_redo_cycles() {
        let mut h = HistoryManager::new(10);
        h.push("A", make_snapshot("s0"));
        h.push("B", make_snapshot("s1"));

        let s1 = h.undo(make_snapshot("s2")).unwrap();
        let s0 = h.undo(s1.clone()).unwrap();
        assert_eq!(tag_of(&s0), "s0");

        let back_to_s1 = h.redo(s0).unwrap();
        assert_eq!(tag_of(&back_to_s1), "s1");
        let back_to_s2 = h.redo(back_to_s1).unwrap();
        assert_eq!(tag_of(&back_to_s2), "s2");
        assert_eq!(h.undo_count(), 2);
        assert_eq!(h.redo_count(), 0);
    }
}
