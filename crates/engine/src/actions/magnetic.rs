//! Magnetic gap closing.
//!
//! Only the gap an edit just opened is closed. Pre-existing gaps further
//! down the track are left alone.

use splice_common::Frame;
use tracing::debug;

use crate::engine::TimelineEngine;

/// A vacated span on one track.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Gap {
    pub track_id: String,
    pub start: Frame,
    pub length: Frame,
}

impl Gap {
    pub fn new(track_id: impl Into<String>, start: Frame, length: Frame) -> Self {
        Self {
            track_id: track_id.into(),
            start,
            length,
        }
    }
}

impl TimelineEngine {
    /// Close `gaps`, latest first so earlier positions stay valid.
    pub(crate) fn close_gaps(&mut self, mut gaps: Vec<Gap>) {
        gaps.sort_by(|a, b| b.start.cmp(&a.start));
        for gap in gaps {
            self.close_gap(&gap);
        }
    }

    /// Pull the items after `gap` left by the part of it that is still
    /// empty. Returns the applied shift.
    pub(crate) fn close_gap(&mut self, gap: &Gap) -> Frame {
        if gap.length <= 0 {
            return 0;
        }
        let gap_end = gap.start + gap.length;
        let items = self.state.items.items_on_track(&gap.track_id);

        // Anything still covering the start (overlapping clips) narrows the gap.
        let mut start = gap.start;
        for item in &items {
            if item.from <= start && item.end() > start {
                start = item.end();
            }
        }
        if start >= gap_end {
            return 0;
        }
        let Some(next_from) = items.iter().map(|i| i.from).filter(|&f| f >= start).min() else {
            return 0;
        };
        let shift = (gap_end - start).min(next_from - start);
        if shift <= 0 {
            return 0;
        }
        let later: Vec<String> = items
            .iter()
            .filter(|i| i.from >= next_from)
            .map(|i| i.id.clone())
            .collect();

        let out = self.state.items.shift_items(&later, -shift);
        self.apply(out);
        debug!(track_id = %gap.track_id, at = start, shift, "Closed gap");
        shift
    }
}
