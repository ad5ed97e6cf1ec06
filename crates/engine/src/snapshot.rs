//! Undo/redo snapshot.
//!
//! A [`TimelineSnapshot`] holds the active context's items, tracks,
//! transitions and keyframes plus the composition registry. Every collection
//! is copy-on-write, so capture is a few reference-count bumps and comparing
//! two snapshots of unchanged stores short-circuits on pointer equality.

use splice_timeline::{CompositionStore, TimelineState};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineSnapshot {
    pub state: TimelineState,
    pub compositions: CompositionStore,
}

impl TimelineSnapshot {
    pub fn capture(state: &TimelineState, compositions: &CompositionStore) -> Self {
        Self {
            state: state.clone(),
            compositions: compositions.clone(),
        }
    }

    /// Replace both collections wholesale.
    pub fn restore(self, state: &mut TimelineState, compositions: &mut CompositionStore) {
        *state = self.state;
        *compositions = self.compositions;
    }
}
