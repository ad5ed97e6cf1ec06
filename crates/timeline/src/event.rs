//! Store events: the effect list every primitive mutation returns.
//!
//! Primitive stores never reach into each other. A mutation reports what it
//! did as [`StoreEvent`]s and the engine's dispatcher folds those into the
//! dependent collections (transitions, keyframes).

use splice_common::Frame;

/// Which edge of an item a trim moved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrimEdge {
    Start,
    End,
}

/// One primitive change to the items store.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    ItemsAdded {
        item_ids: Vec<String>,
    },
    ItemsRemoved {
        item_ids: Vec<String>,
    },
    /// Position and/or track changed, duration did not.
    ItemsMoved {
        item_ids: Vec<String>,
    },
    /// Fields changed through an update. A duration change is also reported
    /// as an end-edge [`StoreEvent::ItemTrimmed`].
    ItemsUpdated {
        item_ids: Vec<String>,
    },
    /// An edge moved by `delta` frames (positive = rightward).
    ItemTrimmed {
        item_id: String,
        edge: TrimEdge,
        delta: Frame,
    },
    /// `left_id` kept the original id; `offset` is the cut in local frames.
    ItemSplit {
        left_id: String,
        right_id: String,
        offset: Frame,
    },
    ItemsJoined {
        survivor_id: String,
        absorbed_ids: Vec<String>,
    },
    ItemRetimed {
        item_id: String,
        old_duration: Frame,
        new_duration: Frame,
    },
}

impl StoreEvent {
    /// Ids of items whose geometry may have changed and whose transitions
    /// need re-validation.
    pub fn touched_items(&self) -> Vec<&str> {
        match self {
            Self::ItemsAdded { item_ids }
            | Self::ItemsMoved { item_ids }
            | Self::ItemsUpdated { item_ids } => item_ids.iter().map(String::as_str).collect(),
            Self::ItemTrimmed { item_id, .. } | Self::ItemRetimed { item_id, .. } => {
                vec![item_id.as_str()]
            }
            Self::ItemSplit {
                left_id, right_id, ..
            } => vec![left_id.as_str(), right_id.as_str()],
            Self::ItemsJoined { survivor_id, .. } => vec![survivor_id.as_str()],
            Self::ItemsRemoved { .. } => Vec::new(),
        }
    }
}

/// Result of a primitive mutation: its value plus the events to dispatch.
#[derive(Clone, Debug, PartialEq)]
#[must_use = "store events must be dispatched"]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<StoreEvent>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, event: StoreEvent) -> Self {
        Self {
            value,
            events: vec![event],
        }
    }

    /// A mutation that changed nothing.
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            events: self.events,
        }
    }
}
