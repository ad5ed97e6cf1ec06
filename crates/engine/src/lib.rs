//! `splice-engine` -- Non-linear timeline editing engine.
//!
//! This crate provides:
//!
//! - **`TimelineEngine`**: One editing session. Owns the working timeline, the sub-composition registry, navigation, history, markers and collaborator handles.
//! - **Edit verbs**: split, join, trims (ripple and rolling), slip, slide, rate stretch, moves, transitions, keyframes, effects, pre-compose/dissolve and freeze frame. Each verb is one undo step.
//! - **Dispatcher**: folds item-store events into transitions and keyframes, and repairs transitions once per command.
//! - **`HistoryManager`**: Snapshot-based undo/redo with batching.
//! - **Collaborators**: playback clock, selection sink, media library, frame decoder and asset store traits.
//!
//! # Architecture
//!
//! ```text
//! TimelineEngine
//! ├── state: TimelineState            (items, tracks, transitions, keyframes)
//! ├── compositions: CompositionStore  (sub-composition records)
//! ├── navigator                       (open composition stack)
//! ├── history / history_stash         (undo per navigation level)
//! ├── pending_breakages               (transitions removed by repair)
//! └── view: ViewState                 (markers, in/out, zoom, scroll)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use splice_engine::TimelineEngine;
//! use splice_timeline::{MediaSource, TimelineItem};
//!
//! let mut engine = TimelineEngine::default();
//! let track = engine.add_track("Video 1").unwrap();
//! let clip = TimelineItem::video("c1", &track, 0, 90, MediaSource::new("m1", 300, 30.0));
//! engine.add_items(vec![clip]).unwrap();
//!
//! engine.split_item("c1", 45).unwrap();
//! assert_eq!(engine.state().items.items().len(), 2);
//! engine.undo();
//! assert_eq!(engine.state().items.items().len(), 1);
//! ```

mod actions;
pub mod collaborators;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod history;
pub mod playback;
pub mod selection;
pub mod snapshot;
pub mod view;

// Re-export primary types at crate root for convenience.
pub use actions::compositions::CreatedPrecomp;
pub use collaborators::{
    AssetStore, DecodedFrame, FrameDecoder, MediaLibrary, MediaMetadata, PlaybackClock,
    SelectionSink, StoredAsset,
};
pub use dispatch::{BreakageReason, TransitionBreakage};
pub use engine::TimelineEngine;
pub use error::{CollaboratorError, EngineError, EngineResult};
pub use history::{HistoryEntry, HistoryManager};
pub use playback::{PlaybackMode, PlaybackState};
pub use selection::SelectionState;
pub use snapshot::TimelineSnapshot;
pub use view::ViewState;
