//! `splice-timeline` -- Timeline document model and primitive stores.
//!
//! The primitive layer of the editing engine. Stores expose non-cascading
//! mutations only:
//!
//! - **Items & tracks**: add/update/remove/move, trim, split, join, rate
//!   stretch, slip, effects
//! - **Transitions**: overlap records between adjacent clips
//! - **Keyframes**: per-item, per-property sorted lists with interpolation
//! - **Sub-compositions**: nested timeline documents and the navigation stack
//!
//! Item mutations report what they did as [`StoreEvent`]s; the engine folds
//! those into transitions and keyframes.
//!
//! # Usage
//!
//! ```rust
//! use splice_timeline::{ItemStore, MediaSource, TimelineItem, TimelineTrack};
//!
//! let mut store = ItemStore::new();
//! store.add_track(TimelineTrack::new("v1", "Video 1", 0.0));
//! let clip = TimelineItem::video("c1", "v1", 0, 90, MediaSource::new("m1", 300, 30.0));
//! let _ = store.add_item(clip);
//! let split = store.split_item("c1", 45, 30.0).unwrap();
//! assert_eq!(store.items().len(), 2);
//! assert_eq!(split.value.left_id, "c1");
//! ```

pub mod composition;
pub mod effects;
pub mod error;
pub mod event;
pub mod items;
pub mod keyframe;
pub mod navigation;
pub mod state;
pub mod tracks;
pub mod transition;
pub mod types;

pub use composition::{CompositionStore, SubComposition};
pub use error::{TimelineError, TimelineResult};
pub use event::{Outcome, StoreEvent, TrimEdge};
pub use items::{ItemStore, RateStretch, SpeedLimits, SplitResult, TrimOptions};
pub use keyframe::{
    AnimatableProperty, Easing, EasingConfig, ItemKeyframes, Keyframe, KeyframePatch,
    KeyframeStore, PropertyKeyframes,
};
pub use navigation::{
    find_reference, frame_into, frame_out_of, Breadcrumb, CompositionNavigator, ExitedContext,
    StashedContext,
};
pub use state::{TimelineData, TimelineState};
pub use transition::{
    NewTransition, Transition, TransitionDirection, TransitionPatch, TransitionStore,
    TransitionTiming, TransitionType,
};
pub use types::{
    ItemKind, ItemMove, ItemPatch, MediaSource, ShapeKind, TimelineItem, TimelineTrack,
    TrackPatch,
};

/// Generate a fresh entity id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
