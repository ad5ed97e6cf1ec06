//! `splice-common` -- Shared types for the Splice timeline editing engine.
//!
//! This crate is the foundation the other engine crates depend on:
//!
//! - **Types**: `Frame`, `Rational`, `Resolution`
//! - **Frame utilities**: rounding/clamping of frame-valued fields and
//!   timeline-to-source rate conversion
//! - **Effects**: `ItemEffect`, `EffectCategory`, `ParamValue`
//! - **Transform**: `Transform`, `TransformPatch`
//! - **Config**: `EngineConfig`

pub mod config;
pub mod effect;
pub mod frame;
pub mod transform;
pub mod types;

// Re-export commonly used items at crate root
pub use config::EngineConfig;
pub use effect::{EffectCategory, ItemEffect, ParamValue};
pub use frame::{
    normalize_duration, normalize_frame, round_duration, round_frame, source_rate,
    source_to_timeline, span_end, spans_overlap, timeline_to_source, MIN_DURATION,
};
pub use transform::{Transform, TransformPatch};
pub use types::{Frame, Rational, Resolution};
