//! Frame normalization and timeline/source rate conversion.
//!
//! Every store write passes frame-valued fields through these helpers so that
//! positions are non-negative integers and durations are at least one frame.

use crate::types::Frame;

/// Smallest legal item or transition duration.
pub const MIN_DURATION: Frame = 1;

/// Round a fractional frame value to a non-negative integer frame.
pub fn round_frame(value: f64) -> Frame {
    if !value.is_finite() {
        return 0;
    }
    (value.round() as Frame).max(0)
}

/// Round a fractional duration to an integer of at least [`MIN_DURATION`].
pub fn round_duration(value: f64) -> Frame {
    if !value.is_finite() {
        return MIN_DURATION;
    }
    (value.round() as Frame).max(MIN_DURATION)
}

/// Clamp an integer frame position to be non-negative.
pub fn normalize_frame(frame: Frame) -> Frame {
    frame.max(0)
}

/// Clamp an integer duration to at least [`MIN_DURATION`].
pub fn normalize_duration(duration: Frame) -> Frame {
    duration.max(MIN_DURATION)
}

/// Exclusive end frame of a `[from, from + duration)` span.
pub fn span_end(from: Frame, duration: Frame) -> Frame {
    from + duration
}

/// Whether two half-open spans share at least one frame.
pub fn spans_overlap(a_from: Frame, a_duration: Frame, b_from: Frame, b_duration: Frame) -> bool {
    a_from < b_from + b_duration && b_from < a_from + a_duration
}

/// Source frames consumed per timeline frame.
///
/// A clip at `speed` 2.0 whose source runs at 60fps on a 30fps timeline
/// consumes four source frames for each timeline frame.
pub fn source_rate(speed: f64, source_fps: f64, timeline_fps: f64) -> f64 {
    if speed <= 0.0 || source_fps <= 0.0 || timeline_fps <= 0.0 {
        return 1.0;
    }
    speed * source_fps / timeline_fps
}

/// Convert a timeline frame count into source-native frames.
pub fn timeline_to_source(timeline_frames: Frame, rate: f64) -> Frame {
    (timeline_frames as f64 * rate).round() as Frame
}

/// Convert source-native frames into whole timeline frames, rounding down so
/// the result never consumes more source than is available.
pub fn source_to_timeline(source_frames: Frame, rate: f64) -> Frame {
    if rate <= 0.0 {
        return source_frames;
    }
    // Tolerance keeps exact multiples from flooring one short.
    ((source_frames as f64 / rate) + 1e-9).floor() as Frame
}
