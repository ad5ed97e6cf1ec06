//! Keyframe verbs. Frames are local to the item and clamped into its span.

use splice_common::Frame;
use splice_timeline::{AnimatableProperty, Easing, Keyframe, KeyframePatch, TimelineError};

use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    /// Add a keyframe, or overwrite the one already at that frame.
    pub fn add_keyframe(
        &mut self,
        item_id: &str,
        property: &AnimatableProperty,
        frame: Frame,
        value: f64,
        easing: Easing,
    ) -> EngineResult<String> {
        let item = self.ensure_item_editable(item_id)?;
        if let AnimatableProperty::EffectParam { effect_id, .. } = property {
            if !item.effects.iter().any(|e| &e.id == effect_id) {
                return Err(TimelineError::EffectNotFound {
                    effect_id: effect_id.clone(),
                }
                .into());
            }
        }
        let frame = frame.clamp(0, item.duration_in_frames - 1);
        self.execute("Add keyframe", |e| {
            let keyframe = Keyframe::new(frame, value).with_easing(easing);
            Ok(e.state.keyframes.add_keyframe(item_id, property, keyframe))
        })
    }

    pub fn update_keyframe(
        &mut self,
        item_id: &str,
        keyframe_id: &str,
        patch: &KeyframePatch,
    ) -> EngineResult<()> {
        let last = self.ensure_item_editable(item_id)?.duration_in_frames - 1;
        let patch = KeyframePatch {
            frame: patch.frame.map(|f| f.clamp(0, last)),
            ..patch.clone()
        };
        self.execute("Update keyframe", |e| {
            Ok(e.state.keyframes.update_keyframe(item_id, keyframe_id, &patch)?)
        })
    }

    pub fn remove_keyframe(&mut self, item_id: &str, keyframe_id: &str) -> EngineResult<Keyframe> {
        self.ensure_item_editable(item_id)?;
        self.execute("Remove keyframe", |e| {
            Ok(e.state.keyframes.remove_keyframe(item_id, keyframe_id)?)
        })
    }

    /// Drop the whole animation of one property.
    pub fn remove_property_keyframes(
        &mut self,
        item_id: &str,
        property: &AnimatableProperty,
    ) -> EngineResult<bool> {
        self.ensure_item_editable(item_id)?;
        self.execute("Clear keyframes", |e| {
            Ok(e.state.keyframes.remove_property(item_id, property))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{TimelineItem, TimelineTrack};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("a", "t1", 0, 30, "A"));
        engine
    }

    #[test]
    fn add_clamps_into_span_and_upserts() {
        let mut engine = engine();
        let first = engine
            .add_keyframe("a", &AnimatableProperty::Opacity, 100, 1.0, Easing::Linear)
            .unwrap();
        let list = engine
            .state()
            .keyframes
            .property("a", &AnimatableProperty::Opacity)
            .unwrap();
        assert_eq!(list.keyframes[0].frame, 29);

        let second = engine
            .add_keyframe("a", &AnimatableProperty::Opacity, 29, 0.5, Easing::Hold)
            .unwrap();
        assert_eq!(first, second);
        let list = engine
            .state()
            .keyframes
            .property("a", &AnimatableProperty::Opacity)
            .unwrap();
        assert_eq!(list.keyframes.len(), 1);
        assert_eq!(list.keyframes[0].value, 0.5);
        assert_eq!(engine.undo_count(), 2);
    }

    #[test]
    fn effect_param_requires_effect() {
        let mut engine = engine();
        let property = AnimatableProperty::EffectParam {
            effect_id: "nope".into(),
            param: "radius".into(),
        };
        assert!(engine
            .add_keyframe("a", &property, 0, 1.0, Easing::Linear)
            .is_err());
    }

    #[test]
    fn update_and_remove() {
        let mut engine = engine();
        let id = engine
            .add_keyframe("a", &AnimatableProperty::X, 0, 0.0, Easing::Linear)
            .unwrap();
        engine
            .update_keyframe("a", &id, &KeyframePatch {
                frame: Some(-5),
                value: Some(3.0),
                ..Default::default()
            })
            .unwrap();
        let kf = &engine
            .state()
            .keyframes
            .property("a", &AnimatableProperty::X)
            .unwrap()
            .keyframes[0];
        assert_eq!((kf.frame, kf.value), (0, 3.0));

        assert_eq!(engine.remove_keyframe("a", &id).unwrap().value, 3.0);
        assert!(engine.state().keyframes.get("a").is_none());
        assert!(engine.remove_keyframe("a", &id).is_err());
        assert!(!engine
            .remove_property_keyframes("a", &AnimatableProperty::X)
            .unwrap());
    }
}
