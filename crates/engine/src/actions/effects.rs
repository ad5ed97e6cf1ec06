//! Effect stack verbs.

use splice_common::{ItemEffect, ParamValue};
use splice_timeline::AnimatableProperty;

use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    pub fn add_effect(&mut self, item_id: &str, effect: ItemEffect) -> EngineResult<String> {
        self.ensure_item_editable(item_id)?;
        self.execute("Add effect", |e| Ok(e.state.items.add_effect(item_id, effect)?))
    }

    pub fn update_effect(
        &mut self,
        item_id: &str,
        effect_id: &str,
        params: &[(String, ParamValue)],
    ) -> EngineResult<()> {
        self.ensure_item_editable(item_id)?;
        self.execute("Update effect", |e| {
            Ok(e.state.items.update_effect(item_id, effect_id, params)?)
        })
    }

    /// Remove an effect and any keyframes animating its parameters.
    pub fn remove_effect(&mut self, item_id: &str, effect_id: &str) -> EngineResult<ItemEffect> {
        self.ensure_item_editable(item_id)?;
        self.execute("Remove effect", |e| {
            let removed = e.state.items.remove_effect(item_id, effect_id)?;
            let animated: Vec<AnimatableProperty> = e
                .state
                .keyframes
                .get(item_id)
                .map(|entry| {
                    entry
                        .properties
                        .iter()
                        .filter(|p| {
                            matches!(
                                &p.property,
                                AnimatableProperty::EffectParam { effect_id: id, .. } if id == effect_id
                            )
                        })
                        .map(|p| p.property.clone())
                        .collect()
                })
                .unwrap_or_default();
            for property in &animated {
                e.state.keyframes.remove_property(item_id, property);
            }
            Ok(removed)
        })
    }

    /// Returns the new enabled state.
    pub fn toggle_effect(&mut self, item_id: &str, effect_id: &str) -> EngineResult<bool> {
        self.ensure_item_editable(item_id)?;
        self.execute("Toggle effect", |e| Ok(e.state.items.toggle_effect(item_id, effect_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_common::EffectCategory;
    use splice_timeline::{Keyframe, MediaSource, TimelineItem, TimelineTrack};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        let _ = engine.state.items.add_item(TimelineItem::video(
            "v",
            "t1",
            0,
            60,
            MediaSource::new("m", 300, 30.0),
        ));
        let _ = engine.state.items.add_item(TimelineItem::audio(
            "a",
            "t1",
            60,
            60,
            MediaSource::new("m", 300, 30.0),
        ));
        engine
    }

    #[test]
    fn effect_lifecycle() {
        let mut engine = engine();
        let id = engine
            .add_effect("v", ItemEffect::new("", "gaussianBlur", EffectCategory::Blur))
            .unwrap();
        engine
            .update_effect("v", &id, &[("radius".to_string(), ParamValue::Float(4.0))])
            .unwrap();
        assert!(!engine.toggle_effect("v", &id).unwrap());

        let property = AnimatableProperty::EffectParam {
            effect_id: id.clone(),
            param: "radius".into(),
        };
        let _ = engine
            .state
            .keyframes
            .add_keyframe("v", &property, Keyframe::new(0, 2.0));
        let removed = engine.remove_effect("v", &id).unwrap();
        assert_eq!(removed.get_param("radius"), Some(&ParamValue::Float(4.0)));
        assert!(engine.state().keyframes.get("v").is_none());
    }

    #[test]
    fn visual_effect_rejected_on_audio() {
        let mut engine = engine();
        let err = engine
            .add_effect("a", ItemEffect::new("", "gaussianBlur", EffectCategory::Blur))
            .unwrap_err();
        assert!(err.is_rejection());
        assert!(!engine.can_undo());
    }
}
