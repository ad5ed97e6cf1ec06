//! Per-item effect stack operations.

use splice_common::{ItemEffect, ParamValue};
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::generate_id;
use crate::items::ItemStore;
use crate::types::TimelineItem;

impl ItemStore {
    fn item_for_effects(&mut self, item_id: &str) -> TimelineResult<&mut TimelineItem> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| TimelineError::item(item_id))?;
        Ok(&mut self.items_mut()[idx])
    }

    /// Append an effect. Visual effects are rejected on audio items.
    pub fn add_effect(&mut self, item_id: &str, mut effect: ItemEffect) -> TimelineResult<String> {
        let item = self
            .get(item_id)
            .ok_or_else(|| TimelineError::item(item_id))?;
        if item.is_audio() && effect.category.is_visual() {
            return Err(TimelineError::IncompatibleEffect {
                item_id: item_id.to_string(),
                effect_type: effect.effect_type,
            });
        }
        if effect.id.is_empty() {
            effect.id = generate_id();
        }
        let id = effect.id.clone();
        debug!(item_id, effect_type = %effect.effect_type, "Added effect");
        self.item_for_effects(item_id)?.effects.push(effect);
        Ok(id)
    }

    /// Overwrite parameters on an existing effect.
    pub fn update_effect(
        &mut self,
        item_id: &str,
        effect_id: &str,
        params: &[(String, ParamValue)],
    ) -> TimelineResult<()> {
        let item = self.item_for_effects(item_id)?;
        let effect = item
            .effects
            .iter_mut()
            .find(|e| e.id == effect_id)
            .ok_or_else(|| TimelineError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?;
        for (name, value) in params {
            effect.set_param(name.clone(), value.clone());
        }
        Ok(())
    }

    pub fn remove_effect(&mut self, item_id: &str, effect_id: &str) -> TimelineResult<ItemEffect> {
        let item = self.item_for_effects(item_id)?;
        let idx = item
            .effects
            .iter()
            .position(|e| e.id == effect_id)
            .ok_or_else(|| TimelineError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?;
        Ok(item.effects.remove(idx))
    }

    /// Flip an effect's enabled flag; returns the new state.
    pub fn toggle_effect(&mut self, item_id: &str, effect_id: &str) -> TimelineResult<bool> {
        let item = self.item_for_effects(item_id)?;
        let effect = item
            .effects
            .iter_mut()
            .find(|e| e.id == effect_id)
            .ok_or_else(|| TimelineError::EffectNotFound {
                effect_id: effect_id.to_string(),
            })?;
        effect.enabled = !effect.enabled;
        Ok(effect.enabled)
    }
}
