//! Animation keyframes: per-item, per-property sorted lists.
//!
//! Frames are local to the item (0 = item start). Within one property list
//! frames are unique and ascending; every mutation here preserves that.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use splice_common::Frame;
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::generate_id;

/// Properties that can be animated with keyframes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnimatableProperty {
    X,
    Y,
    ScaleX,
    ScaleY,
    Rotation,
    Opacity,
    Volume,
    #[serde(rename_all = "camelCase")]
    EffectParam { effect_id: String, param: String },
}

/// How a keyframe eases into the next one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    CubicBezier,
    Spring,
    /// Step function: hold the value until the next keyframe.
    Hold,
}

/// Parameters for the parametric easings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EasingConfig {
    /// `[x1, y1, x2, y2]` for [`Easing::CubicBezier`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bezier_points: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub id: String,
    /// Local frame, relative to the item start.
    pub frame: Frame,
    pub value: f64,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing_config: Option<EasingConfig>,
}

impl Keyframe {
    pub fn new(frame: Frame, value: f64) -> Self {
        Self {
            id: generate_id(),
            frame,
            value,
            easing: Easing::Linear,
            easing_config: None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Sorted keyframes for one property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyKeyframes {
    pub property: AnimatableProperty,
    pub keyframes: Vec<Keyframe>,
}

impl PropertyKeyframes {
    pub fn new(property: AnimatableProperty) -> Self {
        Self {
            property,
            keyframes: Vec::new(),
        }
    }

    /// Insert, or overwrite value/easing of the keyframe already at `frame`.
    /// Returns the id of the keyframe now at that frame.
    pub fn upsert(&mut self, keyframe: Keyframe) -> String {
        match self.keyframes.binary_search_by_key(&keyframe.frame, |k| k.frame) {
            Ok(idx) => {
                let existing = &mut self.keyframes[idx];
                existing.value = keyframe.value;
                existing.easing = keyframe.easing;
                existing.easing_config = keyframe.easing_config;
                existing.id.clone()
            }
            Err(idx) => {
                let id = keyframe.id.clone();
                self.keyframes.insert(idx, keyframe);
                id
            }
        }
    }

    /// Interpolated value at a local frame. `None` when the list is empty.
    ///
    /// Before the first keyframe the first value holds; after the last, the
    /// last value holds.
    pub fn value_at(&self, frame: Frame) -> Option<f64> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }
        let idx = self.keyframes.partition_point(|k| k.frame <= frame);
        let a = &self.keyframes[idx - 1];
        let b = &self.keyframes[idx];
        Some(interpolate(a, b, frame))
    }
}

/// All animated properties of one item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemKeyframes {
    pub item_id: String,
    pub properties: Vec<PropertyKeyframes>,
}

impl ItemKeyframes {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(&self, property: &AnimatableProperty) -> Option<&PropertyKeyframes> {
        self.properties.iter().find(|p| &p.property == property)
    }

    fn property_mut(&mut self, property: &AnimatableProperty) -> &mut PropertyKeyframes {
        let idx = match self.properties.iter().position(|p| &p.property == property) {
            Some(idx) => idx,
            None => {
                self.properties.push(PropertyKeyframes::new(property.clone()));
                self.properties.len() - 1
            }
        };
        &mut self.properties[idx]
    }

    fn is_empty(&self) -> bool {
        self.properties.iter().all(|p| p.keyframes.is_empty())
    }

    fn prune(&mut self) {
        self.properties.retain(|p| !p.keyframes.is_empty());
    }

    /// Copy under a new item id with fresh keyframe ids.
    pub fn duplicate_for(&self, item_id: &str) -> Self {
        let mut copy = self.clone();
        copy.item_id = item_id.to_string();
        for prop in &mut copy.properties {
            for kf in &mut prop.keyframes {
                kf.id = generate_id();
            }
        }
        copy
    }

    /// Point effect-parameter animations at renamed effects. Ids missing
    /// from `effect_ids` are left alone.
    pub fn retarget_effects(&mut self, effect_ids: &BTreeMap<String, String>) {
        for prop in &mut self.properties {
            if let AnimatableProperty::EffectParam { effect_id, .. } = &mut prop.property {
                if let Some(new_id) = effect_ids.get(effect_id.as_str()) {
                    *effect_id = new_id.clone();
                }
            }
        }
    }
}

/// Partial keyframe update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyframePatch {
    pub frame: Option<Frame>,
    pub value: Option<f64>,
    pub easing: Option<Easing>,
    pub easing_config: Option<Option<EasingConfig>>,
}

/// Keyframes for every animated item on a timeline.
#[derive(Clone, Debug, Default)]
pub struct KeyframeStore {
    entries: Arc<Vec<ItemKeyframes>>,
}

impl PartialEq for KeyframeStore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries) || self.entries == other.entries
    }
}

impl KeyframeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(entries: Vec<ItemKeyframes>) -> Self {
        let mut entries = entries;
        for entry in &mut entries {
            for prop in &mut entry.properties {
                prop.keyframes.sort_by_key(|k| k.frame);
                prop.keyframes.dedup_by_key(|k| k.frame);
            }
        }
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn all(&self) -> &[ItemKeyframes] {
        &self.entries
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemKeyframes> {
        self.entries.iter().find(|e| e.item_id == item_id)
    }

    pub fn property(
        &self,
        item_id: &str,
        property: &AnimatableProperty,
    ) -> Option<&PropertyKeyframes> {
        self.get(item_id)?.property(property)
    }

    fn entries_mut(&mut self) -> &mut Vec<ItemKeyframes> {
        Arc::make_mut(&mut self.entries)
    }

    fn entry_mut(&mut self, item_id: &str) -> &mut ItemKeyframes {
        let entries = self.entries_mut();
        let idx = match entries.iter().position(|e| e.item_id == item_id) {
            Some(idx) => idx,
            None => {
                entries.push(ItemKeyframes::new(item_id));
                entries.len() - 1
            }
        };
        &mut entries[idx]
    }

    fn existing_entry_mut(&mut self, item_id: &str) -> Option<&mut ItemKeyframes> {
        let idx = self.entries.iter().position(|e| e.item_id == item_id)?;
        Some(&mut self.entries_mut()[idx])
    }

    fn drop_empty(&mut self) {
        if self.entries.iter().any(ItemKeyframes::is_empty) {
            self.entries_mut().retain(|e| !e.is_empty());
        }
    }

    /// Upsert a keyframe (see [`PropertyKeyframes::upsert`]).
    pub fn add_keyframe(
        &mut self,
        item_id: &str,
        property: &AnimatableProperty,
        keyframe: Keyframe,
    ) -> String {
        let mut keyframe = keyframe;
        keyframe.frame = keyframe.frame.max(0);
        let id = self.entry_mut(item_id).property_mut(property).upsert(keyframe);
        debug!(item_id, keyframe_id = %id, "Upserted keyframe");
        id
    }

    /// Update one keyframe. Moving it onto an occupied frame replaces the
    /// keyframe that was there.
    pub fn update_keyframe(
        &mut self,
        item_id: &str,
        keyframe_id: &str,
        patch: &KeyframePatch,
    ) -> TimelineResult<()> {
        let not_found = || TimelineError::KeyframeNotFound {
            keyframe_id: keyframe_id.to_string(),
        };
        let (p_idx, k_idx) = self
            .get(item_id)
            .and_then(|e| {
                e.properties.iter().enumerate().find_map(|(p, prop)| {
                    prop.keyframes
                        .iter()
                        .position(|k| k.id == keyframe_id)
                        .map(|k| (p, k))
                })
            })
            .ok_or_else(not_found)?;
        let entry = self.existing_entry_mut(item_id).ok_or_else(not_found)?;
        let list = &mut entry.properties[p_idx].keyframes;

        let mut kf = list.remove(k_idx);
        if let Some(frame) = patch.frame {
            kf.frame = frame.max(0);
        }
        if let Some(value) = patch.value {
            kf.value = value;
        }
        if let Some(easing) = patch.easing {
            kf.easing = easing;
        }
        if let Some(config) = &patch.easing_config {
            kf.easing_config = config.clone();
        }
        list.retain(|k| k.frame != kf.frame);
        let at = list.partition_point(|k| k.frame < kf.frame);
        list.insert(at, kf);
        Ok(())
    }

    pub fn remove_keyframe(&mut self, item_id: &str, keyframe_id: &str) -> TimelineResult<Keyframe> {
        let not_found = || TimelineError::KeyframeNotFound {
            keyframe_id: keyframe_id.to_string(),
        };
        let located = self.get(item_id).and_then(|e| {
            e.properties.iter().enumerate().find_map(|(p, prop)| {
                prop.keyframes
                    .iter()
                    .position(|k| k.id == keyframe_id)
                    .map(|k| (p, k))
            })
        });
        let (p_idx, k_idx) = located.ok_or_else(not_found)?;
        let entry = self.existing_entry_mut(item_id).ok_or_else(not_found)?;
        let removed = entry.properties[p_idx].keyframes.remove(k_idx);
        entry.prune();
        self.drop_empty();
        Ok(removed)
    }

    /// Remove every keyframe of one property. Returns whether any existed.
    pub fn remove_property(&mut self, item_id: &str, property: &AnimatableProperty) -> bool {
        if self.property(item_id, property).is_none() {
            return false;
        }
        if let Some(entry) = self.existing_entry_mut(item_id) {
            entry.properties.retain(|p| &p.property != property);
        }
        self.drop_empty();
        true
    }

    /// Cascade helper for item removal and joins.
    pub fn remove_for_items(&mut self, item_ids: &[String]) -> Vec<ItemKeyframes> {
        if !self.entries.iter().any(|e| item_ids.contains(&e.item_id)) {
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .cloned()
            .partition(|e| item_ids.contains(&e.item_id));
        self.entries = Arc::new(kept);
        removed
    }

    /// Insert a whole entry, replacing any existing one for the item.
    pub fn insert(&mut self, entry: ItemKeyframes) {
        let entries = self.entries_mut();
        entries.retain(|e| e.item_id != entry.item_id);
        if !entry.is_empty() {
            entries.push(entry);
        }
    }

    /// Copy `source_item`'s keyframes onto `target_item` with fresh ids.
    /// `effect_ids` maps the source's effect ids to the target's.
    pub fn duplicate(
        &mut self,
        source_item: &str,
        target_item: &str,
        effect_ids: &BTreeMap<String, String>,
    ) -> bool {
        let Some(mut copy) = self.get(source_item).map(|e| e.duplicate_for(target_item)) else {
            return false;
        };
        copy.retarget_effects(effect_ids);
        self.insert(copy);
        true
    }

    /// Rescale an item's keyframes for a duration change.
    ///
    /// Frames are multiplied by `new / old`, rounded, and clamped to
    /// `[0, new - 1]`. When two keyframes land on one frame, the one with
    /// the larger original frame wins.
    pub fn scale_for_item(&mut self, item_id: &str, old_duration: Frame, new_duration: Frame) {
        if old_duration <= 0 || new_duration <= 0 || old_duration == new_duration {
            return;
        }
        if self.get(item_id).is_none() {
            return;
        }
        let ratio = new_duration as f64 / old_duration as f64;
        let max_frame = new_duration - 1;
        if let Some(entry) = self.existing_entry_mut(item_id) {
            for prop in &mut entry.properties {
                let mut scaled: Vec<Keyframe> = Vec::with_capacity(prop.keyframes.len());
                // Input is ascending, so a later collision always has the
                // larger original frame.
                for kf in prop.keyframes.drain(..) {
                    let frame = ((kf.frame as f64 * ratio).round() as Frame).clamp(0, max_frame);
                    match scaled.last_mut() {
                        Some(prev) if prev.frame == frame => *prev = Keyframe { frame, ..kf },
                        _ => scaled.push(Keyframe { frame, ..kf }),
                    }
                }
                prop.keyframes = scaled;
            }
        }
        debug!(item_id, old_duration, new_duration, "Rescaled keyframes");
    }

    /// Shift an item's keyframes by `delta` local frames, dropping those that
    /// leave `[0, duration - 1]`.
    pub fn shift_for_item(&mut self, item_id: &str, delta: Frame, duration: Frame) {
        if delta == 0 || self.get(item_id).is_none() {
            return;
        }
        if let Some(entry) = self.existing_entry_mut(item_id) {
            for prop in &mut entry.properties {
                for kf in &mut prop.keyframes {
                    kf.frame += delta;
                }
                prop.keyframes.retain(|k| k.frame >= 0 && k.frame < duration);
            }
            entry.prune();
        }
        self.drop_empty();
    }

    /// Drop keyframes at or beyond `duration` (end-edge trims).
    pub fn truncate_for_item(&mut self, item_id: &str, duration: Frame) {
        let beyond = self.get(item_id).is_some_and(|e| {
            e.properties
                .iter()
                .any(|p| p.keyframes.iter().any(|k| k.frame >= duration))
        });
        if !beyond {
            return;
        }
        if let Some(entry) = self.existing_entry_mut(item_id) {
            for prop in &mut entry.properties {
                prop.keyframes.retain(|k| k.frame < duration);
            }
            entry.prune();
        }
        self.drop_empty();
    }

    /// Partition an item's keyframes across a split at local frame `offset`.
    ///
    /// The left item keeps frames `< offset`; the right item receives the rest
    /// re-based to 0. Each side gets a boundary keyframe carrying the
    /// interpolated value at the cut so the animation is continuous.
    pub fn split_for_item(&mut self, left_id: &str, right_id: &str, offset: Frame) {
        let Some(entry) = self.get(left_id).cloned() else {
            return;
        };
        let mut left = ItemKeyframes::new(left_id);
        let mut right = ItemKeyframes::new(right_id);

        for prop in &entry.properties {
            let mut l = PropertyKeyframes::new(prop.property.clone());
            let mut r = PropertyKeyframes::new(prop.property.clone());
            for kf in &prop.keyframes {
                if kf.frame < offset {
                    l.keyframes.push(kf.clone());
                } else {
                    let mut moved = kf.clone();
                    moved.id = generate_id();
                    moved.frame -= offset;
                    r.keyframes.push(moved);
                }
            }

            let last_left = offset - 1;
            if !r.keyframes.is_empty() && l.keyframes.last().map(|k| k.frame) != Some(last_left) {
                if let Some(value) = prop.value_at(last_left) {
                    l.upsert(Keyframe::new(last_left, value));
                }
            }
            if !l.keyframes.is_empty() && r.keyframes.first().map(|k| k.frame) != Some(0) {
                if let Some(value) = prop.value_at(offset) {
                    r.upsert(Keyframe::new(0, value));
                }
            }

            if !l.keyframes.is_empty() {
                left.properties.push(l);
            }
            if !r.keyframes.is_empty() {
                right.properties.push(r);
            }
        }

        self.insert(left);
        self.insert(right);
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

fn interpolate(a: &Keyframe, b: &Keyframe, frame: Frame) -> f64 {
    let span = (b.frame - a.frame) as f64;
    if span <= 0.0 {
        return a.value;
    }
    let t = (frame - a.frame) as f64 / span;
    let eased = match a.easing {
        Easing::Hold => return a.value,
        Easing::Linear => t,
        Easing::EaseIn => cubic_bezier_progress([0.42, 0.0, 1.0, 1.0], t),
        Easing::EaseOut => cubic_bezier_progress([0.0, 0.0, 0.58, 1.0], t),
        Easing::EaseInOut => cubic_bezier_progress([0.42, 0.0, 0.58, 1.0], t),
        Easing::CubicBezier => {
            let points = a
                .easing_config
                .as_ref()
                .and_then(|c| c.bezier_points)
                .unwrap_or([0.42, 0.0, 0.58, 1.0]);
            cubic_bezier_progress(points, t)
        }
        Easing::Spring => spring_progress(a.easing_config.as_ref(), t),
    };
    a.value + (b.value - a.value) * eased
}

/// Damped-spring progress over a normalized segment.
fn spring_progress(config: Option<&EasingConfig>, t: f64) -> f64 {
    let stiffness = config.and_then(|c| c.stiffness).unwrap_or(100.0).max(1e-3);
    let damping = config.and_then(|c| c.damping).unwrap_or(10.0).max(0.0);
    let omega = stiffness.sqrt();
    let zeta = damping / (2.0 * omega);
    if zeta < 1.0 {
        let omega_d = omega * (1.0 - zeta * zeta).sqrt();
        let decay = (-zeta * omega * t).exp();
        1.0 - decay * ((omega_d * t).cos() + (zeta * omega / omega_d) * (omega_d * t).sin())
    } else {
        1.0 - (1.0 + omega * t) * (-omega * t).exp()
    }
}

/// Progress along a CSS-style cubic bezier `(x1, y1, x2, y2)` at normalized
/// time `t`: solve the x curve for the parameter, then evaluate y.
fn cubic_bezier_progress(points: [f64; 4], t: f64) -> f64 {
    let [x1, y1, x2, y2] = points;
    let x1 = x1.clamp(0.0, 1.0);
    let x2 = x2.clamp(0.0, 1.0);
    let s = solve_bezier_x(x1, x2, t.clamp(0.0, 1.0));
    eval_cubic(0.0, y1, y2, 1.0, s)
}

/// B(t) = (1-t)^3*p0 + 3*(1-t)^2*t*p1 + 3*(1-t)*t^2*p2 + t^3*p3
fn eval_cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

fn eval_cubic_derivative(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * (p1 - p0) + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (p3 - p2)
}

/// Newton-Raphson with a bisection fallback; x0 = 0, x3 = 1.
fn solve_bezier_x(x1: f64, x2: f64, target: f64) -> f64 {
    let mut t = target;
    for _ in 0..8 {
        let x = eval_cubic(0.0, x1, x2, 1.0, t) - target;
        if x.abs() < 1e-7 {
            return t;
        }
        let dx = eval_cubic_derivative(0.0, x1, x2, 1.0, t);
        if dx.abs() < 1e-10 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    t = target;
    for _ in 0..32 {
        let x = eval_cubic(0.0, x1, x2, 1.0, t);
        if (x - target).abs() < 1e-7 {
            break;
        }
        if x < target {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    t
}
