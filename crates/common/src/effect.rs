//! Per-item effect instances and their parameter values.

use serde::{Deserialize, Serialize};

/// Effect category. Everything except [`EffectCategory::Audio`] renders pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectCategory {
    Color,
    Blur,
    Distort,
    Keying,
    Stylize,
    Transform,
    Generate,
    Audio,
}

impl EffectCategory {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Blur => "Blur",
            Self::Distort => "Distort",
            Self::Keying => "Keying",
            Self::Stylize => "Stylize",
            Self::Transform => "Transform",
            Self::Generate => "Generate",
            Self::Audio => "Audio",
        }
    }

    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

/// Concrete parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Color([f32; 4]),
    Choice(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// An effect applied to a timeline item. Items hold these in render order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEffect {
    pub id: String,
    /// Registry name, e.g. `"gaussianBlur"`.
    pub effect_type: String,
    pub category: EffectCategory,
    pub enabled: bool,
    #[serde(default)]
    pub params: Vec<(String, ParamValue)>,
}

impl ItemEffect {
    pub fn new(
        id: impl Into<String>,
        effect_type: impl Into<String>,
        category: EffectCategory,
    ) -> Self {
        Self {
            id: id.into(),
            effect_type: effect_type.into(),
            category,
            enabled: true,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Insert or overwrite a parameter, keeping first-insertion order.
    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.params.push((name, value)),
        }
    }
}
