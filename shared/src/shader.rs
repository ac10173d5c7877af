//! Shader selection and per-kind parameters.
//!
//! Every [`ShaderKind`] declares the parameter names it recognizes together
//! with their types and defaults. A [`ShaderConfig`] always carries a value
//! for every recognized parameter of its kind, so the renderer never has to
//! guess at missing keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a single shader parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
}

impl ParamValue {
    pub fn as_float(self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(v),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(v),
            ParamValue::Float(_) => None,
        }
    }

    fn same_type(self, other: ParamValue) -> bool {
        matches!(
            (self, other),
            (ParamValue::Bool(_), ParamValue::Bool(_)) | (ParamValue::Float(_), ParamValue::Float(_))
        )
    }

    fn type_name(self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Float(_) => "float",
        }
    }
}

/// A parameter recognized by a shader kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: ParamValue,
}

const fn float(name: &'static str, default: f32) -> ParamSpec {
    ParamSpec {
        name,
        default: ParamValue::Float(default),
    }
}

const fn boolean(name: &'static str, default: bool) -> ParamSpec {
    ParamSpec {
        name,
        default: ParamValue::Bool(default),
    }
}

const CUT_PARAMS: &[ParamSpec] = &[float("sharpness_min", 0.1), float("sharpness_max", 0.3)];

const CUT2_PARAMS: &[ParamSpec] = &[float("sharpness_bias", 1.0), float("sharpness_max", 1.0)];

const CUT3_PARAMS: &[ParamSpec] = &[
    boolean("use_dynamic_blend", true),
    float("blend_min_contrast_edge", 0.0),
    float("blend_max_contrast_edge", 1.0),
    float("blend_min_sharpness", 0.0),
    float("blend_max_sharpness", 1.0),
    float("static_sharpness", 0.5),
    boolean("edge_use_fast_luma", false),
    float("edge_min_value", 0.03),
    float("edge_min_contrast", 1.20),
    boolean("luma_adjust_gamma", false),
    boolean("split_demo_view", false),
];

/// Shader family applied to the engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    #[default]
    Default,
    Crt,
    Lcd,
    Sharp,
    Cut,
    Cut2,
    Cut3,
    TriangleUpscale,
    TriangleUpscaleSmooth,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 9] = [
        ShaderKind::Default,
        ShaderKind::Crt,
        ShaderKind::Lcd,
        ShaderKind::Sharp,
        ShaderKind::Cut,
        ShaderKind::Cut2,
        ShaderKind::Cut3,
        ShaderKind::TriangleUpscale,
        ShaderKind::TriangleUpscaleSmooth,
    ];

    /// Parameters recognized by this kind, in declaration order.
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            ShaderKind::Cut => CUT_PARAMS,
            ShaderKind::Cut2 => CUT2_PARAMS,
            ShaderKind::Cut3 => CUT3_PARAMS,
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Default => "default",
            ShaderKind::Crt => "crt",
            ShaderKind::Lcd => "lcd",
            ShaderKind::Sharp => "sharp",
            ShaderKind::Cut => "cut",
            ShaderKind::Cut2 => "cut2",
            ShaderKind::Cut3 => "cut3",
            ShaderKind::TriangleUpscale => "triangle_upscale",
            ShaderKind::TriangleUpscaleSmooth => "triangle_upscale_smooth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn spec(self, name: &str) -> Option<&'static ParamSpec> {
        self.parameters().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("unknown shader kind '{0}'")]
    UnknownKind(String),

    #[error("shader parameter '{name}' of {kind} expects a {expected} value")]
    WrongType {
        kind: ShaderKind,
        name: String,
        expected: &'static str,
    },

    #[error("shader parameter '{name}' of {kind} must be finite, got {value}")]
    NotFinite {
        kind: ShaderKind,
        name: String,
        value: f32,
    },
}

/// A shader kind with a complete, validated parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderConfig {
    kind: ShaderKind,
    params: Vec<(&'static str, ParamValue)>,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new(ShaderKind::Default)
    }
}

impl ShaderConfig {
    /// Shader of the given kind with every parameter at its default.
    pub fn new(kind: ShaderKind) -> Self {
        Self {
            kind,
            params: kind
                .parameters()
                .iter()
                .map(|spec| (spec.name, spec.default))
                .collect(),
        }
    }

    /// Build a shader from loosely typed parameters.
    ///
    /// Keys the kind does not recognize are skipped. A recognized key with a
    /// value of the wrong type, or a non-finite float, is an error.
    pub fn with_params<K, I>(kind: ShaderKind, params: I) -> Result<Self, ShaderError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, ParamValue)>,
    {
        let mut config = Self::new(kind);
        for (name, value) in params {
            config.set(name.as_ref(), value)?;
        }
        Ok(config)
    }

    /// Same as [`ShaderConfig::with_params`] but resolves the kind by name.
    pub fn from_name<K, I>(kind: &str, params: I) -> Result<Self, ShaderError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, ParamValue)>,
    {
        let kind = ShaderKind::from_name(kind).ok_or_else(|| ShaderError::UnknownKind(kind.to_string()))?;
        Self::with_params(kind, params)
    }

    /// Set one parameter. Returns `Ok(false)` when the kind ignores the key.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<bool, ShaderError> {
        let Some(spec) = self.kind.spec(name) else {
            return Ok(false);
        };

        if !spec.default.same_type(value) {
            return Err(ShaderError::WrongType {
                kind: self.kind,
                name: name.to_string(),
                expected: spec.default.type_name(),
            });
        }
        if let ParamValue::Float(v) = value
            && !v.is_finite()
        {
            return Err(ShaderError::NotFinite {
                kind: self.kind,
                name: name.to_string(),
                value: v,
            });
        }

        if let Some(slot) = self.params.iter_mut().find(|(n, _)| *n == spec.name) {
            slot.1 = value;
        }
        Ok(true)
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.param(name).and_then(ParamValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.param(name).and_then(ParamValue::as_bool)
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&'static str, ParamValue)> + '_ {
        self.params.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterless_kinds() {
        for kind in [ShaderKind::Default, ShaderKind::Crt, ShaderKind::Lcd, ShaderKind::Sharp] {
            let config = ShaderConfig::new(kind);
            assert_eq!(config.params().count(), 0);
        }
    }

    #[test]
    fn test_defaults_filled_in() {
        let config = ShaderConfig::new(ShaderKind::Cut3);
        assert_eq!(config.params().count(), 11);
        assert_eq!(config.bool("use_dynamic_blend"), Some(true));
        assert_eq!(config.float("edge_min_contrast"), Some(1.20));
        assert_eq!(config.bool("split_demo_view"), Some(false));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = ShaderConfig::with_params(
            ShaderKind::Cut,
            [
                ("sharpness_min", ParamValue::Float(0.2)),
                ("scanline_strength", ParamValue::Float(3.0)),
            ],
        )
        .unwrap();
        assert_eq!(config.float("sharpness_min"), Some(0.2));
        assert_eq!(config.float("sharpness_max"), Some(0.3));
        assert_eq!(config.param("scanline_strength"), None);
    }

    #[test]
    fn test_keys_belong_to_their_kind() {
        // sharpness_bias is a Cut2 parameter, Cut ignores it
        let config =
            ShaderConfig::with_params(ShaderKind::Cut, [("sharpness_bias", ParamValue::Float(2.0))])
                .unwrap();
        assert_eq!(config, ShaderConfig::new(ShaderKind::Cut));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err =
            ShaderConfig::with_params(ShaderKind::Cut3, [("use_dynamic_blend", ParamValue::Float(1.0))])
                .unwrap_err();
        assert!(matches!(err, ShaderError::WrongType { expected: "bool", .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err =
            ShaderConfig::with_params(ShaderKind::Cut2, [("sharpness_max", ParamValue::Float(f32::NAN))])
                .unwrap_err();
        assert!(matches!(err, ShaderError::NotFinite { .. }));
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ShaderKind::from_name("CRT"), Some(ShaderKind::Crt));
        assert_eq!(
            ShaderKind::from_name("triangle_upscale_smooth"),
            Some(ShaderKind::TriangleUpscaleSmooth)
        );
        assert_eq!(ShaderKind::from_name("bloom"), None);

        let err = ShaderConfig::from_name::<&str, _>("bloom", []).unwrap_err();
        assert_eq!(err, ShaderError::UnknownKind("bloom".to_string()));
    }

    #[test]
    fn test_set_reports_recognition() {
        let mut config = ShaderConfig::new(ShaderKind::Cut2);
        assert!(config.set("sharpness_bias", ParamValue::Float(0.5)).unwrap());
        assert!(!config.set("unused", ParamValue::Bool(true)).unwrap());
        assert_eq!(config.float("sharpness_bias"), Some(0.5));
    }
}
