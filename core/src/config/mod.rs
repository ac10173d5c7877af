//! Session configuration
//!
//! A [`SessionConfig`] is assembled once per session through
//! [`SessionConfigBuilder`] and is immutable afterwards. Required fields have
//! no defaults: a missing engine path or directory fails at `build()`, never
//! at first use.

mod file;
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use retroview_shared::{ShaderConfig, ShaderError, Variable};
use serde::{Deserialize, Serialize};

pub use file::{SESSION_FILE_NAME, SessionFile, ShaderSection, config_dir, default_session_path};

/// Refresh rate used when the host does not report one.
pub const DEFAULT_REFRESH_RATE: f32 = 60.0;

/// Language reported to the engine when the host does not set one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// GLES versions a host context can provide.
pub const SUPPORTED_GLES_VERSIONS: [u8; 2] = [2, 3];

/// Errors raised while building or loading a session configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("variable key must not be empty")]
    EmptyVariableKey,

    #[error("duplicate variable key '{0}'")]
    DuplicateVariable(String),

    #[error("refresh rate must be a positive finite number, got {0}")]
    InvalidRefreshRate(f32),

    #[error("unsupported GLES version {0} (expected 2 or 3)")]
    UnsupportedGlesVersion(u8),

    #[error("invalid language tag '{0}'")]
    InvalidLanguage(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("failed to read session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Opaque feature switches forwarded to the engine.
///
/// Their meaning is defined by the engine; the session only carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub prefer_low_latency_audio: bool,
    #[serde(default)]
    pub virtual_file_system: bool,
    #[serde(default)]
    pub microphone: bool,
    #[serde(default)]
    pub skip_duplicate_frames: bool,
    #[serde(default)]
    pub ambient_mode: bool,
    #[serde(default = "default_true")]
    pub rumble: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            prefer_low_latency_audio: true,
            virtual_file_system: false,
            microphone: false,
            skip_duplicate_frames: false,
            ambient_mode: false,
            rumble: true,
        }
    }
}

/// Frozen per-session descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    engine_path: PathBuf,
    system_dir: PathBuf,
    saves_dir: PathBuf,
    variables: Vec<Variable>,
    shader: ShaderConfig,
    refresh_rate: f32,
    language: String,
    gles_version: u8,
    features: FeatureFlags,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Path of the engine library to load
    pub fn engine_path(&self) -> &Path {
        &self.engine_path
    }

    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    pub fn saves_dir(&self) -> &Path {
        &self.saves_dir
    }

    /// Initial variables, keys unique, in insertion order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn shader(&self) -> &ShaderConfig {
        &self.shader
    }

    pub fn refresh_rate(&self) -> f32 {
        self.refresh_rate
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// GLES major version the host context provides
    pub fn gles_version(&self) -> u8 {
        self.gles_version
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    engine_path: Option<PathBuf>,
    system_dir: Option<PathBuf>,
    saves_dir: Option<PathBuf>,
    variables: Vec<Variable>,
    shader: Option<ShaderConfig>,
    refresh_rate: Option<f32>,
    language: Option<String>,
    gles_version: Option<u8>,
    features: FeatureFlags,
}

impl SessionConfigBuilder {
    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.engine_path = Some(path.into());
        self
    }

    pub fn system_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_dir = Some(path.into());
        self
    }

    pub fn saves_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.saves_dir = Some(path.into());
        self
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn variables(mut self, variables: impl IntoIterator<Item = Variable>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn shader(mut self, shader: ShaderConfig) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn refresh_rate(mut self, hz: f32) -> Self {
        self.refresh_rate = Some(hz);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn gles_version(mut self, version: u8) -> Self {
        self.gles_version = Some(version);
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let engine_path = required_path(self.engine_path, "engine_path")?;
        let system_dir = required_path(self.system_dir, "system_dir")?;
        let saves_dir = required_path(self.saves_dir, "saves_dir")?;

        check_variable_keys(&self.variables)?;

        let refresh_rate = self.refresh_rate.unwrap_or(DEFAULT_REFRESH_RATE);
        if !refresh_rate.is_finite() || refresh_rate <= 0.0 {
            return Err(ConfigError::InvalidRefreshRate(refresh_rate));
        }

        let language = self
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if !is_language_tag(&language) {
            return Err(ConfigError::InvalidLanguage(language));
        }

        let gles_version = self.gles_version.unwrap_or(SUPPORTED_GLES_VERSIONS[0]);
        if !SUPPORTED_GLES_VERSIONS.contains(&gles_version) {
            return Err(ConfigError::UnsupportedGlesVersion(gles_version));
        }

        Ok(SessionConfig {
            engine_path,
            system_dir,
            saves_dir,
            variables: self.variables,
            shader: self.shader.unwrap_or_default(),
            refresh_rate,
            language,
            gles_version,
            features: self.features,
        })
    }
}

fn check_variable_keys(variables: &[Variable]) -> Result<(), ConfigError> {
    let mut seen = hashbrown::HashSet::with_capacity(variables.len());
    for variable in variables {
        if variable.key.trim().is_empty() {
            return Err(ConfigError::EmptyVariableKey);
        }
        if !seen.insert(variable.key.as_str()) {
            return Err(ConfigError::DuplicateVariable(variable.key.clone()));
        }
    }
    Ok(())
}

fn required_path(value: Option<PathBuf>, field: &'static str) -> Result<PathBuf, ConfigError> {
    let path = value.ok_or(ConfigError::MissingField(field))?;
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyField(field));
    }
    Ok(path)
}

/// Accepts `en`, `pt_BR`, `zh-Hant` style tags.
fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split(['-', '_']);
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok
        && parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}
