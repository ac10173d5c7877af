//! Session files (`session.toml`)
//!
//! A session file is a TOML rendition of [`SessionConfig`]. It goes through
//! [`SessionConfigBuilder`] so the same validation applies to both paths.
//!
//! ```toml
//! engine = "cores/sample_libretro.so"
//! system_dir = "system"
//! saves_dir = "saves"
//! gles_version = 3
//!
//! [features]
//! rumble = false
//!
//! [shader]
//! kind = "cut3"
//! params = { static_sharpness = 0.7, edge_use_fast_luma = true }
//!
//! [[variables]]
//! key = "sample_region"
//! value = "ntsc"
//! ```

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use retroview_shared::{ParamValue, ShaderConfig, Variable};
use serde::Deserialize;

use super::{ConfigError, FeatureFlags, SessionConfig, SessionConfigBuilder};

/// File name looked up in [`config_dir`] when no path is given.
pub const SESSION_FILE_NAME: &str = "session.toml";

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/Retroview`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.retroview", "", "Retroview")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the session file, if a config directory exists.
pub fn default_session_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SESSION_FILE_NAME))
}

/// `[shader]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShaderSection {
    pub kind: String,
    #[serde(default)]
    pub params: HashMap<String, ParamValue>,
}

/// On-disk shape of a session configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionFile {
    pub engine: Option<PathBuf>,
    pub system_dir: Option<PathBuf>,
    pub saves_dir: Option<PathBuf>,
    pub refresh_rate: Option<f32>,
    pub language: Option<String>,
    pub gles_version: Option<u8>,
    #[serde(default)]
    pub features: FeatureFlags,
    pub shader: Option<ShaderSection>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl SessionFile {
    /// Parse a session file from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a session file.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            file.resolve_relative_to(base);
        }
        Ok(file)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.engine, &mut self.system_dir, &mut self.saves_dir]
            .into_iter()
            .flatten()
        {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        }
    }

    /// Convert into a builder, for callers that want to override fields.
    pub fn into_builder(self) -> Result<SessionConfigBuilder, ConfigError> {
        let mut builder = SessionConfig::builder()
            .features(self.features)
            .variables(self.variables);

        if let Some(path) = self.engine {
            builder = builder.engine_path(path);
        }
        if let Some(path) = self.system_dir {
            builder = builder.system_dir(path);
        }
        if let Some(path) = self.saves_dir {
            builder = builder.saves_dir(path);
        }
        if let Some(hz) = self.refresh_rate {
            builder = builder.refresh_rate(hz);
        }
        if let Some(language) = self.language {
            builder = builder.language(language);
        }
        if let Some(version) = self.gles_version {
            builder = builder.gles_version(version);
        }
        if let Some(shader) = self.shader {
            let config = ShaderConfig::from_name(
                &shader.kind,
                shader.params.iter().map(|(name, value)| (name.as_str(), *value)),
            )?;
            builder = builder.shader(config);
        }

        Ok(builder)
    }

    /// Validate into a frozen [`SessionConfig`].
    pub fn into_config(self) -> Result<SessionConfig, ConfigError> {
        self.into_builder()?.build()
    }
}
