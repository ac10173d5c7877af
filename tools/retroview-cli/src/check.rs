//! Check command - validate a session file without running anything

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use retroview_core::SessionConfig;
use retroview_core::config::{SessionFile, default_session_path};

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Session file to validate (defaults to session.toml in the config directory)
    pub session_file: Option<PathBuf>,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let path = match args.session_file {
        Some(path) => path,
        None => default_session_path()
            .context("No session file given and no config directory available")?,
    };

    let config = load_config(&path)?;
    println!("=== Session OK ===");
    println!("  File: {}", path.display());
    print!("{}", describe(&config));
    Ok(())
}

/// Load and validate a session file.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    let file = SessionFile::load(path)
        .with_context(|| format!("Failed to load session file {}", path.display()))?;
    file.into_config()
        .with_context(|| format!("Invalid session file {}", path.display()))
}

/// Human-readable summary of a frozen configuration.
pub fn describe(config: &SessionConfig) -> String {
    let mut out = String::new();
    let features = config.features();
    let mut line = |label: &str, value: String| {
        out.push_str(&format!("  {label:<14}{value}\n"));
    };

    line("Engine:", config.engine_path().display().to_string());
    line("System dir:", config.system_dir().display().to_string());
    line("Saves dir:", config.saves_dir().display().to_string());
    line("Refresh rate:", format!("{} Hz", config.refresh_rate()));
    line("Language:", config.language().to_string());
    line("GLES:", config.gles_version().to_string());
    line("Shader:", config.shader().kind().to_string());
    for (name, value) in config.shader().params() {
        line("", format!("{name} = {value:?}"));
    }
    line(
        "Features:",
        format!(
            "low_latency_audio={} virtual_fs={} microphone={} skip_dup={} ambient={} rumble={}",
            features.prefer_low_latency_audio,
            features.virtual_file_system,
            features.microphone,
            features.skip_duplicate_frames,
            features.ambient_mode,
            features.rumble,
        ),
    );
    line("Variables:", config.variables().len().to_string());
    for var in config.variables() {
        line("", format!("{} = {}", var.key, var.value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(
            &path,
            "engine = \"core.so\"\nsystem_dir = \"system\"\nsaves_dir = \"saves\"\n\n[[variables]]\nkey = \"region\"\nvalue = \"pal\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let text = describe(&config);
        assert!(text.contains("region = pal"));
        assert!(text.contains(&dir.path().join("core.so").display().to_string()));

        assert!(
            execute(CheckArgs {
                session_file: Some(path)
            })
            .is_ok()
        );
    }

    #[test]
    fn test_check_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "system_dir = \"s\"\nsaves_dir = \"v\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("engine_path"));
    }
}
