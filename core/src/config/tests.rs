use std::io::Write;

use retroview_shared::{ParamValue, ShaderConfig, ShaderKind, Variable};

use super::*;

fn base() -> SessionConfigBuilder {
    SessionConfig::builder()
        .engine_path("/cores/sample_libretro.so")
        .system_dir("/data/system")
        .saves_dir("/data/saves")
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_defaults_applied() {
    let config = base().build().unwrap();
    assert_eq!(config.refresh_rate(), DEFAULT_REFRESH_RATE);
    assert_eq!(config.language(), "en");
    assert_eq!(config.gles_version(), 2);
    assert_eq!(config.shader().kind(), ShaderKind::Default);
    assert!(config.variables().is_empty());
    assert_eq!(config.features(), FeatureFlags::default());
    assert!(config.features().rumble);
    assert!(!config.features().virtual_file_system);
}

#[test]
fn test_missing_required_fields_fail_at_build() {
    let err = SessionConfig::builder()
        .system_dir("/s")
        .saves_dir("/v")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField("engine_path")));

    let err = SessionConfig::builder()
        .engine_path("/e")
        .saves_dir("/v")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField("system_dir")));

    let err = SessionConfig::builder()
        .engine_path("/e")
        .system_dir("/s")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField("saves_dir")));
}

#[test]
fn test_empty_path_rejected() {
    let err = base().engine_path("").build().unwrap_err();
    assert!(matches!(err, ConfigError::EmptyField("engine_path")));
}

#[test]
fn test_duplicate_variable_keys_rejected() {
    let err = base()
        .variable(Variable::new("region", "ntsc"))
        .variable(Variable::new("region", "pal"))
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateVariable(key) if key == "region"));
}

#[test]
fn test_empty_variable_key_rejected() {
    let err = base().variable(Variable::new(" ", "x")).build().unwrap_err();
    assert!(matches!(err, ConfigError::EmptyVariableKey));
}

#[test]
fn test_variables_keep_insertion_order() {
    let config = base()
        .variables([Variable::new("b", "1"), Variable::new("a", "2")])
        .build()
        .unwrap();
    let keys: Vec<_> = config.variables().iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, ["b", "a"]);
}

#[test]
fn test_checked_variables_move_into_config() {
    let config = base()
        .variable(Variable::new("region", "pal").with_description("Video region"))
        .variable(Variable::new("frameskip", "1"))
        .refresh_rate(50.0)
        .build()
        .unwrap();
    assert_eq!(config.variables().len(), 2);
    assert_eq!(config.variables()[0].value, "pal");
    assert_eq!(config.variables()[1].key, "frameskip");
    assert_eq!(config.refresh_rate(), 50.0);
}

#[test]
fn test_refresh_rate_validation() {
    for bad in [0.0, -60.0, f32::NAN, f32::INFINITY] {
        let err = base().refresh_rate(bad).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRefreshRate(_)));
    }
    assert_eq!(base().refresh_rate(59.94).build().unwrap().refresh_rate(), 59.94);
}

#[test]
fn test_gles_version_validation() {
    assert_eq!(base().gles_version(3).build().unwrap().gles_version(), 3);
    let err = base().gles_version(1).build().unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedGlesVersion(1)));
}

#[test]
fn test_language_validation() {
    for good in ["en", "pt_BR", "zh-Hant", "deu"] {
        assert!(base().language(good).build().is_ok(), "{good}");
    }
    for bad in ["", "e", "english-", "en US"] {
        assert!(
            matches!(base().language(bad).build(), Err(ConfigError::InvalidLanguage(_))),
            "{bad}"
        );
    }
}

// ============================================================================
// Session files
// ============================================================================

const FULL_FILE: &str = r#"
engine = "/cores/sample_libretro.so"
system_dir = "/data/system"
saves_dir = "/data/saves"
refresh_rate = 50.0
language = "fr"
gles_version = 3

[features]
virtual_file_system = true
rumble = false

[shader]
kind = "cut3"
params = { static_sharpness = 0.7, use_dynamic_blend = false, unknown = 1.0 }

[[variables]]
key = "region"
value = "pal"
description = "Console region"
"#;

#[test]
fn test_parse_full_file() {
    let config = SessionFile::parse(FULL_FILE).unwrap().into_config().unwrap();
    assert_eq!(config.refresh_rate(), 50.0);
    assert_eq!(config.language(), "fr");
    assert_eq!(config.gles_version(), 3);

    let features = config.features();
    assert!(features.virtual_file_system);
    assert!(!features.rumble);
    // Unspecified flags keep their defaults
    assert!(features.prefer_low_latency_audio);

    assert_eq!(config.shader().kind(), ShaderKind::Cut3);
    assert_eq!(config.shader().float("static_sharpness"), Some(0.7));
    assert_eq!(config.shader().bool("use_dynamic_blend"), Some(false));
    assert_eq!(config.shader().param("unknown"), None);

    assert_eq!(
        config.variables(),
        [Variable::new("region", "pal").with_description("Console region")]
    );
}

#[test]
fn test_minimal_file_matches_builder() {
    let toml = r#"
engine = "/cores/sample_libretro.so"
system_dir = "/data/system"
saves_dir = "/data/saves"
"#;
    let from_file = SessionFile::parse(toml).unwrap().into_config().unwrap();
    assert_eq!(from_file, base().build().unwrap());
}

#[test]
fn test_file_missing_engine_fails() {
    let toml = "system_dir = \"/s\"\nsaves_dir = \"/v\"\n";
    let err = SessionFile::parse(toml).unwrap().into_config().unwrap_err();
    assert!(matches!(err, ConfigError::MissingField("engine_path")));
}

#[test]
fn test_file_unknown_shader_kind() {
    let toml = r#"
engine = "/e"
system_dir = "/s"
saves_dir = "/v"

[shader]
kind = "bloom"
"#;
    let err = SessionFile::parse(toml).unwrap().into_config().unwrap_err();
    assert!(matches!(err, ConfigError::Shader(_)));
}

#[test]
fn test_file_shader_wrong_param_type() {
    let toml = r#"
engine = "/e"
system_dir = "/s"
saves_dir = "/v"

[shader]
kind = "cut"
params = { sharpness_min = true }
"#;
    let err = SessionFile::parse(toml).unwrap().into_config().unwrap_err();
    assert!(matches!(err, ConfigError::Shader(_)));
}

#[test]
fn test_parse_error_reported() {
    let err = SessionFile::parse("engine = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_load_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SESSION_FILE_NAME);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "engine = \"cores/sample.so\"").unwrap();
    writeln!(file, "system_dir = \"/abs/system\"").unwrap();
    writeln!(file, "saves_dir = \"saves\"").unwrap();
    drop(file);

    let config = SessionFile::load(&path).unwrap().into_config().unwrap();
    assert_eq!(config.engine_path(), dir.path().join("cores/sample.so"));
    assert_eq!(config.system_dir(), std::path::Path::new("/abs/system"));
    assert_eq!(config.saves_dir(), dir.path().join("saves"));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SessionFile::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_builder_override_after_file() {
    let config = SessionFile::parse(FULL_FILE)
        .unwrap()
        .into_builder()
        .unwrap()
        .shader(ShaderConfig::new(ShaderKind::Crt))
        .build()
        .unwrap();
    assert_eq!(config.shader().kind(), ShaderKind::Crt);
}

#[test]
fn test_param_value_untagged() {
    let section: ShaderSection = toml::from_str("kind = \"cut\"\nparams = { sharpness_max = 0.25 }").unwrap();
    assert_eq!(section.params.get("sharpness_max"), Some(&ParamValue::Float(0.25)));
}
