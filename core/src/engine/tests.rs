use retroview_shared::{JoypadButton, KeyAction, MotionSource, ShaderConfig, ShaderKind, Variable};

use super::*;
use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::game::{GameSource, VirtualFile};
use crate::input::{InputEvent, KeyEvent, MotionEvent};

fn config() -> SessionConfig {
    SessionConfig::builder()
        .engine_path("headless")
        .system_dir("/tmp/system")
        .saves_dir("/tmp/saves")
        .variable(Variable::new("headless_region", "pal"))
        .build()
        .unwrap()
}

fn loaded(options: HeadlessOptions) -> HeadlessEngine {
    let mut engine = HeadlessEngine::new(options, &config());
    engine.context_created();
    engine.load_game(&GameSource::Bytes(vec![1, 2, 3, 4])).unwrap();
    engine
}

fn press(port: u32, button: JoypadButton) -> InputEvent {
    InputEvent::Key(KeyEvent {
        port,
        action: KeyAction::Down,
        button,
    })
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_loader_applies_initial_variables() {
    let engine = HeadlessLoader::default().load(&config()).unwrap();
    let vars = engine.variables();
    let region = vars.iter().find(|v| v.key == "headless_region").unwrap();
    assert_eq!(region.value, "pal");
}

#[test]
fn test_load_requires_gles_version() {
    let options = HeadlessOptions {
        min_gles_version: 3,
        ..Default::default()
    };
    let mut engine = HeadlessEngine::new(options, &config());
    engine.context_created();
    let err = engine.load_game(&GameSource::Bytes(vec![1])).unwrap_err();
    assert_eq!(
        err,
        EngineError::GlNotCompatible {
            required: 3,
            available: 2
        }
    );
}

#[test]
fn test_load_missing_file() {
    let mut engine = HeadlessEngine::new(HeadlessOptions::default(), &config());
    engine.context_created();
    let err = engine
        .load_game(&GameSource::from("/definitely/not/here.rom"))
        .unwrap_err();
    assert!(matches!(err, EngineError::LoadGame(_)));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.rom");
    std::fs::write(&path, [0xAAu8; 16]).unwrap();

    let mut engine = HeadlessEngine::new(HeadlessOptions::default(), &config());
    engine.context_created();
    engine.load_game(&GameSource::Path(path)).unwrap();
    assert!(engine.take_geometry_change());
    assert!(!engine.take_geometry_change());
}

#[test]
fn test_frame_requires_game() {
    let mut engine = HeadlessEngine::new(HeadlessOptions::default(), &config());
    assert!(engine.run_frame().is_err());
    assert_eq!(engine.frame(), 0);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_round_trip() {
    let mut engine = loaded(HeadlessOptions::default());
    for _ in 0..10 {
        engine.run_frame().unwrap();
    }
    let snapshot = engine.serialize_state().unwrap();

    for _ in 0..5 {
        engine.run_frame().unwrap();
    }
    assert_ne!(engine.serialize_state().unwrap(), snapshot);

    engine.unserialize_state(&snapshot).unwrap();
    assert_eq!(engine.frame(), 10);
    assert_eq!(engine.serialize_state().unwrap(), snapshot);
}

#[test]
fn test_snapshot_restores_sram_cheats_and_ports() {
    let mut engine = loaded(HeadlessOptions::default());
    engine.set_cheat(3, true, "0020-0077").unwrap();
    assert!(engine.set_controller_type(1, CONTROLLER_ANALOG));
    engine.apply_input(&InputEvent::Motion(MotionEvent {
        port: 0,
        source: MotionSource::AnalogLeft,
        x: 0.25,
        y: -1.0,
    }));
    for _ in 0..10 {
        engine.run_frame().unwrap();
    }
    let snapshot = engine.serialize_state().unwrap();
    let sram = engine.serialize_sram().unwrap();

    engine.reset_cheats().unwrap();
    assert!(engine.set_controller_type(1, CONTROLLER_JOYPAD));
    engine.apply_input(&InputEvent::Motion(MotionEvent {
        port: 0,
        source: MotionSource::AnalogLeft,
        x: 0.0,
        y: 0.0,
    }));
    for _ in 0..10 {
        engine.run_frame().unwrap();
    }
    assert_ne!(engine.serialize_sram().unwrap(), sram);

    engine.unserialize_state(&snapshot).unwrap();
    assert_eq!(engine.serialize_sram().unwrap(), sram);
    assert_eq!(engine.motion(0, MotionSource::AnalogLeft), Some((0.25, -1.0)));
    assert_eq!(engine.serialize_state().unwrap(), snapshot);

    // Restored cheat keeps patching
    engine.run_frame().unwrap();
    assert_eq!(engine.serialize_sram().unwrap()[0x20], 0x77);
}

#[test]
fn test_snapshot_with_foreign_sram_size_rejected() {
    let mut small = HeadlessEngine::new(
        HeadlessOptions {
            sram_size: 16,
            ..Default::default()
        },
        &config(),
    );
    small.context_created();
    small.load_game(&GameSource::Bytes(vec![1, 2, 3, 4])).unwrap();
    let snapshot = small.serialize_state().unwrap();

    let mut engine = loaded(HeadlessOptions::default());
    assert!(matches!(
        engine.unserialize_state(&snapshot),
        Err(EngineError::Serialization(_))
    ));
    assert_eq!(engine.frame(), 0);
}

#[test]
fn test_corrupted_snapshot_rejected_without_apply() {
    let mut engine = loaded(HeadlessOptions::default());
    engine.run_frame().unwrap();
    let snapshot = engine.serialize_state().unwrap();

    let mut corrupted = snapshot.clone();
    corrupted[10] ^= 0xFF;
    assert!(matches!(
        engine.unserialize_state(&corrupted),
        Err(EngineError::Serialization(_))
    ));
    assert!(matches!(
        engine.unserialize_state(&snapshot[..20]),
        Err(EngineError::Serialization(_))
    ));
    assert_eq!(engine.serialize_state().unwrap(), snapshot);
}

#[test]
fn test_snapshot_from_other_game_rejected() {
    let mut a = loaded(HeadlessOptions::default());
    let snapshot = a.serialize_state().unwrap();

    let mut b = HeadlessEngine::new(HeadlessOptions::default(), &config());
    b.context_created();
    b.load_game(&GameSource::Bytes(vec![9, 9])).unwrap();
    assert!(matches!(
        b.unserialize_state(&snapshot),
        Err(EngineError::Serialization(_))
    ));
}

#[test]
fn test_input_changes_state() {
    let mut idle = loaded(HeadlessOptions::default());
    let mut pressed = loaded(HeadlessOptions::default());
    pressed.apply_input(&press(0, JoypadButton::A));
    assert_eq!(pressed.buttons(0), 1 << JoypadButton::A.id());

    idle.run_frame().unwrap();
    pressed.run_frame().unwrap();
    assert_ne!(idle.serialize_state().unwrap(), pressed.serialize_state().unwrap());
}

#[test]
fn test_motion_recorded_and_out_of_range_port_ignored() {
    let mut engine = loaded(HeadlessOptions::default());
    engine.apply_input(&InputEvent::Motion(MotionEvent {
        port: 1,
        source: MotionSource::AnalogRight,
        x: 0.5,
        y: -0.5,
    }));
    engine.apply_input(&press(7, JoypadButton::B));
    assert_eq!(engine.motion(1, MotionSource::AnalogRight), Some((0.5, -0.5)));
    assert_eq!(engine.buttons(0), 0);
}

// ============================================================================
// SRAM, cheats, disks
// ============================================================================

#[test]
fn test_sram_round_trip_and_size_check() {
    let mut engine = loaded(HeadlessOptions::default());
    let mut sram = engine.serialize_sram().unwrap();
    sram[0] = 0x42;
    engine.unserialize_sram(&sram).unwrap();
    assert_eq!(engine.serialize_sram().unwrap(), sram);

    assert!(matches!(
        engine.unserialize_sram(&[1, 2, 3]),
        Err(EngineError::Serialization(_))
    ));
}

#[test]
fn test_cheat_codes() {
    let mut engine = loaded(HeadlessOptions::default());
    engine.set_cheat(0, true, "0010-00FF").unwrap();
    engine.set_cheat(1, true, "0011-0001+0012-0002").unwrap();
    engine.run_frame().unwrap();
    let sram = engine.serialize_sram().unwrap();
    assert_eq!(sram[0x10], 0xFF);
    assert_eq!(sram[0x11], 0x01);
    assert_eq!(sram[0x12], 0x02);

    for bad in ["", "nonsense", "12-34", "GGGG-0000", "0000-00000"] {
        assert!(
            matches!(engine.set_cheat(2, true, bad), Err(EngineError::Cheat(_))),
            "{bad}"
        );
    }
    engine.reset_cheats().unwrap();
}

#[test]
fn test_disks_from_virtual_files() {
    let mut engine = HeadlessEngine::new(HeadlessOptions::default(), &config());
    engine.context_created();
    engine
        .load_game(&GameSource::VirtualFiles(vec![
            VirtualFile::new("disc1.bin", vec![1u8]),
            VirtualFile::new("disc2.bin", vec![2u8]),
        ]))
        .unwrap();
    assert_eq!(engine.disk_count(), Some(2));
    engine.take_geometry_change();

    engine.set_disk(1).unwrap();
    assert_eq!(engine.current_disk(), 1);
    assert!(engine.take_geometry_change());
    assert!(engine.set_disk(2).is_err());
}

#[test]
fn test_no_disk_control_for_single_image() {
    let mut engine = loaded(HeadlessOptions::default());
    assert_eq!(engine.disk_count(), None);
    assert!(engine.set_disk(0).is_err());
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_unknown_variable_ignored() {
    let mut engine = loaded(HeadlessOptions::default());
    let before = engine.variables();
    engine.set_variable(&Variable::new("unknown_key", "x"));
    assert_eq!(engine.variables(), before);

    engine.set_variable(&Variable::new("headless_frameskip", "2"));
    assert!(
        engine
            .variables()
            .iter()
            .any(|v| v.key == "headless_frameskip" && v.value == "2")
    );
}

#[test]
fn test_controller_types() {
    let mut engine = loaded(HeadlessOptions::default());
    assert_eq!(engine.controllers().len(), PORT_COUNT);
    assert!(engine.set_controller_type(1, CONTROLLER_ANALOG));
    assert!(!engine.set_controller_type(1, 99));
    assert!(!engine.set_controller_type(5, CONTROLLER_JOYPAD));
}

#[test]
fn test_rumble_interval() {
    let mut engine = loaded(HeadlessOptions {
        rumble_interval: Some(2),
        ..Default::default()
    });
    engine.run_frame().unwrap();
    assert!(engine.take_rumble().is_empty());
    engine.run_frame().unwrap();
    assert_eq!(engine.take_rumble().len(), 1);
    assert!(engine.take_rumble().is_empty());
}

#[test]
fn test_rumble_toggle() {
    let mut engine = loaded(HeadlessOptions {
        rumble_interval: Some(1),
        ..Default::default()
    });
    engine.set_rumble_enabled(false);
    engine.run_frame().unwrap();
    assert!(engine.take_rumble().is_empty());

    engine.set_rumble_enabled(true);
    engine.run_frame().unwrap();
    assert_eq!(engine.take_rumble().len(), 1);
}

#[test]
fn test_shader_and_reset() {
    let mut engine = loaded(HeadlessOptions::default());
    engine.set_shader(&ShaderConfig::new(ShaderKind::Lcd));
    assert_eq!(engine.shader().kind(), ShaderKind::Lcd);

    engine.run_frame().unwrap();
    engine.reset().unwrap();
    assert_eq!(engine.frame(), 0);
}
