//! Simulate command - drive a full session on the headless engine
//!
//! Runs `create -> surface -> load -> step x N -> serialize -> restore ->
//! destroy` and reports what happened at each stage.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use retroview_core::{
    GameSource, HeadlessLoader, HeadlessOptions, MAX_FRAME_SPEED, SessionConfig, SessionController,
};

use crate::check::load_config;

/// Viewport reported to the engine before the first frame.
const VIEWPORT: (u32, u32) = (640, 480);

/// Arguments for the simulate command
#[derive(Args)]
pub struct SimulateArgs {
    /// Session file describing the engine and directories
    pub session_file: PathBuf,

    /// Game image to load
    #[arg(long)]
    pub game: PathBuf,

    /// Number of step() calls to run
    #[arg(long, default_value_t = 60)]
    pub frames: u32,

    /// Engine frames per step (fast forward), 1 to 8
    #[arg(long, default_value_t = 1)]
    pub speed: u32,

    /// Have the headless engine raise a rumble event every N frames
    #[arg(long)]
    pub rumble_interval: Option<u64>,
}

/// What a simulation run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub steps: u32,
    pub engine_frames: u64,
    pub rumble_events: usize,
    pub geometry_changes: u32,
    pub snapshot_len: usize,
    pub aspect_ratio: f32,
}

/// Execute the simulate command
pub fn execute(args: SimulateArgs) -> Result<()> {
    if !(1..=MAX_FRAME_SPEED).contains(&args.speed) {
        bail!("--speed must be between 1 and {MAX_FRAME_SPEED}");
    }
    let config = load_config(&args.session_file)?;
    let options = HeadlessOptions {
        min_gles_version: 2,
        rumble_interval: args.rumble_interval,
        ..Default::default()
    };

    println!("=== Simulating ===");
    println!("  Session: {}", args.session_file.display());
    println!("  Game:    {}", args.game.display());

    let report = run(config, options, GameSource::Path(args.game), args.frames, args.speed)?;

    println!("  Steps:           {}", report.steps);
    println!("  Engine frames:   {}", report.engine_frames);
    println!("  Rumble events:   {}", report.rumble_events);
    println!("  Geometry change: {}", report.geometry_changes);
    println!("  Aspect ratio:    {:.3}", report.aspect_ratio);
    println!("  Snapshot:        {} bytes, restore verified", report.snapshot_len);
    Ok(())
}

/// Drive one headless session to completion.
///
/// The session is always destroyed, also when a stage fails.
pub fn run(
    config: SessionConfig,
    options: HeadlessOptions,
    game: GameSource,
    steps: u32,
    speed: u32,
) -> Result<SimulationReport> {
    let session = SessionController::new(HeadlessLoader::new(options));
    let result = drive(&session, config, game, steps, speed);
    session.destroy();
    result
}

fn drive(
    session: &SessionController,
    config: SessionConfig,
    game: GameSource,
    steps: u32,
    speed: u32,
) -> Result<SimulationReport> {
    session.create(config).context("Failed to create session")?;
    session.surface_created()?;
    session.surface_changed(VIEWPORT.0, VIEWPORT.1)?;
    session.set_frame_speed(speed)?;
    session
        .load_game(game)
        .context("Failed to load game")?;
    tracing::info!(steps, speed, "Running frames");

    let mut rumble_events = 0;
    let mut geometry_changes = 0;
    for _ in 0..steps {
        let frame = session.step()?;
        rumble_events += frame.rumble.len();
        if frame.geometry_changed {
            geometry_changes += 1;
        }
    }

    let snapshot = session
        .serialize_state()
        .context("Failed to serialize state")?;
    session
        .restore_state(&snapshot)
        .context("Failed to restore state")?;
    if session.serialize_state()? != snapshot {
        bail!("Restored state differs from snapshot");
    }

    Ok(SimulationReport {
        steps,
        engine_frames: session.frame_count(),
        rumble_events,
        geometry_changes,
        snapshot_len: snapshot.len(),
        aspect_ratio: session.aspect_ratio()?,
    })
}

#[cfg(test)]
mod tests {
    use retroview_core::{RetroError, SessionState};

    use super::*;

    fn config(dir: &std::path::Path) -> SessionConfig {
        SessionConfig::builder()
            .engine_path(dir.join("headless.so"))
            .system_dir(dir.join("system"))
            .saves_dir(dir.join("saves"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_reports_frames() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("game.rom");
        std::fs::write(&game, b"ROM DATA").unwrap();

        let options = HeadlessOptions {
            rumble_interval: Some(10),
            ..Default::default()
        };
        let report = run(config(dir.path()), options, GameSource::Path(game), 30, 2).unwrap();
        assert_eq!(report.steps, 30);
        assert_eq!(report.engine_frames, 60);
        assert_eq!(report.rumble_events, 6);
        // Only the initial load changes geometry
        assert_eq!(report.geometry_changes, 1);
        assert!(report.snapshot_len > 0);
    }

    #[test]
    fn test_run_missing_game() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            config(dir.path()),
            HeadlessOptions::default(),
            GameSource::Path(dir.path().join("missing.rom")),
            1,
            1,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetroError>(),
            Some(RetroError::GameLoad(_))
        ));
    }

    #[test]
    fn test_session_destroyed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionController::new(HeadlessLoader::default());
        let result = drive(
            &session,
            config(dir.path()),
            GameSource::Bytes(Vec::new()),
            1,
            1,
        );
        assert!(result.is_err());
        session.destroy();
        assert_eq!(session.state(), SessionState::Destroyed);
    }
}
