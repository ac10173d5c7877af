//! Session controller
//!
//! One [`SessionController`] owns one engine instance from `create` to
//! `destroy`. Every engine entry point runs under a single `parking_lot`
//! mutex, so the host lifecycle thread and the render thread calling
//! [`SessionController::step`] never touch the engine at the same time.
//!
//! Each command is checked against [`Operation::allowed_states`] before the
//! engine is reached. A rejected command returns [`RetroError::InvalidState`]
//! and leaves both the session and the engine untouched.

mod input_queue;
mod state;

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use parking_lot::Mutex;
use retroview_shared::{Controller, ErrorCode, ShaderConfig, Variable};

use crate::config::SessionConfig;
use crate::engine::{Engine, EngineLoader, RumbleEvent, Viewport};
use crate::error::{EngineError, Result, RetroError};
use crate::game::GameSource;
use crate::input::{RawKeyEvent, RawMotionSample, RawTouchEvent};

pub use input_queue::{INPUT_QUEUE_CAPACITY, InputSender};
pub use state::{Operation, SessionState};

use input_queue::{InputBatch, StateMirror};

/// Fastest fast-forward multiplier accepted by [`SessionController::set_frame_speed`].
pub const MAX_FRAME_SPEED: u32 = 8;

/// Outcome of one [`SessionController::step`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Engine frames advanced (0 when the session is not running)
    pub frames: u32,
    /// Rumble requests raised during those frames, empty when rumble is off
    pub rumble: Vec<RumbleEvent>,
    /// Output geometry changed; the host should recompute its layout
    pub geometry_changed: bool,
}

struct Inner {
    state: SessionState,
    mirror: StateMirror,
    loader: Arc<dyn EngineLoader>,
    config: Option<SessionConfig>,
    engine: Option<Box<dyn Engine>>,
    input_rx: Receiver<InputBatch>,

    viewport: Option<(u32, u32)>,
    /// Variable updates received before a game was loaded
    pending_variables: Vec<Variable>,
    shader: ShaderConfig,
    frame_speed: u32,
    audio_enabled: bool,
    rumble_enabled: bool,
    /// Set once the engine reported the host GL context as unusable
    gl_incompatible: Option<(u8, u8)>,
    frame_count: u64,
}

fn engine_slot(
    slot: &mut Option<Box<dyn Engine>>,
    op: Operation,
) -> Result<&mut (dyn Engine + 'static)> {
    slot.as_deref_mut()
        .ok_or_else(|| RetroError::Generic(format!("{op}: no engine instance")))
}

fn engine_failure(op: Operation, err: EngineError, fallback: ErrorCode) -> RetroError {
    tracing::error!(operation = %op, error = %err, "Engine command failed");
    RetroError::from_engine(err, fallback)
}

impl Inner {
    fn guard(&self, op: Operation) -> Result<()> {
        if op.is_allowed_in(self.state) {
            Ok(())
        } else {
            tracing::warn!(operation = %op, state = %self.state, "Rejected command");
            Err(RetroError::InvalidState {
                operation: op,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, op: Operation) {
        let Some(next) = self.state.after(op) else {
            return;
        };
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, operation = %op, "Session state changed");
            self.state = next;
            self.mirror.store(next);
        }
    }

    /// Guard `op` and hand out the engine.
    fn engine_for(&mut self, op: Operation) -> Result<&mut (dyn Engine + 'static)> {
        self.guard(op)?;
        engine_slot(&mut self.engine, op)
    }

    fn create(&mut self, config: SessionConfig) -> Result<()> {
        self.guard(Operation::Create)?;

        let engine = self
            .loader
            .load(&config)
            .map_err(|e| engine_failure(Operation::Create, e, ErrorCode::LoadLibrary))?;

        tracing::info!(engine = %config.engine_path().display(), "Session created");
        self.shader = config.shader().clone();
        self.rumble_enabled = config.features().rumble;
        self.engine = Some(engine);
        self.config = Some(config);
        self.transition(Operation::Create);
        Ok(())
    }

    fn surface_created(&mut self) -> Result<()> {
        let first = self.state == SessionState::Created;
        let viewport = self.viewport;
        let engine = self.engine_for(Operation::SurfaceCreated)?;

        if first {
            engine.context_created();
            if let Some((width, height)) = viewport {
                engine.resize(width, height);
            }
            self.transition(Operation::SurfaceCreated);
        } else {
            tracing::debug!("Rendering context replaced");
            engine.context_reset();
        }
        Ok(())
    }

    fn surface_changed(&mut self, width: u32, height: u32) -> Result<()> {
        let has_surface = self.state.has_surface();
        let engine = self.engine_for(Operation::SurfaceChanged)?;
        if has_surface {
            engine.resize(width, height);
        }
        self.viewport = Some((width, height));
        Ok(())
    }

    fn load_game(&mut self, source: GameSource) -> Result<()> {
        self.guard(Operation::LoadGame)?;

        if let Some((required, available)) = self.gl_incompatible {
            tracing::warn!("Load refused, host GL context is incompatible");
            return Err(RetroError::GlIncompatible {
                required,
                available,
            });
        }

        let virtual_fs = self
            .config
            .as_ref()
            .is_some_and(|c| c.features().virtual_file_system);
        if let Err(reason) = source.validate(virtual_fs) {
            tracing::warn!(%reason, "Rejected game source");
            return Err(RetroError::GameLoad(reason));
        }

        let engine = engine_slot(&mut self.engine, Operation::LoadGame)?;
        if let Err(e) = engine.load_game(&source) {
            let err = engine_failure(Operation::LoadGame, e, ErrorCode::LoadGame);
            if let RetroError::GlIncompatible {
                required,
                available,
            } = err
            {
                self.gl_incompatible = Some((required, available));
            }
            return Err(err);
        }

        for variable in self.pending_variables.drain(..) {
            engine.set_variable(&variable);
        }
        engine.set_shader(&self.shader);
        engine.set_audio_enabled(self.audio_enabled);
        engine.set_rumble_enabled(self.rumble_enabled);

        // Presses made before the game existed must not reach it
        let stale = self.input_rx.try_iter().count();
        if stale > 0 {
            tracing::debug!(stale, "Discarded input queued before load");
        }

        tracing::info!(source = %source.describe(), "Game loaded");
        self.transition(Operation::LoadGame);
        Ok(())
    }

    fn step(&mut self) -> Result<FrameReport> {
        let mut report = FrameReport::default();
        if self.state != SessionState::Running {
            return Ok(report);
        }
        let Some(engine) = self.engine.as_deref_mut() else {
            return Ok(report);
        };

        while let Ok(batch) = self.input_rx.try_recv() {
            for event in &batch {
                engine.apply_input(event);
            }
        }

        for _ in 0..self.frame_speed {
            if let Err(e) = engine.run_frame() {
                self.frame_count += u64::from(report.frames);
                return Err(engine_failure(Operation::Step, e, ErrorCode::Generic));
            }
            report.frames += 1;
        }
        self.frame_count += u64::from(report.frames);

        let rumble = engine.take_rumble();
        if self.rumble_enabled {
            report.rumble = rumble;
        }
        report.geometry_changed = engine.take_geometry_change();
        Ok(report)
    }

    fn restore(&mut self, op: Operation, data: &[u8]) -> Result<()> {
        let engine = self.engine_for(op)?;
        if data.is_empty() {
            tracing::warn!(operation = %op, "Refusing to restore empty buffer");
            return Err(RetroError::Serialization("empty buffer".into()));
        }
        let result = match op {
            Operation::RestoreSram => engine.unserialize_sram(data),
            _ => engine.unserialize_state(data),
        };
        result.map_err(|e| engine_failure(op, e, ErrorCode::Serialization))
    }

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> Result<()> {
        let engine = self.engine_for(Operation::SetCheat)?;
        if code.trim().is_empty() || code.contains('\0') {
            tracing::warn!(index, "Rejected malformed cheat code");
            return Err(RetroError::Cheat(format!("malformed code for cheat {index}")));
        }
        engine
            .set_cheat(index, enabled, code)
            .map_err(|e| engine_failure(Operation::SetCheat, e, ErrorCode::Cheat))
    }

    fn change_disk(&mut self, index: u32) -> Result<()> {
        let state = self.state;
        let engine = self.engine_for(Operation::ChangeDisk)?;
        let Some(count) = engine.disk_count() else {
            tracing::warn!("Game has no disk control");
            return Err(RetroError::InvalidState {
                operation: Operation::ChangeDisk,
                state,
            });
        };
        if index >= count {
            return Err(RetroError::InvalidArgument(format!(
                "disk {index} out of range (game has {count})"
            )));
        }
        engine
            .set_disk(index)
            .map_err(|e| engine_failure(Operation::ChangeDisk, e, ErrorCode::Generic))
    }

    fn update_variable(&mut self, variable: Variable) -> Result<()> {
        self.guard(Operation::UpdateVariable)?;
        if self.state.has_game() {
            let engine = self.engine_for(Operation::UpdateVariable)?;
            engine.set_variable(&variable);
            return Ok(());
        }

        tracing::debug!(key = %variable.key, "Buffering variable until game load");
        match self
            .pending_variables
            .iter_mut()
            .find(|v| v.key == variable.key)
        {
            Some(slot) => *slot = variable,
            None => self.pending_variables.push(variable),
        }
        Ok(())
    }

    fn variables(&mut self) -> Result<Vec<Variable>> {
        self.guard(Operation::GetVariables)?;
        if self.state.has_game() {
            return Ok(self.engine_for(Operation::GetVariables)?.variables());
        }

        // No game yet: what the engine will see at load
        let mut variables = self
            .config
            .as_ref()
            .map(|c| c.variables().to_vec())
            .unwrap_or_default();
        for pending in &self.pending_variables {
            match variables.iter_mut().find(|v| v.key == pending.key) {
                Some(slot) => slot.value = pending.value.clone(),
                None => variables.push(pending.clone()),
            }
        }
        Ok(variables)
    }

    fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            tracing::debug!("Session already destroyed");
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            engine.release();
        }
        while self.input_rx.try_recv().is_ok() {}
        self.pending_variables.clear();
        self.transition(Operation::Destroy);
        tracing::info!(frames = self.frame_count, "Session destroyed");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            tracing::debug!("Releasing engine of dropped session");
            engine.release();
        }
    }
}

/// Handle to one emulation session.
///
/// Cloning is cheap and every clone drives the same session, so one clone can
/// live on the render thread while another receives lifecycle callbacks.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    input: InputSender,
    mirror: StateMirror,
}

impl SessionController {
    pub fn new(loader: impl EngineLoader + 'static) -> Self {
        Self::with_loader(Arc::new(loader))
    }

    /// Create a session around a shared loader.
    pub fn with_loader(loader: Arc<dyn EngineLoader>) -> Self {
        let mirror = StateMirror::new(SessionState::Uninitialized);
        let (input, input_rx) = input_queue::channel(mirror.clone());
        let inner = Inner {
            state: SessionState::Uninitialized,
            mirror: mirror.clone(),
            loader,
            config: None,
            engine: None,
            input_rx,
            viewport: None,
            pending_variables: Vec::new(),
            shader: ShaderConfig::default(),
            frame_speed: 1,
            audio_enabled: true,
            rumble_enabled: true,
            gl_incompatible: None,
            frame_count: 0,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            input,
            mirror,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Frozen configuration, once created.
    pub fn config(&self) -> Option<SessionConfig> {
        self.inner.lock().config.clone()
    }

    /// Total engine frames advanced by this session.
    pub fn frame_count(&self) -> u64 {
        self.inner.lock().frame_count
    }

    /// Handle for delivering input without taking the session lock.
    pub fn input(&self) -> InputSender {
        self.input.clone()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Load the engine for `config`.
    ///
    /// On failure the session stays uninitialized and may be created again.
    pub fn create(&self, config: SessionConfig) -> Result<()> {
        self.inner.lock().create(config)
    }

    /// The host rendering context exists.
    ///
    /// The first call notifies the engine that a context was created. Later
    /// calls mean the host replaced the context and the engine is reset.
    pub fn surface_created(&self) -> Result<()> {
        self.inner.lock().surface_created()
    }

    pub fn surface_changed(&self, width: u32, height: u32) -> Result<()> {
        self.inner.lock().surface_changed(width, height)
    }

    /// Restrict the game image to part of the surface.
    pub fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::SetViewport)?;
        if !viewport.is_valid() {
            tracing::warn!(?viewport, "Rejected viewport");
            return Err(RetroError::InvalidArgument(format!(
                "viewport {viewport:?} is not inside the surface"
            )));
        }
        inner.engine_for(Operation::SetViewport)?.set_viewport(viewport);
        Ok(())
    }

    /// Load a game. Allowed once, from `SurfaceReady`.
    ///
    /// A [`RetroError::GameLoad`] keeps the session in `SurfaceReady` so a
    /// different source can be tried.
    pub fn load_game(&self, source: impl Into<GameSource>) -> Result<()> {
        self.inner.lock().load_game(source.into())
    }

    /// Drain queued input and advance the engine.
    ///
    /// Does nothing unless the session is running.
    pub fn step(&self) -> Result<FrameReport> {
        self.inner.lock().step()
    }

    /// Halt stepping. The rendering context is kept.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::Pause)?;
        inner.transition(Operation::Pause);
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::Resume)?;
        inner.transition(Operation::Resume);
        Ok(())
    }

    /// Release the engine and end the session.
    ///
    /// Callable from any state, any number of times.
    pub fn destroy(&self) {
        self.inner.lock().destroy();
    }

    // ------------------------------------------------------------------------
    // Game commands
    // ------------------------------------------------------------------------

    pub fn reset(&self) -> Result<()> {
        self.inner
            .lock()
            .engine_for(Operation::Reset)?
            .reset()
            .map_err(|e| engine_failure(Operation::Reset, e, ErrorCode::Generic))
    }

    /// Opaque snapshot of the running game.
    pub fn serialize_state(&self) -> Result<Vec<u8>> {
        self.inner
            .lock()
            .engine_for(Operation::SerializeState)?
            .serialize_state()
            .map_err(|e| engine_failure(Operation::SerializeState, e, ErrorCode::Serialization))
    }

    /// Restore a snapshot taken by [`SessionController::serialize_state`].
    ///
    /// Bad bytes fail with [`RetroError::Serialization`] and the game keeps
    /// its prior state.
    pub fn restore_state(&self, data: &[u8]) -> Result<()> {
        self.inner.lock().restore(Operation::RestoreState, data)
    }

    pub fn serialize_sram(&self) -> Result<Vec<u8>> {
        self.inner
            .lock()
            .engine_for(Operation::SerializeSram)?
            .serialize_sram()
            .map_err(|e| engine_failure(Operation::SerializeSram, e, ErrorCode::Serialization))
    }

    pub fn restore_sram(&self, data: &[u8]) -> Result<()> {
        self.inner.lock().restore(Operation::RestoreSram, data)
    }

    pub fn set_cheat(&self, index: u32, enabled: bool, code: &str) -> Result<()> {
        self.inner.lock().set_cheat(index, enabled, code)
    }

    pub fn reset_cheats(&self) -> Result<()> {
        self.inner
            .lock()
            .engine_for(Operation::ResetCheats)?
            .reset_cheats()
            .map_err(|e| engine_failure(Operation::ResetCheats, e, ErrorCode::Cheat))
    }

    /// Swap the inserted disk of a multi-disk game.
    pub fn change_disk(&self, index: u32) -> Result<()> {
        self.inner.lock().change_disk(index)
    }

    /// Number of disks, 0 when the game has no disk control.
    pub fn available_disks(&self) -> Result<u32> {
        let mut inner = self.inner.lock();
        let engine = inner.engine_for(Operation::AvailableDisks)?;
        Ok(engine.disk_count().unwrap_or(0))
    }

    pub fn current_disk(&self) -> Result<u32> {
        let mut inner = self.inner.lock();
        let engine = inner.engine_for(Operation::CurrentDisk)?;
        Ok(match engine.disk_count() {
            Some(_) => engine.current_disk(),
            None => 0,
        })
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Set an engine variable.
    ///
    /// Before a game is loaded the update is buffered and applied right after
    /// the load. Keys the engine does not know are accepted and ignored.
    pub fn update_variable(&self, variable: Variable) -> Result<()> {
        self.inner.lock().update_variable(variable)
    }

    pub fn get_variables(&self) -> Result<Vec<Variable>> {
        self.inner.lock().variables()
    }

    /// Controller types supported by each port.
    pub fn get_controllers(&self) -> Result<Vec<Vec<Controller>>> {
        Ok(self
            .inner
            .lock()
            .engine_for(Operation::GetControllers)?
            .controllers())
    }

    pub fn set_controller_type(&self, port: u32, controller_id: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        let engine = inner.engine_for(Operation::SetControllerType)?;
        if !engine.set_controller_type(port, controller_id) {
            tracing::warn!(port, controller_id, "Engine ignored controller type");
        }
        Ok(())
    }

    /// Replace the active shader. Takes effect on the engine once a game runs.
    pub fn set_shader_config(&self, shader: ShaderConfig) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::SetShaderConfig)?;
        if inner.state.has_game() {
            inner.engine_for(Operation::SetShaderConfig)?.set_shader(&shader);
        }
        inner.shader = shader;
        Ok(())
    }

    /// Engine frames run per [`SessionController::step`], 1 to [`MAX_FRAME_SPEED`].
    pub fn set_frame_speed(&self, speed: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::SetFrameSpeed)?;
        if !(1..=MAX_FRAME_SPEED).contains(&speed) {
            tracing::warn!(speed, "Rejected frame speed");
            return Err(RetroError::InvalidArgument(format!(
                "frame speed {speed} outside 1..={MAX_FRAME_SPEED}"
            )));
        }
        inner.frame_speed = speed;
        Ok(())
    }

    pub fn set_audio_enabled(&self, enabled: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::SetAudioEnabled)?;
        if inner.state.has_game() {
            inner.engine_for(Operation::SetAudioEnabled)?.set_audio_enabled(enabled);
        }
        inner.audio_enabled = enabled;
        Ok(())
    }

    /// Forwarded to the engine once a game runs. Rumble events are also
    /// dropped from [`FrameReport`] while disabled.
    pub fn set_rumble_enabled(&self, enabled: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.guard(Operation::SetRumbleEnabled)?;
        if inner.state.has_game() {
            inner
                .engine_for(Operation::SetRumbleEnabled)?
                .set_rumble_enabled(enabled);
        }
        inner.rumble_enabled = enabled;
        Ok(())
    }

    pub fn aspect_ratio(&self) -> Result<f32> {
        Ok(self
            .inner
            .lock()
            .engine_for(Operation::AspectRatio)?
            .aspect_ratio())
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// See [`InputSender::on_key_event`].
    pub fn on_key_event(&self, raw: &RawKeyEvent) -> bool {
        self.input.on_key_event(raw)
    }

    pub fn on_motion_event(&self, raw: &RawMotionSample) -> bool {
        self.input.on_motion_event(raw)
    }

    pub fn on_touch_event(&self, raw: &RawTouchEvent) -> bool {
        self.input.on_touch_event(raw)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.mirror.load())
            .finish_non_exhaustive()
    }
}
