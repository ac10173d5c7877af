//! Shared test utilities for unit tests and downstream hosts
//!
//! [`RecordingEngine`] logs every engine entry point it receives and counts
//! calls that overlap in time, which must never happen behind a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use retroview_shared::{Controller, ShaderConfig, ShaderKind, Variable};

use crate::config::SessionConfig;
use crate::engine::{Engine, EngineLoader, RumbleEvent, Viewport};
use crate::error::EngineError;
use crate::game::GameSource;
use crate::input::InputEvent;

// ============================================================================
// Call log
// ============================================================================

/// One engine entry point invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ContextCreated,
    ContextReset,
    Resize(u32, u32),
    SetViewport(Viewport),
    LoadGame(GameSource),
    RunFrame,
    Reset,
    SerializeState,
    UnserializeState(Vec<u8>),
    SerializeSram,
    UnserializeSram(Vec<u8>),
    SetCheat {
        index: u32,
        enabled: bool,
        code: String,
    },
    ResetCheats,
    DiskCount,
    CurrentDisk,
    SetDisk(u32),
    Variables,
    SetVariable(Variable),
    Controllers,
    SetControllerType(u32, u32),
    SetShader(ShaderKind),
    ApplyInput(InputEvent),
    SetAudioEnabled(bool),
    SetRumbleEnabled(bool),
    TakeRumble,
    TakeGeometryChange,
    AspectRatio,
    Release,
}

/// Shared log behind a [`RecordingLoader`] and its engines.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<EngineCall>>,
    in_call: AtomicBool,
    overlaps: AtomicUsize,
    loads: AtomicUsize,
}

struct CallGuard<'a>(&'a AtomicBool);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Recorder {
    fn enter(&self, call: EngineCall) -> CallGuard<'_> {
        if self.in_call.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        // Widen the window so an unserialized caller would be caught
        std::thread::yield_now();
        self.calls.lock().push(call);
        CallGuard(&self.in_call)
    }

    /// Snapshot of all calls so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    pub fn releases(&self) -> usize {
        self.count(|c| *c == EngineCall::Release)
    }

    pub fn frames(&self) -> usize {
        self.count(|c| *c == EngineCall::RunFrame)
    }

    /// Calls logged after the first `skip`.
    pub fn calls_since(&self, skip: usize) -> Vec<EngineCall> {
        self.calls.lock().iter().skip(skip).cloned().collect()
    }

    /// Number of calls that started while another was still running.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Number of engine instances handed out by the loader.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Scripted responses for [`RecordingEngine`].
#[derive(Debug, Clone, Default)]
pub struct RecordingBehavior {
    /// Returned by the loader instead of an engine
    pub fail_create: Option<EngineError>,
    /// Returned by every `load_game`
    pub fail_load_game: Option<EngineError>,
    /// Returned by every `run_frame`
    pub fail_run_frame: Option<EngineError>,
    /// Disk count; `None` means no disk control
    pub disks: Option<u32>,
    /// Variables the engine recognizes
    pub variables: Vec<Variable>,
    /// Raise one rumble event per frame
    pub rumble_each_frame: bool,
}

const STATE_MAGIC: [u8; 4] = *b"RECS";

/// Engine that records calls and keeps a tiny machine state.
///
/// State is a frame counter, serialized as `RECS` plus the little-endian
/// counter. SRAM is a fixed 16 bytes.
pub struct RecordingEngine {
    recorder: Arc<Recorder>,
    behavior: RecordingBehavior,
    frame: u64,
    variables: Vec<Variable>,
    disk: u32,
    sram: [u8; 16],
}

impl RecordingEngine {
    pub fn new(recorder: Arc<Recorder>, behavior: RecordingBehavior) -> Self {
        let variables = behavior.variables.clone();
        Self {
            recorder,
            behavior,
            frame: 0,
            variables,
            disk: 0,
            sram: [0; 16],
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = STATE_MAGIC.to_vec();
        out.extend_from_slice(&self.frame.to_le_bytes());
        out
    }
}

impl Engine for RecordingEngine {
    fn context_created(&mut self) {
        let _call = self.recorder.enter(EngineCall::ContextCreated);
    }

    fn context_reset(&mut self) {
        let _call = self.recorder.enter(EngineCall::ContextReset);
    }

    fn resize(&mut self, width: u32, height: u32) {
        let _call = self.recorder.enter(EngineCall::Resize(width, height));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        let _call = self.recorder.enter(EngineCall::SetViewport(viewport));
    }

    fn load_game(&mut self, source: &GameSource) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::LoadGame(source.clone()));
        match &self.behavior.fail_load_game {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn run_frame(&mut self) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::RunFrame);
        if let Some(err) = &self.behavior.fail_run_frame {
            return Err(err.clone());
        }
        self.frame += 1;
        self.sram[(self.frame % 16) as usize] = self.frame as u8;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::Reset);
        self.frame = 0;
        Ok(())
    }

    fn serialize_state(&mut self) -> Result<Vec<u8>, EngineError> {
        let _call = self.recorder.enter(EngineCall::SerializeState);
        Ok(self.encode())
    }

    fn unserialize_state(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let _call = self
            .recorder
            .enter(EngineCall::UnserializeState(data.to_vec()));
        let Some(counter) = data.strip_prefix(&STATE_MAGIC) else {
            return Err(EngineError::Serialization("bad magic".into()));
        };
        let counter: [u8; 8] = counter
            .try_into()
            .map_err(|_| EngineError::Serialization("bad length".into()))?;
        self.frame = u64::from_le_bytes(counter);
        Ok(())
    }

    fn serialize_sram(&mut self) -> Result<Vec<u8>, EngineError> {
        let _call = self.recorder.enter(EngineCall::SerializeSram);
        Ok(self.sram.to_vec())
    }

    fn unserialize_sram(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::UnserializeSram(data.to_vec()));
        self.sram = data
            .try_into()
            .map_err(|_| EngineError::Serialization("SRAM is 16 bytes".into()))?;
        Ok(())
    }

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::SetCheat {
            index,
            enabled,
            code: code.to_string(),
        });
        if code.starts_with('!') {
            return Err(EngineError::Cheat(code.to_string()));
        }
        Ok(())
    }

    fn reset_cheats(&mut self) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::ResetCheats);
        Ok(())
    }

    fn disk_count(&self) -> Option<u32> {
        let _call = self.recorder.enter(EngineCall::DiskCount);
        self.behavior.disks
    }

    fn current_disk(&self) -> u32 {
        let _call = self.recorder.enter(EngineCall::CurrentDisk);
        self.disk
    }

    fn set_disk(&mut self, index: u32) -> Result<(), EngineError> {
        let _call = self.recorder.enter(EngineCall::SetDisk(index));
        self.disk = index;
        Ok(())
    }

    fn variables(&self) -> Vec<Variable> {
        let _call = self.recorder.enter(EngineCall::Variables);
        self.variables.clone()
    }

    fn set_variable(&mut self, variable: &Variable) {
        let _call = self.recorder.enter(EngineCall::SetVariable(variable.clone()));
        if let Some(slot) = self.variables.iter_mut().find(|v| v.key == variable.key) {
            slot.value = variable.value.clone();
        }
    }

    fn controllers(&self) -> Vec<Vec<Controller>> {
        let _call = self.recorder.enter(EngineCall::Controllers);
        vec![vec![Controller::new(1, "RetroPad")]]
    }

    fn set_controller_type(&mut self, port: u32, controller_id: u32) -> bool {
        let _call = self
            .recorder
            .enter(EngineCall::SetControllerType(port, controller_id));
        port == 0 && controller_id == 1
    }

    fn set_shader(&mut self, shader: &ShaderConfig) {
        let _call = self.recorder.enter(EngineCall::SetShader(shader.kind()));
    }

    fn apply_input(&mut self, event: &InputEvent) {
        let _call = self.recorder.enter(EngineCall::ApplyInput(*event));
    }

    fn set_audio_enabled(&mut self, enabled: bool) {
        let _call = self.recorder.enter(EngineCall::SetAudioEnabled(enabled));
    }

    fn set_rumble_enabled(&mut self, enabled: bool) {
        let _call = self.recorder.enter(EngineCall::SetRumbleEnabled(enabled));
    }

    fn take_rumble(&mut self) -> Vec<RumbleEvent> {
        let _call = self.recorder.enter(EngineCall::TakeRumble);
        if self.behavior.rumble_each_frame {
            vec![RumbleEvent {
                port: 0,
                strength_weak: 0.5,
                strength_strong: 0.5,
            }]
        } else {
            Vec::new()
        }
    }

    fn take_geometry_change(&mut self) -> bool {
        let _call = self.recorder.enter(EngineCall::TakeGeometryChange);
        false
    }

    fn aspect_ratio(&self) -> f32 {
        let _call = self.recorder.enter(EngineCall::AspectRatio);
        4.0 / 3.0
    }

    fn release(&mut self) {
        let _call = self.recorder.enter(EngineCall::Release);
    }
}

/// Loader handing out [`RecordingEngine`]s that share one [`Recorder`].
#[derive(Debug, Clone, Default)]
pub struct RecordingLoader {
    recorder: Arc<Recorder>,
    behavior: RecordingBehavior,
}

impl RecordingLoader {
    pub fn new(behavior: RecordingBehavior) -> Self {
        Self {
            recorder: Arc::default(),
            behavior,
        }
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        Arc::clone(&self.recorder)
    }
}

impl EngineLoader for RecordingLoader {
    fn load(&self, _config: &SessionConfig) -> Result<Box<dyn Engine>, EngineError> {
        if let Some(err) = &self.behavior.fail_create {
            return Err(err.clone());
        }
        self.recorder.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingEngine::new(
            self.recorder(),
            self.behavior.clone(),
        )))
    }
}

// ============================================================================
// Configs
// ============================================================================

/// Minimal valid configuration for tests.
pub fn test_config() -> SessionConfig {
    test_config_builder()
        .build()
        .unwrap_or_else(|e| panic!("test config must be valid: {e}"))
}

pub fn test_config_builder() -> crate::config::SessionConfigBuilder {
    SessionConfig::builder()
        .engine_path("/cores/test_libretro.so")
        .system_dir("/data/system")
        .saves_dir("/data/saves")
}
