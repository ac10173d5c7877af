//! Engine contract
//!
//! The emulation core is an external collaborator. The session controller
//! owns exactly one [`Engine`] between `create` and `destroy` and reaches it
//! only through this trait, always under the session lock.

mod headless;
#[cfg(test)]
mod tests;

use retroview_shared::{Controller, ShaderConfig, Variable};

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::game::GameSource;
use crate::input::InputEvent;

pub use headless::{
    CONTROLLER_ANALOG, CONTROLLER_JOYPAD, HeadlessEngine, HeadlessLoader, HeadlessOptions, PORT_COUNT,
};

/// Rumble request raised by the game for one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RumbleEvent {
    pub port: u32,
    /// Weak motor strength, 0.0..=1.0
    pub strength_weak: f32,
    /// Strong motor strength, 0.0..=1.0
    pub strength_strong: f32,
}

/// Region of the surface the game image is drawn into, in normalized
/// surface coordinates with the origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// The whole surface.
    pub const FULL: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Non-empty and inside the unit square.
    pub fn is_valid(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0
            && self.y + self.height <= 1.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}

/// One engine instance.
///
/// Implementations may assume calls never overlap and that game-scoped
/// operations only arrive after a successful [`Engine::load_game`].
pub trait Engine: Send {
    /// Rendering context became available for the first time.
    fn context_created(&mut self);

    /// Host replaced the rendering context; GPU resources must be rebuilt.
    fn context_reset(&mut self);

    fn resize(&mut self, width: u32, height: u32);

    /// Draw the game into a sub-rectangle of the surface.
    fn set_viewport(&mut self, viewport: Viewport);

    fn load_game(&mut self, source: &GameSource) -> Result<(), EngineError>;

    /// Advance the game by one frame.
    fn run_frame(&mut self) -> Result<(), EngineError>;

    fn reset(&mut self) -> Result<(), EngineError>;

    /// Opaque snapshot of the whole machine state.
    fn serialize_state(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Restore a snapshot. Must not partially apply on failure.
    fn unserialize_state(&mut self, data: &[u8]) -> Result<(), EngineError>;

    /// Battery-backed cartridge memory only.
    fn serialize_sram(&mut self) -> Result<Vec<u8>, EngineError>;

    fn unserialize_sram(&mut self, data: &[u8]) -> Result<(), EngineError>;

    fn set_cheat(&mut self, index: u32, enabled: bool, code: &str) -> Result<(), EngineError>;

    fn reset_cheats(&mut self) -> Result<(), EngineError>;

    /// Number of disk images, or `None` when the game has no disk control.
    fn disk_count(&self) -> Option<u32>;

    fn current_disk(&self) -> u32;

    fn set_disk(&mut self, index: u32) -> Result<(), EngineError>;

    /// Variables the engine currently recognizes, with their values.
    fn variables(&self) -> Vec<Variable>;

    /// Unrecognized keys are ignored.
    fn set_variable(&mut self, variable: &Variable);

    /// Supported controller types, one list per port.
    fn controllers(&self) -> Vec<Vec<Controller>>;

    /// Returns `false` when the port or controller id is unknown.
    fn set_controller_type(&mut self, port: u32, controller_id: u32) -> bool;

    fn set_shader(&mut self, shader: &ShaderConfig);

    fn apply_input(&mut self, event: &InputEvent);

    fn set_audio_enabled(&mut self, enabled: bool);

    /// While disabled no rumble requests are raised.
    fn set_rumble_enabled(&mut self, enabled: bool);

    /// Drain rumble requests raised since the last call.
    fn take_rumble(&mut self) -> Vec<RumbleEvent>;

    /// Whether output geometry changed since the last call.
    fn take_geometry_change(&mut self) -> bool;

    fn aspect_ratio(&self) -> f32;

    /// Free everything. No other call follows.
    fn release(&mut self);
}

/// Creates engine instances for a session.
pub trait EngineLoader: Send + Sync {
    fn load(&self, config: &SessionConfig) -> Result<Box<dyn Engine>, EngineError>;
}
