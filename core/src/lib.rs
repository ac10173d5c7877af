//! Retroview Core - Session shell around a pluggable emulation engine
//!
//! This crate owns the rendering-surface lifecycle of one emulation session,
//! normalizes platform input and exposes the typed command surface a host
//! application drives. The emulation itself happens in an external engine
//! reached through the [`Engine`] trait.
//!
//! # Architecture
//!
//! - [`input`] - Pure translation of raw key, joystick and touch input
//! - [`SessionConfig`] - Immutable per-session descriptor, built and validated once
//! - [`SessionController`] - Lifecycle state machine and serialized command dispatch
//! - [`Engine`] / [`EngineLoader`] - Contract with the external engine
//! - [`HeadlessEngine`] - Deterministic engine without video or audio output

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod input;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConfigError, FeatureFlags, SessionConfig, SessionConfigBuilder, SessionFile};
pub use engine::{
    Engine, EngineLoader, HeadlessEngine, HeadlessLoader, HeadlessOptions, RumbleEvent, Viewport,
};
pub use error::{EngineError, Result, RetroError};
pub use game::{GameSource, VirtualFile};
pub use input::{InputEvent, KeyEvent, MotionEvent};
pub use session::{
    FrameReport, INPUT_QUEUE_CAPACITY, InputSender, MAX_FRAME_SPEED, Operation, SessionController,
    SessionState,
};

// Re-export shared types hosts need alongside the controller
pub use retroview_shared::{
    Controller, ErrorCode, JoypadButton, KeyAction, MotionSource, ParamValue, ShaderConfig,
    ShaderError, ShaderKind, Variable,
};
