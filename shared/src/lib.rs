//! Shared types for the retroview frontend.
//!
//! These are the plain data types exchanged between a host application and
//! `retroview-core`: engine variables, controller descriptions, shader
//! configuration, the input vocabulary and the closed set of error codes
//! surfaced to the host.

pub mod controller;
pub mod error_codes;
pub mod input;
pub mod shader;
pub mod variable;

pub use controller::Controller;
pub use error_codes::ErrorCode;
pub use input::{JoypadButton, KeyAction, MotionSource};
pub use shader::{ParamSpec, ParamValue, ShaderConfig, ShaderError, ShaderKind};
pub use variable::Variable;
