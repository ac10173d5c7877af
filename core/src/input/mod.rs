//! Event translation
//!
//! Turns platform input (gamepad keys, joystick axes, touch coordinates) into
//! the small vocabulary the engine understands. Translation is pure: the same
//! raw input always produces the same events, and no dead-zone, debouncing or
//! filtering is applied here.

mod keymap;

use retroview_shared::{JoypadButton, KeyAction, MotionSource};
use smallvec::SmallVec;

pub use keymap::{PlatformKey, map_platform_key};

/// Port used for touch input, which carries no controller number.
pub const TOUCH_PORT: u32 = 0;

/// Pointer coordinate meaning "no contact".
pub const POINTER_RELEASED: f32 = -1.0;

/// A normalized digital input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub port: u32,
    pub action: KeyAction,
    pub button: JoypadButton,
}

impl KeyEvent {
    /// Engine key code of the button.
    pub fn key_code(&self) -> u32 {
        self.button.id()
    }
}

/// A normalized analog input.
///
/// Analog sources are in [-1, 1]. Pointer coordinates are in [0, 1], except
/// for a release which carries [`POINTER_RELEASED`] on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    pub port: u32,
    pub source: MotionSource,
    pub x: f32,
    pub y: f32,
}

impl MotionEvent {
    pub fn pointer_release(port: u32) -> Self {
        Self {
            port,
            source: MotionSource::Pointer,
            x: POINTER_RELEASED,
            y: POINTER_RELEASED,
        }
    }

    pub fn is_pointer_release(&self) -> bool {
        self.source == MotionSource::Pointer && self.x < 0.0 && self.y < 0.0
    }
}

/// Anything the engine receives as controller input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    Motion(MotionEvent),
}

impl InputEvent {
    pub fn port(&self) -> u32 {
        match self {
            InputEvent::Key(e) => e.port,
            InputEvent::Motion(e) => e.port,
        }
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

impl From<MotionEvent> for InputEvent {
    fn from(event: MotionEvent) -> Self {
        InputEvent::Motion(event)
    }
}

/// Key press or release as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// 1-based controller number, 0 or negative when the device is not a controller
    pub controller_number: i32,
    pub action: KeyAction,
    pub key_code: i32,
}

/// Device class a motion sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    Joystick,
    Touchscreen,
    Mouse,
    Other(u32),
}

/// Axis values of one joystick motion sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JoystickAxes {
    pub hat_x: f32,
    pub hat_y: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rz: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMotionSample {
    pub controller_number: i32,
    pub source: RawSource,
    pub axes: JoystickAxes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
}

/// Touch in view pixels together with the view size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTouchEvent {
    pub action: TouchAction,
    pub x: f32,
    pub y: f32,
    pub view_width: f32,
    pub view_height: f32,
}

fn port_of(controller_number: i32) -> Option<u32> {
    u32::try_from(controller_number).ok()?.checked_sub(1)
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Clamp an analog axis into [-1, 1].
pub fn normalize_axis(value: f32) -> f32 {
    finite_or_zero(value).clamp(-1.0, 1.0)
}

/// Clamp a pointer coordinate into [0, 1].
pub fn normalize_pointer(value: f32) -> f32 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

fn analog(port: u32, source: MotionSource, x: f32, y: f32) -> MotionEvent {
    MotionEvent {
        port,
        source,
        x: normalize_axis(x),
        y: normalize_axis(y),
    }
}

/// Translate a gamepad key.
///
/// Returns `None` for keys that are not gamepad buttons or that come from a
/// device without a controller number. Such events are not consumed and the
/// host should let its own key handling run.
pub fn translate_key(raw: &RawKeyEvent) -> Option<KeyEvent> {
    let port = port_of(raw.controller_number)?;
    let button = map_platform_key(raw.key_code)?;
    Some(KeyEvent {
        port,
        action: raw.action,
        button,
    })
}

/// Translate one joystick sample.
///
/// A joystick sample yields three events in fixed order: d-pad (hat axes),
/// left stick (x/y) and right stick (z/rz). Other sources yield nothing.
pub fn translate_motion(raw: &RawMotionSample) -> SmallVec<[MotionEvent; 3]> {
    let mut events = SmallVec::new();
    if raw.source != RawSource::Joystick {
        return events;
    }
    let Some(port) = port_of(raw.controller_number) else {
        return events;
    };

    let axes = &raw.axes;
    events.push(analog(port, MotionSource::Dpad, axes.hat_x, axes.hat_y));
    events.push(analog(port, MotionSource::AnalogLeft, axes.x, axes.y));
    events.push(analog(port, MotionSource::AnalogRight, axes.z, axes.rz));
    events
}

/// Translate a touch on the view into pointer coordinates.
pub fn translate_touch(raw: &RawTouchEvent) -> Option<MotionEvent> {
    match raw.action {
        TouchAction::Up => Some(MotionEvent::pointer_release(TOUCH_PORT)),
        TouchAction::Down | TouchAction::Move => {
            let width = finite_or_zero(raw.view_width);
            let height = finite_or_zero(raw.view_height);
            if width <= 0.0 || height <= 0.0 {
                return None;
            }
            Some(MotionEvent {
                port: TOUCH_PORT,
                source: MotionSource::Pointer,
                x: normalize_pointer(raw.x / width),
                y: normalize_pointer(raw.y / height),
            })
        }
    }
}
