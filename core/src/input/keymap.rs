//! Platform gamepad key codes to joypad buttons

use retroview_shared::JoypadButton;

/// Gamepad key codes as reported by the platform input stack.
///
/// The values follow the Android `KeyEvent` numbering, which most gamepad
/// drivers and SDL-style mappers also emit.
pub struct PlatformKey;

impl PlatformKey {
    pub const DPAD_UP: i32 = 19;
    pub const DPAD_DOWN: i32 = 20;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const BUTTON_A: i32 = 96;
    pub const BUTTON_B: i32 = 97;
    pub const BUTTON_X: i32 = 99;
    pub const BUTTON_Y: i32 = 100;
    pub const BUTTON_L1: i32 = 102;
    pub const BUTTON_R1: i32 = 103;
    pub const BUTTON_L2: i32 = 104;
    pub const BUTTON_R2: i32 = 105;
    pub const BUTTON_THUMBL: i32 = 106;
    pub const BUTTON_THUMBR: i32 = 107;
    pub const BUTTON_START: i32 = 108;
    pub const BUTTON_SELECT: i32 = 109;
}

/// Map a platform key code onto a joypad button.
///
/// Platform face buttons are labelled by position the other way round from
/// the joypad layout: the bottom face button is `A` on the platform and `B`
/// on the joypad, the left one is `X` and `Y` respectively.
pub fn map_platform_key(key_code: i32) -> Option<JoypadButton> {
    let button = match key_code {
        PlatformKey::DPAD_UP => JoypadButton::Up,
        PlatformKey::DPAD_DOWN => JoypadButton::Down,
        PlatformKey::DPAD_LEFT => JoypadButton::Left,
        PlatformKey::DPAD_RIGHT => JoypadButton::Right,
        PlatformKey::BUTTON_A => JoypadButton::B,
        PlatformKey::BUTTON_B => JoypadButton::A,
        PlatformKey::BUTTON_X => JoypadButton::Y,
        PlatformKey::BUTTON_Y => JoypadButton::X,
        PlatformKey::BUTTON_L1 => JoypadButton::L,
        PlatformKey::BUTTON_R1 => JoypadButton::R,
        PlatformKey::BUTTON_L2 => JoypadButton::L2,
        PlatformKey::BUTTON_R2 => JoypadButton::R2,
        PlatformKey::BUTTON_THUMBL => JoypadButton::L3,
        PlatformKey::BUTTON_THUMBR => JoypadButton::R3,
        PlatformKey::BUTTON_START => JoypadButton::Start,
        PlatformKey::BUTTON_SELECT => JoypadButton::Select,
        _ => return None,
    };
    Some(button)
}
