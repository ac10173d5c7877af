//! Normalized input vocabulary understood by the engine.

use serde::{Deserialize, Serialize};

/// Logical analog channel of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionSource {
    Dpad,
    AnalogLeft,
    AnalogRight,
    Pointer,
}

impl MotionSource {
    /// Wire id used by the engine contract.
    pub const fn id(self) -> u32 {
        match self {
            MotionSource::Dpad => 0,
            MotionSource::AnalogLeft => 1,
            MotionSource::AnalogRight => 2,
            MotionSource::Pointer => 3,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(MotionSource::Dpad),
            1 => Some(MotionSource::AnalogLeft),
            2 => Some(MotionSource::AnalogRight),
            3 => Some(MotionSource::Pointer),
            _ => None,
        }
    }

    /// Pointer coordinates live in [0, 1], every other source in [-1, 1].
    pub const fn range(self) -> (f32, f32) {
        match self {
            MotionSource::Pointer => (0.0, 1.0),
            _ => (-1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAction {
    Down,
    Up,
}

/// Joypad buttons, numbered after the libretro joypad ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum JoypadButton {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
    L2 = 12,
    R2 = 13,
    L3 = 14,
    R3 = 15,
}

impl JoypadButton {
    pub const ALL: [JoypadButton; 16] = [
        JoypadButton::B,
        JoypadButton::Y,
        JoypadButton::Select,
        JoypadButton::Start,
        JoypadButton::Up,
        JoypadButton::Down,
        JoypadButton::Left,
        JoypadButton::Right,
        JoypadButton::A,
        JoypadButton::X,
        JoypadButton::L,
        JoypadButton::R,
        JoypadButton::L2,
        JoypadButton::R2,
        JoypadButton::L3,
        JoypadButton::R3,
    ];

    pub const fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_source_ids_round_trip() {
        for source in [
            MotionSource::Dpad,
            MotionSource::AnalogLeft,
            MotionSource::AnalogRight,
            MotionSource::Pointer,
        ] {
            assert_eq!(MotionSource::from_id(source.id()), Some(source));
        }
        assert_eq!(MotionSource::from_id(4), None);
    }

    #[test]
    fn test_joypad_ids_match_libretro() {
        assert_eq!(JoypadButton::B.id(), 0);
        assert_eq!(JoypadButton::Start.id(), 3);
        assert_eq!(JoypadButton::A.id(), 8);
        assert_eq!(JoypadButton::R3.id(), 15);
        assert_eq!(JoypadButton::from_id(10), Some(JoypadButton::L));
        assert_eq!(JoypadButton::from_id(16), None);
    }
}
