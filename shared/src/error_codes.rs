//! Error codes surfaced to the host.

use std::fmt;

/// Closed enumeration of error codes a host can observe.
///
/// The numeric values are part of the host contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    LoadLibrary,
    LoadGame,
    GlNotCompatible,
    Serialization,
    Cheat,
    Generic,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::LoadLibrary,
        ErrorCode::LoadGame,
        ErrorCode::GlNotCompatible,
        ErrorCode::Serialization,
        ErrorCode::Cheat,
        ErrorCode::Generic,
    ];

    /// Numeric value as seen by the host.
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::LoadLibrary => 0,
            ErrorCode::LoadGame => 1,
            ErrorCode::GlNotCompatible => 2,
            ErrorCode::Serialization => 3,
            ErrorCode::Cheat => 4,
            ErrorCode::Generic => -1,
        }
    }

    /// Inverse of [`ErrorCode::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::LoadLibrary => "LOAD_LIBRARY",
            ErrorCode::LoadGame => "LOAD_GAME",
            ErrorCode::GlNotCompatible => "GL_NOT_COMPATIBLE",
            ErrorCode::Serialization => "SERIALIZATION",
            ErrorCode::Cheat => "CHEAT",
            ErrorCode::Generic => "GENERIC",
        }
    }

    /// Whether the session can keep going after this error.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::LoadLibrary | ErrorCode::GlNotCompatible | ErrorCode::Generic
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::LoadLibrary.code(), 0);
        assert_eq!(ErrorCode::LoadGame.code(), 1);
        assert_eq!(ErrorCode::GlNotCompatible.code(), 2);
        assert_eq!(ErrorCode::Serialization.code(), 3);
        assert_eq!(ErrorCode::Cheat.code(), 4);
        assert_eq!(ErrorCode::Generic.code(), -1);
    }

    #[test]
    fn test_from_code() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(5), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::Cheat.to_string(), "CHEAT (4)");
        assert_eq!(ErrorCode::Generic.to_string(), "GENERIC (-1)");
    }
}
