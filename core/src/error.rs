//! Error types surfaced by the session controller

use retroview_shared::ErrorCode;

use crate::session::{Operation, SessionState};

/// Failure reported by an engine implementation.
///
/// Engines classify their own failures; the controller maps them onto
/// [`RetroError`] with the operation's fallback code for [`EngineError::Other`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("failed to load engine library: {0}")]
    LoadLibrary(String),

    #[error("failed to load game: {0}")]
    LoadGame(String),

    #[error("GLES {required} required, host provides GLES {available}")]
    GlNotCompatible { required: u8, available: u8 },

    #[error("state serialization failed: {0}")]
    Serialization(String),

    #[error("cheat rejected: {0}")]
    Cheat(String),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by [`SessionController`](crate::SessionController) commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetroError {
    #[error("engine load failed: {0}")]
    EngineLoad(String),

    #[error("game load failed: {0}")]
    GameLoad(String),

    #[error("engine requires GLES {required}, host provides GLES {available}")]
    GlIncompatible { required: u8, available: u8 },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("cheat failed: {0}")]
    Cheat(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} is not allowed while {state}")]
    InvalidState {
        operation: Operation,
        state: SessionState,
    },

    #[error("{0}")]
    Generic(String),
}

impl RetroError {
    /// Stable numeric code for host-facing error reporting.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EngineLoad(_) => ErrorCode::LoadLibrary,
            Self::GameLoad(_) => ErrorCode::LoadGame,
            Self::GlIncompatible { .. } => ErrorCode::GlNotCompatible,
            Self::Serialization(_) => ErrorCode::Serialization,
            Self::Cheat(_) => ErrorCode::Cheat,
            Self::InvalidArgument(_) | Self::InvalidState { .. } | Self::Generic(_) => {
                ErrorCode::Generic
            }
        }
    }

    /// Whether the session cannot continue after this error.
    ///
    /// Rejected commands never are: the session is left exactly as it was.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidArgument(_) | Self::InvalidState { .. } => false,
            other => other.code().is_fatal(),
        }
    }

    /// Map an engine failure, using `fallback` for unclassified errors.
    pub fn from_engine(err: EngineError, fallback: ErrorCode) -> Self {
        match err {
            EngineError::LoadLibrary(msg) => Self::EngineLoad(msg),
            EngineError::LoadGame(msg) => Self::GameLoad(msg),
            EngineError::GlNotCompatible {
                required,
                available,
            } => Self::GlIncompatible {
                required,
                available,
            },
            EngineError::Serialization(msg) => Self::Serialization(msg),
            EngineError::Cheat(msg) => Self::Cheat(msg),
            EngineError::Other(msg) => match fallback {
                ErrorCode::LoadLibrary => Self::EngineLoad(msg),
                ErrorCode::LoadGame => Self::GameLoad(msg),
                ErrorCode::Serialization => Self::Serialization(msg),
                ErrorCode::Cheat => Self::Cheat(msg),
                ErrorCode::GlNotCompatible | ErrorCode::Generic => Self::Generic(msg),
            },
        }
    }
}

pub type Result<T, E = RetroError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(RetroError::EngineLoad(String::new()).code().code(), 0);
        assert_eq!(RetroError::GameLoad(String::new()).code().code(), 1);
        assert_eq!(
            RetroError::GlIncompatible {
                required: 3,
                available: 2
            }
            .code()
            .code(),
            2
        );
        assert_eq!(RetroError::Serialization(String::new()).code().code(), 3);
        assert_eq!(RetroError::Cheat(String::new()).code().code(), 4);
        assert_eq!(RetroError::Generic(String::new()).code().code(), -1);
        let rejected = RetroError::InvalidState {
            operation: Operation::Pause,
            state: SessionState::Created,
        };
        assert_eq!(rejected.code(), ErrorCode::Generic);
        assert!(!rejected.is_fatal());
        assert!(!RetroError::InvalidArgument(String::new()).is_fatal());
        assert_eq!(rejected.to_string(), "pause is not allowed while created");
    }

    #[test]
    fn test_fatality() {
        assert!(RetroError::EngineLoad(String::new()).is_fatal());
        assert!(RetroError::Generic(String::new()).is_fatal());
        assert!(!RetroError::GameLoad(String::new()).is_fatal());
        assert!(!RetroError::Cheat(String::new()).is_fatal());
    }

    #[test]
    fn test_from_engine_fallback() {
        let err = RetroError::from_engine(EngineError::Other("bad".into()), ErrorCode::Serialization);
        assert_eq!(err, RetroError::Serialization("bad".into()));

        let err = RetroError::from_engine(EngineError::Other("bad".into()), ErrorCode::Generic);
        assert_eq!(err, RetroError::Generic("bad".into()));

        // Classified errors ignore the fallback
        let err = RetroError::from_engine(EngineError::Cheat("x".into()), ErrorCode::Generic);
        assert_eq!(err, RetroError::Cheat("x".into()));
    }
}
