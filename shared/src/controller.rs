//! Controller descriptions reported by the engine.

use serde::{Deserialize, Serialize};

/// One controller type supported on an input port.
///
/// The engine enumerates these per port after a game is loaded. A query
/// always returns a fresh snapshot, the host never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Controller {
    /// Engine device id passed back to `set_controller_type`
    pub id: u32,
    pub description: String,
}

impl Controller {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}
