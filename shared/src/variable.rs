//! Engine-defined runtime options.

use serde::{Deserialize, Serialize};

/// A runtime option exposed by the engine for host configuration.
///
/// The set of legal values is defined by the engine and opaque here. Keys
/// the engine does not recognize are accepted and have no effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl Variable {
    /// Create a variable without a description.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
