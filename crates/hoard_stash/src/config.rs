//! Stash configuration
//!
//! Configuration is owned by whoever hosts the engine; this module only
//! defines the shapes and a JSON round trip.
//!
//! # Example Config File
//!
//! ```json
//! {
//!   "default_scope": "location",
//!   "look_inside_held": true
//! }
//! ```

use hoard_core::AccessibilityScope;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Scope used wherever a request or container says `Default`
    pub default_scope: AccessibilityScope,
    /// Also offer containers sitting in other containers' held slots
    pub look_inside_held: bool,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            default_scope: AccessibilityScope::Location,
            look_inside_held: false,
        }
    }
}

impl StashConfig {
    /// Set the default scope
    pub fn with_default_scope(mut self, scope: AccessibilityScope) -> Self {
        self.default_scope = scope;
        self
    }

    /// Look inside held slots
    pub fn with_held(mut self, enabled: bool) -> Self {
        self.look_inside_held = enabled;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded stash config from {}", path.as_ref().display());
        Ok(config)
    }

    /// The scope a `Default` request resolves to
    pub fn resolve(&self, scope: AccessibilityScope) -> AccessibilityScope {
        scope.resolve(self.default_scope)
    }
}

/// Per-container settings supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Farthest tier this container still accepts stashes from
    pub stash_range: AccessibilityScope,
    /// Destination priority, higher is filled first
    pub priority: i32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            stash_range: AccessibilityScope::Default,
            priority: 0,
        }
    }
}

impl StorageOptions {
    /// Set the stash range
    pub fn with_range(mut self, range: AccessibilityScope) -> Self {
        self.stash_range = range;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Options of a container that never takes part in stashing
    pub fn excluded() -> Self {
        Self::default().with_range(AccessibilityScope::Disabled)
    }
}
