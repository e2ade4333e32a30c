//! Accessibility scopes

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// How far a stash may reach for its destinations
///
/// The variants are ordered; each of `Inventory`, `Location` and `World`
/// includes everything the previous one reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessibilityScope {
    /// Reaches nothing
    Disabled,
    /// Inherit the configured default
    Default,
    /// Containers carried by the actor
    Inventory,
    /// Plus containers in the actor's current area
    Location,
    /// Plus containers in every area the actor can reach
    World,
}

impl Default for AccessibilityScope {
    fn default() -> Self {
        Self::Default
    }
}

impl AccessibilityScope {
    /// Replace `Default` with `fallback`
    ///
    /// A fallback of `Default` resolves to `Location`.
    pub fn resolve(self, fallback: AccessibilityScope) -> AccessibilityScope {
        match (self, fallback) {
            (Self::Default, Self::Default) => Self::Location,
            (Self::Default, other) => other,
            (scope, _) => scope,
        }
    }

    /// Whether anything at all is reachable
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Whether this (resolved) scope reaches containers found at `tier`
    pub fn reaches(self, tier: AccessibilityScope) -> bool {
        self.is_enabled() && tier >= Self::Inventory && tier <= self
    }
}

impl fmt::Display for AccessibilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Default => write!(f, "default"),
            Self::Inventory => write!(f, "inventory"),
            Self::Location => write!(f, "location"),
            Self::World => write!(f, "world"),
        }
    }
}

impl FromStr for AccessibilityScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "default" => Ok(Self::Default),
            "inventory" => Ok(Self::Inventory),
            "location" => Ok(Self::Location),
            "world" => Ok(Self::World),
            other => Err(format!("Unknown accessibility scope: {}", other)),
        }
    }
}
