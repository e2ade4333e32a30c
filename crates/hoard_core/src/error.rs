//! Error types for the core library
//!
//! Only API misuse ends up here. A full chest or a vetoed transfer is a
//! normal outcome and is reported through return values instead.

use thiserror::Error;

use crate::id::{ActorId, AreaId, ContainerKey};

/// The core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HoardError {
    /// The actor is not known to the world
    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),
    /// The area is not known to the world
    #[error("Unknown area: {0}")]
    UnknownArea(AreaId),
    /// A container was requested for a backend that no longer exists
    #[error("No storage backend for container {0}")]
    MissingBackend(ContainerKey),
    /// The key cannot address any storage
    #[error("Invalid container key {key}: {reason}")]
    InvalidKey { key: ContainerKey, reason: Box<str> },
}

impl HoardError {
    /// Build an [`HoardError::InvalidKey`]
    pub fn invalid_key(key: ContainerKey, reason: impl Into<Box<str>>) -> Self {
        Self::InvalidKey {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = core::result::Result<T, HoardError>;
