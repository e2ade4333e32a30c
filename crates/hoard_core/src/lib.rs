//! # hoard_core - Hoard Core
//!
//! Shared primitives for every Hoard crate:
//! - **Identifiers**: actors, areas and canonical container identity keys
//! - **Scopes**: how far away a storage may be and still take part in a stash
//! - **Errors**: the programming-error taxonomy surfaced to callers
//!
//! Business outcomes (full containers, vetoed transfers, rejected items) are
//! never errors; they are reported as values by the crates that produce them.

pub mod error;
pub mod id;
pub mod scope;

pub use error::*;
pub use id::*;
pub use scope::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{HoardError, Result};
    pub use crate::id::{ActorId, AreaId, ContainerKey, ContainerKind, TilePos};
    pub use crate::scope::AccessibilityScope;
}
