//! Identifiers for actors, areas and containers
//!
//! A [`ContainerKey`] is the canonical identity of a storage. Two container
//! views built independently are the same container iff their keys are equal,
//! regardless of how the caller reached the backend.

use core::cmp::Ordering;
use core::fmt;
use serde::{Deserialize, Serialize};

/// An actor (player or farmhand) that owns an inventory and stands in an area
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named area of the world (farm, house, cellar, ...)
///
/// Areas order by name, which is the canonical traversal order when a
/// stash reaches beyond the actor's current area.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId {
    name: Box<str>,
}

impl AreaId {
    /// Create a new area ID
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    /// Get the name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AreaId({:?})", self.name)
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for AreaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AreaId {
    fn from(s: String) -> Self {
        Self {
            name: s.into_boxed_str(),
        }
    }
}

/// Tile position inside an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// The backend family a container belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Placed in the open world
    Placed,
    /// Carried in an actor's inventory
    Carried,
    /// Sitting in the held-item slot of another container
    Held,
    /// The always-present household storage of an area
    Household,
}

/// Canonical identity of a storage backend
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKey {
    /// A container standing on a tile
    Placed { area: AreaId, pos: TilePos },
    /// A container in an actor's inventory slot
    Carried { owner: ActorId, slot: usize },
    /// A container held inside another container's slot
    Held { parent: Box<ContainerKey>, slot: usize },
    /// The household container of an area
    Household { area: AreaId },
}

impl ContainerKey {
    /// Key for a container placed at `(x, y)` in `area`
    pub fn placed(area: impl Into<AreaId>, x: i32, y: i32) -> Self {
        Self::Placed {
            area: area.into(),
            pos: TilePos::new(x, y),
        }
    }

    /// Key for a container carried in `owner`'s inventory slot
    pub fn carried(owner: ActorId, slot: usize) -> Self {
        Self::Carried { owner, slot }
    }

    /// Key for a container held in `slot` of `parent`
    pub fn held(parent: ContainerKey, slot: usize) -> Self {
        Self::Held {
            parent: Box::new(parent),
            slot,
        }
    }

    /// Key for the household container of `area`
    pub fn household(area: impl Into<AreaId>) -> Self {
        Self::Household { area: area.into() }
    }

    /// The backend family of this key
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Placed { .. } => ContainerKind::Placed,
            Self::Carried { .. } => ContainerKind::Carried,
            Self::Held { .. } => ContainerKind::Held,
            Self::Household { .. } => ContainerKind::Household,
        }
    }

    /// The outermost key this one is nested in (itself when not nested)
    pub fn root(&self) -> &ContainerKey {
        match self {
            Self::Held { parent, .. } => parent.root(),
            _ => self,
        }
    }

    /// The area the container lives in, if it lives in one
    pub fn area(&self) -> Option<&AreaId> {
        match self.root() {
            Self::Placed { area, .. } | Self::Household { area } => Some(area),
            _ => None,
        }
    }

    /// Compare by canonical string form
    pub fn lexical_cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placed { area, pos } => write!(f, "placed:{}@{}", area, pos),
            Self::Carried { owner, slot } => write!(f, "carried:{}#{}", owner, slot),
            Self::Held { parent, slot } => write!(f, "{}/held#{}", parent, slot),
            Self::Household { area } => write!(f, "household:{}", area),
        }
    }
}

impl fmt::Debug for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerKey({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(ContainerKey::placed("farm", 1, -2).to_string(), "placed:farm@1,-2");
        assert_eq!(ContainerKey::carried(ActorId(7), 3).to_string(), "carried:7#3");
        assert_eq!(ContainerKey::household("house").to_string(), "household:house");

        let nested = ContainerKey::held(ContainerKey::placed("shed", 0, 0), 0);
        assert_eq!(nested.to_string(), "placed:shed@0,0/held#0");
    }

    #[test]
    fn test_key_equality_is_structural() {
        let a = ContainerKey::placed("farm", 4, 4);
        let b = ContainerKey::placed(AreaId::from(String::from("farm")), 4, 4);
        assert_eq!(a, b);
        assert_ne!(a, ContainerKey::placed("farm", 4, 5));
    }

    #[test]
    fn test_nested_root_and_area() {
        let parent = ContainerKey::placed("shed", 2, 3);
        let nested = ContainerKey::held(parent.clone(), 1);

        assert_eq!(nested.kind(), ContainerKind::Held);
        assert_eq!(nested.root(), &parent);
        assert_eq!(nested.area(), Some(&AreaId::new("shed")));
        assert_eq!(ContainerKey::carried(ActorId(1), 0).area(), None);
    }

    #[test]
    fn test_lexical_order() {
        let a = ContainerKey::household("farm");
        let b = ContainerKey::placed("farm", 0, 0);
        assert_eq!(a.lexical_cmp(&b), Ordering::Less);
        assert_eq!(b.lexical_cmp(&b.clone()), Ordering::Equal);
    }

    #[test]
    fn test_key_serde() {
        let key = ContainerKey::held(ContainerKey::household("house"), 2);
        let json = serde_json::to_string(&key).unwrap();
        let back: ContainerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
