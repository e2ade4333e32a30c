//! Container views
//!
//! A [`Container`] is a cheap handle onto one storage backend. It is built
//! whenever code needs to touch a storage and dropped right after; it never
//! buffers, so every write is immediately visible through any other view
//! with the same key.

use crate::config::StorageOptions;
use crate::world::{StorageEntry, StorageWorld};
use hoard_core::{ContainerKey, ContainerKind, HoardError, Result};
use hoard_inventory::{ItemSpec, ItemStack, SharedInventory, SortMode};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A uniform view over one storage
#[derive(Clone)]
pub struct Container {
    key: ContainerKey,
    backend: SharedInventory,
    options: StorageOptions,
}

impl Container {
    /// Open the storage behind `key`
    ///
    /// Aliases resolve to their canonical key, so the returned container's
    /// key may differ from the one asked for.
    pub fn open<W: StorageWorld + ?Sized>(world: &W, key: &ContainerKey) -> Result<Self> {
        world
            .lookup(key)
            .map(Self::from)
            .ok_or_else(|| HoardError::MissingBackend(key.clone()))
    }

    /// Identity key
    pub fn key(&self) -> &ContainerKey {
        &self.key
    }

    /// Backend family
    pub fn kind(&self) -> ContainerKind {
        self.key.kind()
    }

    /// Host supplied settings
    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Shared backend handle
    pub fn backend(&self) -> &SharedInventory {
        &self.backend
    }

    /// Check if both views write to the same backend
    pub fn shares_backend(&self, other: &SharedInventory) -> bool {
        Arc::ptr_eq(&self.backend, other)
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.backend.read().capacity()
    }

    /// Snapshot of every slot, empty ones included
    pub fn items(&self) -> Vec<Option<ItemStack>> {
        self.backend.read().slots().to_vec()
    }

    /// Total quantity of `spec`
    pub fn count(&self, spec: &ItemSpec) -> u32 {
        self.backend.read().count(spec)
    }

    /// Distinct specs held, in first-slot order
    pub fn specs(&self) -> Vec<ItemSpec> {
        self.backend.read().specs()
    }

    /// First stack of `spec`, if any
    pub fn stack_of(&self, spec: &ItemSpec) -> Option<ItemStack> {
        self.backend
            .read()
            .items()
            .find(|(_, stack)| stack.is(spec))
            .map(|(_, stack)| stack.clone())
    }

    /// How much more of `item` would fit
    pub fn room_for(&self, item: &ItemStack) -> u32 {
        self.backend.read().room_for(item)
    }

    /// Add `amount` of `item`, returns the amount left over
    pub fn try_add(&self, item: &ItemStack, amount: u32) -> u32 {
        self.backend.write().try_add(item, amount)
    }

    /// Remove up to `amount` of `spec`, returns the amount removed
    pub fn try_remove(&self, spec: &ItemSpec, amount: u32) -> u32 {
        self.backend.write().try_remove(spec, amount)
    }

    /// Reorder the slots for display, `false` if the contents no longer fit
    pub fn organize(&self, mode: SortMode) -> bool {
        self.backend.write().organize(mode)
    }
}

impl From<StorageEntry> for Container {
    fn from(entry: StorageEntry) -> Self {
        Self {
            key: entry.key,
            backend: entry.inventory,
            options: entry.options,
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Container {}

impl Hash for Container {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::MemoryWorld;
    use hoard_core::{ActorId, TilePos};
    use hoard_inventory::Inventory;

    fn vegetable(id: &str) -> ItemStack {
        ItemStack::new(id, 1).with_tag("category_vegetable")
    }

    #[test]
    fn test_views_with_same_key_alias() {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        let (key, _) = world.place_new(&farm, TilePos::new(2, 2), 9).unwrap();

        let a = Container::open(&world, &key).unwrap();
        let b = Container::open(&world, &key).unwrap();

        assert_eq!(a, b);
        a.try_add(&vegetable("corn"), 5);
        assert_eq!(b.count(&ItemSpec::new("corn", 0)), 5);
    }

    #[test]
    fn test_household_alias_resolves_to_one_container() {
        let world = MemoryWorld::new();
        let house = world.add_area("house");
        world.set_household(&house, TilePos::new(4, 1), Inventory::shared(36)).unwrap();

        let by_tile = Container::open(&world, &ContainerKey::placed("house", 4, 1)).unwrap();
        let by_kind = Container::open(&world, &ContainerKey::household("house")).unwrap();

        assert_eq!(by_tile, by_kind);
        assert_eq!(by_tile.kind(), ContainerKind::Household);
    }

    #[test]
    fn test_missing_backend_is_an_error() {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        world.add_actor(ActorId(1), &farm).unwrap();

        let key = ContainerKey::carried(ActorId(1), 4);
        assert_eq!(Container::open(&world, &key).unwrap_err(), HoardError::MissingBackend(key));
    }

    #[test]
    fn test_add_reports_leftover() {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        let mut small = Inventory::new(1);
        small.register_item("corn", 10);
        let key = world.place(&farm, TilePos::new(0, 0), small.into_shared()).unwrap();
        let chest = Container::open(&world, &key).unwrap();

        assert_eq!(chest.room_for(&vegetable("corn")), 10);
        assert_eq!(chest.try_add(&vegetable("corn"), 25), 15);
        assert_eq!(chest.try_add(&vegetable("corn"), 1), 1);
        assert_eq!(chest.try_remove(&ItemSpec::new("corn", 0), 4), 4);
        assert_eq!(chest.items()[0].as_ref().unwrap().quantity, 6);
        assert_eq!(chest.capacity(), 1);
    }
}
