//! World collaborator
//!
//! The host game owns every storage. [`StorageWorld`] is the narrow view the
//! resolver and engine need of it; [`MemoryWorld`] is an in-memory
//! implementation used by hosts without a world of their own and by tests.

use crate::config::StorageOptions;
use hoard_core::{ActorId, AreaId, ContainerKey, HoardError, Result, TilePos};
use hoard_inventory::{Inventory, SharedInventory};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A storage as reported by the world
#[derive(Debug, Clone)]
pub struct StorageEntry {
    /// Canonical key
    pub key: ContainerKey,
    /// Backend
    pub inventory: SharedInventory,
    /// Host supplied settings
    pub options: StorageOptions,
}

/// What the stash pipeline needs to know about the world
///
/// Every method returns owned snapshots so no world lock outlives a call.
pub trait StorageWorld: Send + Sync {
    /// Area `actor` is in, `None` for an unknown actor
    fn actor_area(&self, actor: ActorId) -> Option<AreaId>;

    /// Containers in `actor`'s inventory, in slot order
    fn carried(&self, actor: ActorId) -> Vec<StorageEntry>;

    /// All known areas
    fn areas(&self) -> Vec<AreaId>;

    /// Whether `actor` may currently reach into `area`
    fn can_access(&self, actor: ActorId, area: &AreaId) -> bool;

    /// Containers placed in `area`, in placement order
    ///
    /// A placement that aliases the household storage is not listed here.
    fn placed(&self, area: &AreaId) -> Vec<StorageEntry>;

    /// The household storage of `area`
    fn household(&self, area: &AreaId) -> Option<StorageEntry>;

    /// Containers in the held slots of `parent`, in slot order
    fn held(&self, parent: &ContainerKey) -> Vec<StorageEntry>;

    /// Resolve any key, including aliases, to its canonical storage
    fn lookup(&self, key: &ContainerKey) -> Option<StorageEntry>;

    /// Other keys addressing the same storage as `key`, canonical key excluded
    fn aliases(&self, _key: &ContainerKey) -> Vec<ContainerKey> {
        Vec::new()
    }

    /// Counter that changes whenever storages or actors move
    fn generation(&self) -> u64;
}

/// A storage slot inside the memory world
#[derive(Debug, Clone)]
struct Slotted {
    inventory: SharedInventory,
    options: StorageOptions,
    held: BTreeMap<usize, Slotted>,
}

impl Slotted {
    fn new(inventory: SharedInventory, options: StorageOptions) -> Self {
        Self {
            inventory,
            options,
            held: BTreeMap::new(),
        }
    }

    fn entry(&self, key: ContainerKey) -> StorageEntry {
        StorageEntry {
            key,
            inventory: self.inventory.clone(),
            options: self.options,
        }
    }
}

#[derive(Debug, Default)]
struct AreaState {
    locked: bool,
    owner: Option<ActorId>,
    placed: Vec<(TilePos, Slotted)>,
    household: Option<(TilePos, Slotted)>,
}

impl AreaState {
    fn is_household_tile(&self, pos: TilePos) -> bool {
        matches!(&self.household, Some((anchor, _)) if *anchor == pos)
    }
}

#[derive(Debug)]
struct ActorState {
    area: AreaId,
    carried: BTreeMap<usize, Slotted>,
}

#[derive(Debug, Default)]
struct WorldState {
    areas: BTreeMap<AreaId, AreaState>,
    actors: HashMap<ActorId, ActorState>,
}

impl WorldState {
    /// Rewrite aliases to the canonical key
    fn canonical(&self, key: &ContainerKey) -> ContainerKey {
        match key {
            ContainerKey::Placed { area, pos } => match self.areas.get(area) {
                Some(state) if state.is_household_tile(*pos) => {
                    ContainerKey::household(area.clone())
                }
                _ => key.clone(),
            },
            ContainerKey::Held { parent, slot } => {
                ContainerKey::held(self.canonical(parent), *slot)
            }
            _ => key.clone(),
        }
    }

    /// Non-canonical keys of a canonical key
    fn aliases(&self, key: &ContainerKey) -> Vec<ContainerKey> {
        match key {
            ContainerKey::Household { area } => self
                .areas
                .get(area)
                .and_then(|state| state.household.as_ref())
                .map(|(anchor, _)| {
                    vec![ContainerKey::Placed {
                        area: area.clone(),
                        pos: *anchor,
                    }]
                })
                .unwrap_or_default(),
            ContainerKey::Held { parent, slot } => self
                .aliases(parent)
                .into_iter()
                .map(|alias| ContainerKey::held(alias, *slot))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn slot(&self, key: &ContainerKey) -> Option<&Slotted> {
        match key {
            ContainerKey::Placed { area, pos } => {
                let state = self.areas.get(area)?;
                if state.is_household_tile(*pos) {
                    state.household.as_ref().map(|(_, slotted)| slotted)
                } else {
                    state.placed.iter().find(|(p, _)| p == pos).map(|(_, slotted)| slotted)
                }
            }
            ContainerKey::Carried { owner, slot } => self.actors.get(owner)?.carried.get(slot),
            ContainerKey::Held { parent, slot } => self.slot(parent)?.held.get(slot),
            ContainerKey::Household { area } => self
                .areas
                .get(area)?
                .household
                .as_ref()
                .map(|(_, slotted)| slotted),
        }
    }

    fn slot_mut(&mut self, key: &ContainerKey) -> Option<&mut Slotted> {
        match key {
            ContainerKey::Placed { area, pos } => {
                let state = self.areas.get_mut(area)?;
                if state.is_household_tile(*pos) {
                    state.household.as_mut().map(|(_, slotted)| slotted)
                } else {
                    state.placed.iter_mut().find(|(p, _)| p == pos).map(|(_, slotted)| slotted)
                }
            }
            ContainerKey::Carried { owner, slot } => {
                self.actors.get_mut(owner)?.carried.get_mut(slot)
            }
            ContainerKey::Held { parent, slot } => self.slot_mut(parent)?.held.get_mut(slot),
            ContainerKey::Household { area } => self
                .areas
                .get_mut(area)?
                .household
                .as_mut()
                .map(|(_, slotted)| slotted),
        }
    }

    fn area_mut(&mut self, area: &AreaId) -> Result<&mut AreaState> {
        self.areas
            .get_mut(area)
            .ok_or_else(|| HoardError::UnknownArea(area.clone()))
    }

    fn actor_mut(&mut self, actor: ActorId) -> Result<&mut ActorState> {
        self.actors
            .get_mut(&actor)
            .ok_or(HoardError::UnknownActor(actor))
    }
}

/// In-memory world graph
#[derive(Debug, Default)]
pub struct MemoryWorld {
    state: RwLock<WorldState>,
    generation: AtomicU64,
}

impl MemoryWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Add an area, no-op if it exists
    pub fn add_area(&self, area: impl Into<AreaId>) -> AreaId {
        let area = area.into();
        self.state.write().areas.entry(area.clone()).or_default();
        self.touch();
        area
    }

    /// Lock or unlock an area for everyone not standing in it
    pub fn set_locked(&self, area: &AreaId, locked: bool) -> Result<()> {
        self.state.write().area_mut(area)?.locked = locked;
        self.touch();
        Ok(())
    }

    /// Make an area private to `owner`, or public with `None`
    pub fn set_owner(&self, area: &AreaId, owner: Option<ActorId>) -> Result<()> {
        self.state.write().area_mut(area)?.owner = owner;
        self.touch();
        Ok(())
    }

    /// Install the household storage of an area at `anchor`
    ///
    /// A placement already on the anchor tile stays in the world but is
    /// shadowed: the tile resolves to the household from now on.
    pub fn set_household(
        &self,
        area: &AreaId,
        anchor: TilePos,
        inventory: SharedInventory,
    ) -> Result<ContainerKey> {
        {
            let mut state = self.state.write();
            let area_state = state.area_mut(area)?;
            let slotted = Slotted::new(inventory, StorageOptions::default());
            area_state.household = Some((anchor, slotted));
        }
        self.touch();
        Ok(ContainerKey::household(area.clone()))
    }

    /// Place a container on a free tile
    pub fn place(
        &self,
        area: &AreaId,
        pos: TilePos,
        inventory: SharedInventory,
    ) -> Result<ContainerKey> {
        self.place_with(area, pos, inventory, StorageOptions::default())
    }

    /// Place a container with explicit options
    pub fn place_with(
        &self,
        area: &AreaId,
        pos: TilePos,
        inventory: SharedInventory,
        options: StorageOptions,
    ) -> Result<ContainerKey> {
        let key = ContainerKey::Placed {
            area: area.clone(),
            pos,
        };
        {
            let mut state = self.state.write();
            let area_state = state.area_mut(area)?;
            if area_state.is_household_tile(pos) {
                return Err(HoardError::invalid_key(key, "tile holds the household storage"));
            }
            if area_state.placed.iter().any(|(p, _)| *p == pos) {
                return Err(HoardError::invalid_key(key, "tile is occupied"));
            }
            area_state.placed.push((pos, Slotted::new(inventory, options)));
        }
        self.touch();
        log::trace!("Placed {}", key);
        Ok(key)
    }

    /// Place a fresh inventory of `capacity` slots
    pub fn place_new(
        &self,
        area: &AreaId,
        pos: TilePos,
        capacity: usize,
    ) -> Result<(ContainerKey, SharedInventory)> {
        let inventory = Inventory::shared(capacity);
        let key = self.place(area, pos, Arc::clone(&inventory))?;
        Ok((key, inventory))
    }

    /// Put a container into a held slot of `parent`
    pub fn hold(
        &self,
        parent: &ContainerKey,
        slot: usize,
        inventory: SharedInventory,
    ) -> Result<ContainerKey> {
        let key = {
            let mut state = self.state.write();
            let canonical = state.canonical(parent);
            let parent_slot = state
                .slot_mut(&canonical)
                .ok_or_else(|| HoardError::MissingBackend(parent.clone()))?;
            let key = ContainerKey::held(canonical, slot);
            if parent_slot.held.contains_key(&slot) {
                return Err(HoardError::invalid_key(key, "held slot is occupied"));
            }
            parent_slot.held.insert(slot, Slotted::new(inventory, StorageOptions::default()));
            key
        };
        self.touch();
        Ok(key)
    }

    /// Add an actor standing in `area`
    pub fn add_actor(&self, actor: ActorId, area: &AreaId) -> Result<()> {
        {
            let mut state = self.state.write();
            if !state.areas.contains_key(area) {
                return Err(HoardError::UnknownArea(area.clone()));
            }
            state.actors.insert(
                actor,
                ActorState {
                    area: area.clone(),
                    carried: BTreeMap::new(),
                },
            );
        }
        self.touch();
        Ok(())
    }

    /// Move an actor to another area
    pub fn move_actor(&self, actor: ActorId, area: &AreaId) -> Result<()> {
        {
            let mut state = self.state.write();
            if !state.areas.contains_key(area) {
                return Err(HoardError::UnknownArea(area.clone()));
            }
            state.actor_mut(actor)?.area = area.clone();
        }
        self.touch();
        log::debug!("Actor {} entered {}", actor, area);
        Ok(())
    }

    /// Put a container into an actor's inventory slot
    pub fn carry(
        &self,
        actor: ActorId,
        slot: usize,
        inventory: SharedInventory,
    ) -> Result<ContainerKey> {
        let key = ContainerKey::carried(actor, slot);
        {
            let mut state = self.state.write();
            let actor_state = state.actor_mut(actor)?;
            if actor_state.carried.contains_key(&slot) {
                return Err(HoardError::invalid_key(key, "inventory slot is occupied"));
            }
            actor_state
                .carried
                .insert(slot, Slotted::new(inventory, StorageOptions::default()));
        }
        self.touch();
        Ok(key)
    }

    /// Replace the options of a storage
    pub fn set_options(&self, key: &ContainerKey, options: StorageOptions) -> Result<()> {
        {
            let mut state = self.state.write();
            let slotted = state
                .slot_mut(key)
                .ok_or_else(|| HoardError::MissingBackend(key.clone()))?;
            slotted.options = options;
        }
        self.touch();
        Ok(())
    }

    /// Remove a storage and everything held inside it
    pub fn remove(&self, key: &ContainerKey) -> Result<SharedInventory> {
        let removed = {
            let mut state = self.state.write();
            let canonical = state.canonical(key);
            let missing = || HoardError::MissingBackend(key.clone());
            match &canonical {
                ContainerKey::Placed { area, pos } => {
                    let area_state = state.areas.get_mut(area).ok_or_else(missing)?;
                    let index = area_state
                        .placed
                        .iter()
                        .position(|(p, _)| p == pos)
                        .ok_or_else(missing)?;
                    area_state.placed.remove(index).1
                }
                ContainerKey::Carried { owner, slot } => state
                    .actors
                    .get_mut(owner)
                    .and_then(|actor| actor.carried.remove(slot))
                    .ok_or_else(missing)?,
                ContainerKey::Held { parent, slot } => state
                    .slot_mut(parent)
                    .and_then(|parent| parent.held.remove(slot))
                    .ok_or_else(missing)?,
                ContainerKey::Household { .. } => {
                    return Err(HoardError::invalid_key(
                        canonical.clone(),
                        "household storage cannot be removed",
                    ));
                }
            }
        };
        self.touch();
        log::trace!("Removed {}", key);
        Ok(removed.inventory)
    }
}

impl StorageWorld for MemoryWorld {
    fn actor_area(&self, actor: ActorId) -> Option<AreaId> {
        self.state.read().actors.get(&actor).map(|a| a.area.clone())
    }

    fn carried(&self, actor: ActorId) -> Vec<StorageEntry> {
        let state = self.state.read();
        state
            .actors
            .get(&actor)
            .map(|a| {
                a.carried
                    .iter()
                    .map(|(slot, slotted)| slotted.entry(ContainerKey::carried(actor, *slot)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn areas(&self) -> Vec<AreaId> {
        self.state.read().areas.keys().cloned().collect()
    }

    fn can_access(&self, actor: ActorId, area: &AreaId) -> bool {
        let state = self.state.read();
        let Some(area_state) = state.areas.get(area) else {
            return false;
        };
        // Standing in an area always grants access to it
        if state.actors.get(&actor).is_some_and(|a| &a.area == area) {
            return true;
        }
        !area_state.locked && area_state.owner.map_or(true, |owner| owner == actor)
    }

    fn placed(&self, area: &AreaId) -> Vec<StorageEntry> {
        let state = self.state.read();
        state
            .areas
            .get(area)
            .map(|a| {
                a.placed
                    .iter()
                    .filter(|(pos, _)| !a.is_household_tile(*pos))
                    .map(|(pos, slotted)| {
                        slotted.entry(ContainerKey::Placed {
                            area: area.clone(),
                            pos: *pos,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn household(&self, area: &AreaId) -> Option<StorageEntry> {
        let state = self.state.read();
        let (_, slotted) = state.areas.get(area)?.household.as_ref()?;
        Some(slotted.entry(ContainerKey::household(area.clone())))
    }

    fn held(&self, parent: &ContainerKey) -> Vec<StorageEntry> {
        let state = self.state.read();
        let canonical = state.canonical(parent);
        state
            .slot(&canonical)
            .map(|slotted| {
                slotted
                    .held
                    .iter()
                    .map(|(slot, child)| child.entry(ContainerKey::held(canonical.clone(), *slot)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lookup(&self, key: &ContainerKey) -> Option<StorageEntry> {
        let state = self.state.read();
        let canonical = state.canonical(key);
        state.slot(&canonical).map(|slotted| slotted.entry(canonical.clone()))
    }

    fn aliases(&self, key: &ContainerKey) -> Vec<ContainerKey> {
        let state = self.state.read();
        let canonical = state.canonical(key);
        let mut aliases = state.aliases(&canonical);
        aliases.retain(|alias| alias != &canonical);
        aliases
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farm_world() -> (MemoryWorld, AreaId) {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        world.add_actor(ActorId(1), &farm).unwrap();
        (world, farm)
    }

    #[test]
    fn test_place_and_lookup() {
        let (world, farm) = farm_world();
        let (key, inventory) = world.place_new(&farm, TilePos::new(1, 2), 9).unwrap();

        let entry = world.lookup(&key).unwrap();
        assert_eq!(entry.key, key);
        assert!(Arc::ptr_eq(&entry.inventory, &inventory));
        assert_eq!(world.placed(&farm).len(), 1);
    }

    #[test]
    fn test_occupied_tile_rejected() {
        let (world, farm) = farm_world();
        world.place_new(&farm, TilePos::new(0, 0), 9).unwrap();
        let err = world.place_new(&farm, TilePos::new(0, 0), 9).unwrap_err();
        assert!(matches!(err, HoardError::InvalidKey { .. }));
    }

    #[test]
    fn test_household_takes_precedence() {
        let (world, farm) = farm_world();
        let fridge = Inventory::shared(36);
        world.place_new(&farm, TilePos::new(5, 5), 9).unwrap();
        world.set_household(&farm, TilePos::new(5, 5), fridge.clone()).unwrap();

        let entry = world.lookup(&ContainerKey::placed("farm", 5, 5)).unwrap();
        assert_eq!(entry.key, ContainerKey::household("farm"));
        assert!(Arc::ptr_eq(&entry.inventory, &fridge));
        assert!(world.placed(&farm).is_empty());
    }

    #[test]
    fn test_held_keys_are_canonical() {
        let (world, farm) = farm_world();
        world.set_household(&farm, TilePos::new(0, 0), Inventory::shared(36)).unwrap();

        let key = world.hold(&ContainerKey::placed("farm", 0, 0), 0, Inventory::shared(9)).unwrap();
        assert_eq!(key, ContainerKey::held(ContainerKey::household("farm"), 0));
        assert_eq!(world.held(&ContainerKey::household("farm")).len(), 1);
        assert!(world.lookup(&key).is_some());
        assert_eq!(
            world.aliases(&key),
            vec![ContainerKey::held(ContainerKey::placed("farm", 0, 0), 0)]
        );
    }

    #[test]
    fn test_household_aliases() {
        let (world, farm) = farm_world();
        world.set_household(&farm, TilePos::new(2, 3), Inventory::shared(36)).unwrap();
        let (chest, _) = world.place_new(&farm, TilePos::new(0, 0), 9).unwrap();

        let tile = ContainerKey::placed("farm", 2, 3);
        assert_eq!(world.aliases(&ContainerKey::household("farm")), vec![tile.clone()]);
        assert_eq!(world.aliases(&tile), vec![tile]);
        assert!(world.aliases(&chest).is_empty());
    }

    #[test]
    fn test_remove_bumps_generation() {
        let (world, farm) = farm_world();
        let (key, _) = world.place_new(&farm, TilePos::new(1, 1), 9).unwrap();
        let before = world.generation();

        world.remove(&key).unwrap();

        assert!(world.generation() > before);
        assert!(world.lookup(&key).is_none());
        assert!(matches!(world.remove(&key), Err(HoardError::MissingBackend(_))));
    }

    #[test]
    fn test_household_cannot_be_removed() {
        let (world, farm) = farm_world();
        let key = world.set_household(&farm, TilePos::new(0, 0), Inventory::shared(36)).unwrap();
        assert!(matches!(world.remove(&key), Err(HoardError::InvalidKey { .. })));
    }

    #[test]
    fn test_access_rules() {
        let (world, farm) = farm_world();
        let cabin = world.add_area("cabin");
        let mine = world.add_area("mine");
        world.set_owner(&cabin, Some(ActorId(2))).unwrap();
        world.set_locked(&mine, true).unwrap();

        assert!(world.can_access(ActorId(1), &farm));
        assert!(!world.can_access(ActorId(1), &cabin));
        assert!(!world.can_access(ActorId(1), &mine));
        assert!(!world.can_access(ActorId(1), &AreaId::new("nowhere")));

        world.move_actor(ActorId(1), &mine).unwrap();
        assert!(world.can_access(ActorId(1), &mine));
    }

    #[test]
    fn test_carry() {
        let (world, _) = farm_world();
        world.carry(ActorId(1), 3, Inventory::shared(9)).unwrap();
        world.carry(ActorId(1), 1, Inventory::shared(9)).unwrap();

        let keys: Vec<_> = world.carried(ActorId(1)).into_iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec![ContainerKey::carried(ActorId(1), 1), ContainerKey::carried(ActorId(1), 3)]
        );
        assert!(matches!(
            world.carry(ActorId(9), 0, Inventory::shared(1)),
            Err(HoardError::UnknownActor(_))
        ));
    }
}
