//! Accessibility resolution
//!
//! Turns "actor + scope" into the ordered list of containers that are in
//! reach. The sequence is produced lazily, one source at a time:
//!
//! 1. containers the actor carries (scope >= Inventory)
//! 2. the actor's current area, placements then household (scope >= Location)
//! 3. every other reachable area by name (scope = World)
//!
//! Each key is yielded at most once, at its first position.

use crate::config::StashConfig;
use crate::container::Container;
use crate::world::{StorageEntry, StorageWorld};
use hoard_core::{AccessibilityScope, ActorId, AreaId, ContainerKey, HoardError, Result};
use hoard_inventory::Ranked;
use std::collections::{HashSet, VecDeque};

/// A container in reach, with the tier it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub container: Container,
    pub tier: AccessibilityScope,
    /// Index in the resolution that yielded it
    pub position: usize,
}

impl Ranked for Candidate {
    fn priority(&self) -> i32 {
        self.container.options().priority
    }

    fn position(&self) -> usize {
        self.position
    }

    fn key(&self) -> &ContainerKey {
        self.container.key()
    }
}

/// Resolves scopes against a world
pub struct Resolver<'w, W: StorageWorld + ?Sized> {
    world: &'w W,
    default_scope: AccessibilityScope,
    look_inside_held: bool,
}

impl<'w, W: StorageWorld + ?Sized> Resolver<'w, W> {
    /// Create a resolver
    pub fn new(world: &'w W, config: &StashConfig) -> Self {
        Self {
            world,
            default_scope: config.default_scope,
            look_inside_held: config.look_inside_held,
        }
    }

    /// Containers `actor` can reach under `scope`
    ///
    /// Nothing is read from the world beyond the actor's area and the area
    /// list until the sequence is consumed.
    pub fn resolve(&self, actor: ActorId, scope: AccessibilityScope) -> Result<Resolution<'w, W>> {
        let current = self
            .world
            .actor_area(actor)
            .ok_or(HoardError::UnknownActor(actor))?;
        let scope = scope.resolve(self.default_scope);

        let mut sources = VecDeque::new();
        if scope >= AccessibilityScope::Inventory {
            sources.push_back(Source::Carried);
        }
        if scope >= AccessibilityScope::Location {
            sources.push_back(Source::Area(current.clone(), AccessibilityScope::Location));
        }
        if scope >= AccessibilityScope::World {
            let mut areas = self.world.areas();
            areas.sort();
            sources.extend(
                areas
                    .into_iter()
                    .filter(|area| *area != current)
                    .map(|area| Source::Area(area, AccessibilityScope::World)),
            );
        }

        log::trace!("Resolving {} source(s) for actor {} at {}", sources.len(), actor, scope);
        Ok(Resolution {
            world: self.world,
            actor,
            default_scope: self.default_scope,
            look_inside_held: self.look_inside_held,
            sources,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            yielded: 0,
        })
    }

    /// Check that `container` still resolves to the backend it was built on
    pub fn is_current(&self, container: &Container) -> bool {
        self.world.lookup(container.key()).is_some_and(|entry| {
            entry.key == *container.key() && container.shares_backend(&entry.inventory)
        })
    }
}

#[derive(Debug, Clone)]
enum Source {
    Carried,
    Area(AreaId, AccessibilityScope),
}

/// Lazy, finite sequence of reachable containers
///
/// Cloning an unconsumed resolution gives an independent replay.
pub struct Resolution<'w, W: StorageWorld + ?Sized> {
    world: &'w W,
    actor: ActorId,
    default_scope: AccessibilityScope,
    look_inside_held: bool,
    sources: VecDeque<Source>,
    pending: VecDeque<(StorageEntry, AccessibilityScope)>,
    seen: HashSet<ContainerKey>,
    yielded: usize,
}

impl<'w, W: StorageWorld + ?Sized> Clone for Resolution<'w, W> {
    fn clone(&self) -> Self {
        Self {
            world: self.world,
            actor: self.actor,
            default_scope: self.default_scope,
            look_inside_held: self.look_inside_held,
            sources: self.sources.clone(),
            pending: self.pending.clone(),
            seen: self.seen.clone(),
            yielded: self.yielded,
        }
    }
}

impl<'w, W: StorageWorld + ?Sized> Resolution<'w, W> {
    fn expand(&mut self, source: Source) {
        match source {
            Source::Carried => {
                let entries = self.world.carried(self.actor);
                self.pending.extend(
                    entries
                        .into_iter()
                        .map(|entry| (entry, AccessibilityScope::Inventory)),
                );
            }
            Source::Area(area, tier) => {
                if !self.world.can_access(self.actor, &area) {
                    log::trace!("Skipping unreachable area {}", area);
                    return;
                }
                let placed = self.world.placed(&area);
                let household = self.world.household(&area);
                self.pending
                    .extend(placed.into_iter().chain(household).map(|entry| (entry, tier)));
            }
        }
    }

    fn participates(&self, entry: &StorageEntry, tier: AccessibilityScope) -> bool {
        entry
            .options
            .stash_range
            .resolve(self.default_scope)
            .reaches(tier)
    }
}

impl<'w, W: StorageWorld + ?Sized> Iterator for Resolution<'w, W> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some((entry, tier)) = self.pending.pop_front() {
                if !self.seen.insert(entry.key.clone()) {
                    continue;
                }
                if self.look_inside_held {
                    // Held containers come right after their parent
                    for child in self.world.held(&entry.key).into_iter().rev() {
                        self.pending.push_front((child, tier));
                    }
                }
                if !self.participates(&entry, tier) {
                    log::trace!("Skipping non-participating {}", entry.key);
                    continue;
                }
                let position = self.yielded;
                self.yielded += 1;
                return Some(Candidate {
                    container: Container::from(entry),
                    tier,
                    position,
                });
            }

            let source = self.sources.pop_front()?;
            self.expand(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageOptions;
    use crate::world::MemoryWorld;
    use hoard_core::TilePos;
    use hoard_inventory::Inventory;

    const ALEX: ActorId = ActorId(1);

    fn keys<W: StorageWorld + ?Sized>(resolution: Resolution<'_, W>) -> Vec<ContainerKey> {
        resolution.map(|c| c.container.key().clone()).collect()
    }

    fn world() -> MemoryWorld {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        let barn = world.add_area("barn");
        let attic = world.add_area("attic");
        world.add_actor(ALEX, &farm).unwrap();

        world.carry(ALEX, 2, Inventory::shared(9)).unwrap();
        world.place_new(&farm, TilePos::new(9, 9), 36).unwrap();
        world.place_new(&farm, TilePos::new(1, 1), 36).unwrap();
        world.set_household(&farm, TilePos::new(0, 5), Inventory::shared(36)).unwrap();
        world.place_new(&barn, TilePos::new(0, 0), 36).unwrap();
        world.place_new(&attic, TilePos::new(3, 3), 36).unwrap();
        world
    }

    #[test]
    fn test_order_by_tier() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());

        let keys = keys(resolver.resolve(ALEX, AccessibilityScope::World).unwrap());
        assert_eq!(
            keys,
            vec![
                ContainerKey::carried(ALEX, 2),
                ContainerKey::placed("farm", 9, 9),
                ContainerKey::placed("farm", 1, 1),
                ContainerKey::household("farm"),
                ContainerKey::placed("attic", 3, 3),
                ContainerKey::placed("barn", 0, 0),
            ]
        );
    }

    #[test]
    fn test_disabled_and_default() {
        let world = world();
        let config = StashConfig::default().with_default_scope(AccessibilityScope::Inventory);
        let resolver = Resolver::new(&world, &config);

        assert_eq!(resolver.resolve(ALEX, AccessibilityScope::Disabled).unwrap().count(), 0);

        let keys = keys(resolver.resolve(ALEX, AccessibilityScope::Default).unwrap());
        assert_eq!(keys, vec![ContainerKey::carried(ALEX, 2)]);
    }

    #[test]
    fn test_scope_monotonicity() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());

        let reach = |scope| -> HashSet<ContainerKey> {
            keys(resolver.resolve(ALEX, scope).unwrap()).into_iter().collect()
        };
        let inventory = reach(AccessibilityScope::Inventory);
        let location = reach(AccessibilityScope::Location);
        let everything = reach(AccessibilityScope::World);

        assert!(inventory.is_subset(&location));
        assert!(location.is_subset(&everything));
        assert_eq!(location.len(), 4);
    }

    #[test]
    fn test_unreachable_areas_skipped() {
        let world = world();
        world.set_locked(&AreaId::new("barn"), true).unwrap();
        world.set_owner(&AreaId::new("attic"), Some(ActorId(2))).unwrap();
        let resolver = Resolver::new(&world, &StashConfig::default());

        let keys = keys(resolver.resolve(ALEX, AccessibilityScope::World).unwrap());
        assert_eq!(keys.len(), 4);
        assert!(keys.iter().all(|k| k.area().map_or(true, |a| a.name() == "farm")));
    }

    #[test]
    fn test_non_participating_skipped() {
        let world = world();
        world
            .set_options(&ContainerKey::placed("farm", 9, 9), StorageOptions::excluded())
            .unwrap();
        // Only accepts stashes from inside its own area
        world
            .set_options(
                &ContainerKey::placed("barn", 0, 0),
                StorageOptions::default().with_range(AccessibilityScope::Location),
            )
            .unwrap();
        let resolver = Resolver::new(&world, &StashConfig::default());

        let keys = keys(resolver.resolve(ALEX, AccessibilityScope::World).unwrap());
        assert!(!keys.contains(&ContainerKey::placed("farm", 9, 9)));
        assert!(!keys.contains(&ContainerKey::placed("barn", 0, 0)));
        assert!(keys.contains(&ContainerKey::placed("attic", 3, 3)));
    }

    #[test]
    fn test_held_only_when_asked() {
        let world = world();
        let parent = ContainerKey::placed("farm", 1, 1);
        let nested = world.hold(&parent, 0, Inventory::shared(9)).unwrap();

        let plain = Resolver::new(&world, &StashConfig::default());
        let shallow = keys(plain.resolve(ALEX, AccessibilityScope::Location).unwrap());
        assert!(!shallow.contains(&nested));

        let config = StashConfig::default().with_held(true);
        let deep = Resolver::new(&world, &config);
        let keys = keys(deep.resolve(ALEX, AccessibilityScope::Location).unwrap());
        let parent_at = keys.iter().position(|k| *k == parent).unwrap();
        assert_eq!(keys[parent_at + 1], nested);
        assert_eq!(keys.iter().filter(|k| **k == nested).count(), 1);
    }

    #[test]
    fn test_resolution_is_deterministic_and_restartable() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());

        let resolution = resolver.resolve(ALEX, AccessibilityScope::World).unwrap();
        let replay = resolution.clone();
        let again = resolver.resolve(ALEX, AccessibilityScope::World).unwrap();

        let first = keys(resolution);
        assert_eq!(first, keys(replay));
        assert_eq!(first, keys(again));
    }

    #[test]
    fn test_partial_consumption_reads_lazily() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());
        let mut resolution = resolver.resolve(ALEX, AccessibilityScope::World).unwrap();

        let first = resolution.next().unwrap();
        assert_eq!(first.tier, AccessibilityScope::Inventory);

        // A barn chest placed after resolving is still found, since areas are read on demand
        world.place_new(&AreaId::new("barn"), TilePos::new(7, 7), 9).unwrap();
        assert!(resolution.any(|c| *c.container.key() == ContainerKey::placed("barn", 7, 7)));
    }

    #[test]
    fn test_is_current() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());
        let candidate = resolver
            .resolve(ALEX, AccessibilityScope::Location)
            .unwrap()
            .find(|c| c.container.key() == &ContainerKey::placed("farm", 1, 1))
            .unwrap();

        assert!(resolver.is_current(&candidate.container));
        world.remove(candidate.container.key()).unwrap();
        assert!(!resolver.is_current(&candidate.container));

        // A new chest on the same tile is a different backend
        world.place_new(&AreaId::new("farm"), TilePos::new(1, 1), 9).unwrap();
        assert!(!resolver.is_current(&candidate.container));
    }

    #[test]
    fn test_unknown_actor() {
        let world = world();
        let resolver = Resolver::new(&world, &StashConfig::default());
        assert!(matches!(
            resolver.resolve(ActorId(42), AccessibilityScope::World),
            Err(HoardError::UnknownActor(ActorId(42)))
        ));
    }
}
