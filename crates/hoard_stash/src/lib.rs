//! # hoard_stash - Stashing Items Into Reachable Storage
//!
//! Given an actor, a source container and an item, the engine finds every
//! storage the actor can reach, ranks them and moves as much as fits:
//!
//! - [`world`]: what the engine needs to know about the host world, plus an
//!   in-memory implementation
//! - [`container`]: uniform, unbuffered views over storage backends
//! - [`resolver`]: ordered, lazy enumeration of reachable containers
//! - [`events`]: vetoable pre-transfer and informational post-transfer hooks
//! - [`engine`]: the transfer loop itself
//!
//! # Example
//!
//! ```
//! use hoard_stash::prelude::*;
//! use std::sync::Arc;
//!
//! let world = Arc::new(MemoryWorld::new());
//! let farm = world.add_area("farm");
//! world.add_actor(ActorId(1), &farm).unwrap();
//!
//! let bag = Inventory::shared(12);
//! bag.write().try_add(&ItemStack::new("parsnip", 1).with_tag("category_vegetable"), 40);
//! let bag = world.carry(ActorId(1), 0, bag).unwrap();
//! let (chest, _) = world.place_new(&farm, TilePos::new(3, 4), 36).unwrap();
//!
//! let filters = Arc::new(FilterBook::new());
//! filters.set(chest.clone(), "category_vegetable");
//!
//! let events = Arc::new(TransferEvents::new());
//! let engine = StashEngine::new(world, filters, events, StashConfig::default());
//! let outcome = engine
//!     .stash(&TransferRequest::new(ActorId(1), bag, ItemSpec::new("parsnip", 0), 40))
//!     .unwrap();
//!
//! assert_eq!(outcome.moved, 40);
//! assert_eq!(outcome.destinations, vec![chest]);
//! ```

pub mod config;
pub mod container;
pub mod engine;
pub mod events;
pub mod resolver;
pub mod world;

pub mod prelude {
    pub use crate::config::{ConfigError, StashConfig, StorageOptions};
    pub use crate::container::Container;
    pub use crate::engine::{StashEngine, TransferOutcome, TransferRequest};
    pub use crate::events::{PostTransfer, PreTransfer, TransferEvents};
    pub use crate::resolver::{Candidate, Resolution, Resolver};
    pub use crate::world::{MemoryWorld, StorageEntry, StorageWorld};

    pub use hoard_core::prelude::*;
    pub use hoard_event::prelude::*;
    pub use hoard_inventory::prelude::*;
}

pub use prelude::*;
