//! Transfer notifications
//!
//! Pre-transfer is vetoable: every handler runs and any [`Verdict::Prevent`]
//! skips the destination. Post-transfer is informational.

use crate::container::Container;
use hoard_core::{ActorId, ContainerKey};
use hoard_event::{Decision, Gate, Observers, Priority, SubscriberId, Verdict};
use hoard_inventory::ItemStack;

/// Raised before items move into `destination`
#[derive(Debug, Clone)]
pub struct PreTransfer {
    pub actor: ActorId,
    pub source: ContainerKey,
    pub destination: Container,
    /// Template of the item about to move
    pub item: ItemStack,
    /// Amount still waiting to be placed
    pub amount: u32,
    /// Tag rules were bypassed for this request
    pub forced: bool,
}

/// Raised after one increment has moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTransfer {
    pub actor: ActorId,
    pub from: ContainerKey,
    pub to: ContainerKey,
    pub item: ItemStack,
    pub amount: u32,
}

/// Subscription point for transfer notifications
#[derive(Debug, Default)]
pub struct TransferEvents {
    pre: Gate<PreTransfer>,
    post: Observers<PostTransfer>,
}

impl TransferEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to pre-transfer
    pub fn on_pre_transfer<F>(&self, priority: impl Into<Priority>, handler: F) -> SubscriberId
    where
        F: Fn(&PreTransfer) -> Verdict + Send + Sync + 'static,
    {
        self.pre.subscribe_with_priority(priority, handler)
    }

    /// Subscribe to post-transfer
    pub fn on_post_transfer<F>(&self, priority: impl Into<Priority>, handler: F) -> SubscriberId
    where
        F: Fn(&PostTransfer) + Send + Sync + 'static,
    {
        self.post.subscribe_with_priority(priority, handler)
    }

    /// Remove a subscriber from either list
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.pre.unsubscribe(id) || self.post.unsubscribe(id)
    }

    pub(crate) fn check(&self, event: &PreTransfer) -> Decision {
        self.pre.check(event)
    }

    pub(crate) fn notify(&self, event: &PostTransfer) {
        self.post.notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::MemoryWorld;
    use hoard_core::TilePos;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn pre_transfer() -> PreTransfer {
        let world = MemoryWorld::new();
        let farm = world.add_area("farm");
        let (key, _) = world.place_new(&farm, TilePos::new(0, 0), 9).unwrap();
        PreTransfer {
            actor: ActorId(1),
            source: ContainerKey::carried(ActorId(1), 0),
            destination: Container::open(&world, &key).unwrap(),
            item: ItemStack::new("corn", 1),
            amount: 5,
            forced: false,
        }
    }

    #[test]
    fn test_any_prevent_vetoes() {
        let events = TransferEvents::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = calls.clone();
        let vetoer = events.on_pre_transfer(Priority::HIGH, move |_| {
            log.lock().push("high");
            Verdict::Prevent
        });
        let log = calls.clone();
        events.on_pre_transfer(Priority::LOW, move |_| {
            log.lock().push("low");
            Verdict::Allow
        });

        let decision = events.check(&pre_transfer());
        assert!(decision.is_prevented());
        assert_eq!(decision.vetoed_by, vec![vetoer]);
        // A veto does not stop later handlers
        assert_eq!(*calls.lock(), vec!["high", "low"]);
    }

    #[test]
    fn test_unsubscribe_either_list() {
        let events = TransferEvents::new();
        let pre = events.on_pre_transfer(0, |_| Verdict::Prevent);
        let post = events.on_post_transfer(0, |_| {});

        assert!(events.unsubscribe(pre));
        assert!(events.unsubscribe(post));
        assert!(!events.unsubscribe(post));
        assert!(!events.check(&pre_transfer()).is_prevented());
    }
}
