//! # hoard_event - Synchronous Observer Lists
//!
//! Event delivery for the stash pipeline:
//! - Priority-ordered delivery (explicit priority, then registration order)
//! - Plain notifications through [`Observers`]
//! - Cancellable notifications through [`Gate`], where every handler returns a
//!   [`Verdict`] and the gate aggregates them
//!
//! Delivery is immediate and happens on the caller's thread. Handler lists are
//! snapshotted before dispatch, so a handler may subscribe, unsubscribe or
//! raise further events without deadlocking.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use std::sync::Arc;

/// Delivery priority, higher runs first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Self = Self(-100);
    pub const NORMAL: Self = Self(0);
    pub const HIGH: Self = Self(100);
    pub const CRITICAL: Self = Self(1000);
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

/// Answer of a gate handler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Let the action go ahead
    Allow,
    /// Veto the action
    Prevent,
}

impl Verdict {
    pub fn is_prevented(self) -> bool {
        self == Self::Prevent
    }
}

impl From<bool> for Verdict {
    /// `true` allows, `false` prevents
    fn from(allow: bool) -> Self {
        if allow {
            Self::Allow
        } else {
            Self::Prevent
        }
    }
}

/// Notification handler
pub type Handler<E> = dyn Fn(&E) + Send + Sync;

/// Gate handler
pub type GateHandler<E> = dyn Fn(&E) -> Verdict + Send + Sync;

struct Entry<H: ?Sized> {
    id: SubscriberId,
    priority: Priority,
    handler: Arc<H>,
}

/// Priority-sorted handler storage shared by [`Observers`] and [`Gate`]
struct Registry<H: ?Sized> {
    entries: RwLock<Vec<Entry<H>>>,
}

/// Subscriber ids are unique across every list in the process
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl<H: ?Sized> Registry<H> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn insert(&self, priority: Priority, handler: Arc<H>) -> SubscriberId {
        let id = SubscriberId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write();
        entries.push(Entry {
            id,
            priority,
            handler,
        });
        // Higher priority first, registration order among equals
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        id
    }

    fn remove(&self, id: SubscriberId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    fn snapshot(&self) -> Vec<(SubscriberId, Arc<H>)> {
        self.entries
            .read()
            .iter()
            .map(|entry| (entry.id, entry.handler.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Observers of a plain, informational event
pub struct Observers<E> {
    registry: Registry<Handler<E>>,
}

impl<E> Observers<E> {
    /// Create an empty observer list
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Subscribe with normal priority
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(Priority::NORMAL, handler)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<F>(
        &self,
        priority: impl Into<Priority>,
        handler: F,
    ) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.registry.insert(priority.into(), Arc::new(handler))
    }

    /// Unsubscribe, returns whether the subscriber existed
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Deliver `event` to every observer, returns how many were called
    pub fn notify(&self, event: &E) -> usize {
        let handlers = self.registry.snapshot();
        for (_, handler) in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if there are no subscribers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("subscribers", &self.len()).finish()
    }
}

/// Result of running a [`Gate`]
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Decision {
    /// Subscribers that answered [`Verdict::Prevent`], in delivery order
    pub vetoed_by: Vec<SubscriberId>,
}

impl Decision {
    /// The aggregated verdict
    pub fn verdict(&self) -> Verdict {
        if self.vetoed_by.is_empty() {
            Verdict::Allow
        } else {
            Verdict::Prevent
        }
    }

    pub fn is_prevented(&self) -> bool {
        self.verdict().is_prevented()
    }
}

/// Handlers of a cancellable event
///
/// Each handler gets exactly one say per event through its returned
/// [`Verdict`]. Every handler runs even after a veto, so observers that
/// only watch still see the event.
pub struct Gate<E> {
    registry: Registry<GateHandler<E>>,
}

impl<E> Gate<E> {
    /// Create an empty gate, which allows everything
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Subscribe with normal priority
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) -> Verdict + Send + Sync + 'static,
    {
        self.subscribe_with_priority(Priority::NORMAL, handler)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<F>(
        &self,
        priority: impl Into<Priority>,
        handler: F,
    ) -> SubscriberId
    where
        F: Fn(&E) -> Verdict + Send + Sync + 'static,
    {
        self.registry.insert(priority.into(), Arc::new(handler))
    }

    /// Unsubscribe, returns whether the subscriber existed
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Ask every handler about `event`
    pub fn check(&self, event: &E) -> Decision {
        let mut decision = Decision::default();
        for (id, handler) in self.registry.snapshot() {
            if handler(event).is_prevented() {
                log::trace!("Subscriber {:?} vetoed event", id);
                decision.vetoed_by.push(id);
            }
        }
        decision
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Check if there are no subscribers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Gate<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Gate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate").field("subscribers", &self.len()).finish()
    }
}

/// Prelude
pub mod prelude {
    pub use crate::{Decision, Gate, Observers, Priority, SubscriberId, Verdict};
}
