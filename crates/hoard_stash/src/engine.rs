//! Stash engine
//!
//! Moves items out of a source container into every destination the actor
//! can reach, best ranked first, honoring tag rules and observer vetoes.
//!
//! Each destination is handled as one increment:
//!
//! 1. tag rule check (skipped when the request is forced)
//! 2. pre-transfer gate; any veto skips the destination
//! 3. re-validation, since observers may have changed the world
//! 4. add to the destination, then remove exactly the accepted amount
//! 5. post-transfer notification
//!
//! No lock and no live view of a container is held across an observer call,
//! so observers may mutate the world or call back into the engine.

use crate::config::StashConfig;
use crate::container::Container;
use crate::events::{PostTransfer, PreTransfer, TransferEvents};
use crate::resolver::{Candidate, Resolver};
use crate::world::StorageWorld;
use hoard_core::{AccessibilityScope, ActorId, ContainerKey, Result};
use hoard_event::{Priority, SubscriberId};
use hoard_inventory::{rank_destination, FilterBook, ItemSpec, ItemStack, TagRule};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One stash request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub actor: ActorId,
    pub source: ContainerKey,
    pub item: ItemSpec,
    pub amount: u32,
    pub scope: AccessibilityScope,
    /// Bypass destination tag rules; vetoes still apply
    pub forced: bool,
}

impl TransferRequest {
    /// Request at the default scope
    pub fn new(actor: ActorId, source: ContainerKey, item: ItemSpec, amount: u32) -> Self {
        Self {
            actor,
            source,
            item,
            amount,
            scope: AccessibilityScope::Default,
            forced: false,
        }
    }

    pub fn with_scope(mut self, scope: AccessibilityScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }
}

/// What a stash request achieved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Total amount moved
    pub moved: u32,
    /// Requested amount that was not moved
    pub leftover: Option<ItemStack>,
    /// Destinations that received items, in the order they did
    pub destinations: Vec<ContainerKey>,
}

impl TransferOutcome {
    /// Check if everything requested was moved
    pub fn is_complete(&self) -> bool {
        self.leftover.is_none()
    }

    fn finish(mut self, template: ItemStack, remaining: u32) -> Self {
        if remaining > 0 {
            self.leftover = Some(template.with_quantity(remaining));
        }
        self
    }
}

struct CachedRule {
    /// Book key the text came from, `None` when no rule was found
    source: Option<ContainerKey>,
    rule: Arc<TagRule>,
}

#[derive(Default)]
struct MatcherCache {
    generation: u64,
    rules: HashMap<ContainerKey, CachedRule>,
}

impl MatcherCache {
    fn invalidate(&mut self, targets: &[ContainerKey]) {
        // Entries without a rule may be picked up by a new alias rule
        self.rules.retain(|key, cached| {
            !targets.contains(key)
                && cached
                    .source
                    .as_ref()
                    .is_some_and(|source| !targets.contains(source))
        });
    }
}

/// Moves items between containers
pub struct StashEngine<W: StorageWorld + ?Sized> {
    world: Arc<W>,
    filters: Arc<FilterBook>,
    events: Arc<TransferEvents>,
    config: StashConfig,
    cache: Arc<RwLock<MatcherCache>>,
    rule_subscription: SubscriberId,
}

impl<W: StorageWorld + ?Sized> StashEngine<W> {
    /// Create an engine over the given collaborators
    pub fn new(
        world: Arc<W>,
        filters: Arc<FilterBook>,
        events: Arc<TransferEvents>,
        config: StashConfig,
    ) -> Self {
        let cache = Arc::new(RwLock::new(MatcherCache {
            generation: world.generation(),
            rules: HashMap::new(),
        }));

        let invalidate = Arc::clone(&cache);
        let rule_subscription = filters.on_rule_changed(Priority::CRITICAL, move |changed| {
            invalidate.write().invalidate(&changed.targets);
        });

        Self {
            world,
            filters,
            events,
            config,
            cache,
            rule_subscription,
        }
    }

    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    pub fn filters(&self) -> &Arc<FilterBook> {
        &self.filters
    }

    pub fn events(&self) -> &Arc<TransferEvents> {
        &self.events
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Resolver bound to this engine's world and config
    pub fn resolver(&self) -> Resolver<'_, W> {
        Resolver::new(&*self.world, &self.config)
    }

    /// Compiled rule of a container
    ///
    /// Rule text set under the canonical key wins over text set under an
    /// alias. Rules are compiled once until the text or the world changes.
    pub fn matcher(&self, key: &ContainerKey) -> Arc<TagRule> {
        let key = self.canonical(key);
        let generation = self.world.generation();
        {
            let cache = self.cache.read();
            if cache.generation == generation {
                if let Some(cached) = cache.rules.get(&key) {
                    return Arc::clone(&cached.rule);
                }
            }
        }

        let found = std::iter::once(key.clone())
            .chain(self.world.aliases(&key))
            .find_map(|book_key| self.filters.get(&book_key).map(|text| (book_key, text)));
        let (source, rule) = match found {
            Some((book_key, text)) => (Some(book_key), TagRule::compile(&text)),
            None => (None, TagRule::any()),
        };
        let rule = Arc::new(rule);

        let mut cache = self.cache.write();
        if cache.generation != generation {
            cache.rules.clear();
            cache.generation = generation;
        }
        cache.rules.insert(
            key,
            CachedRule {
                source,
                rule: Arc::clone(&rule),
            },
        );
        rule
    }

    /// Set the rule text of a container under its canonical key
    pub fn set_rule(&self, key: &ContainerKey, text: impl Into<String>) -> Result<bool> {
        let container = Container::open(&*self.world, key)?;
        Ok(self.filters.set(container.key().clone(), text))
    }

    /// Remove the rule of a container, whichever of its keys it was set under
    pub fn remove_rule(&self, key: &ContainerKey) -> Result<bool> {
        let container = Container::open(&*self.world, key)?;
        let mut removed = self.filters.remove(container.key());
        for alias in self.world.aliases(container.key()) {
            removed |= self.filters.remove(&alias);
        }
        Ok(removed)
    }

    fn canonical(&self, key: &ContainerKey) -> ContainerKey {
        self.world
            .lookup(key)
            .map_or_else(|| key.clone(), |entry| entry.key)
    }

    /// Ranked destinations for a request, source excluded
    ///
    /// Higher priority first; equal priorities keep the resolver's order.
    pub fn destinations(
        &self,
        actor: ActorId,
        source: &ContainerKey,
        scope: AccessibilityScope,
    ) -> Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = self
            .resolver()
            .resolve(actor, scope)?
            .filter(|candidate| candidate.container.key() != source)
            .collect();
        candidates.sort_by(|a, b| rank_destination(a, b));
        Ok(candidates)
    }

    /// Stash `request.amount` of `request.item` out of `request.source`
    pub fn stash(&self, request: &TransferRequest) -> Result<TransferOutcome> {
        let mut outcome = TransferOutcome::default();
        if request.amount == 0 {
            return Ok(outcome);
        }

        let source = Container::open(&*self.world, &request.source)?;
        let template = source.stack_of(&request.item).unwrap_or_else(|| {
            ItemStack::new(request.item.item_id.clone(), 0).with_quality(request.item.quality)
        });
        let candidates = self.destinations(request.actor, source.key(), request.scope)?;
        let resolver = self.resolver();
        let mut remaining = request.amount;

        for candidate in candidates {
            if remaining == 0 {
                break;
            }
            let destination = candidate.container;

            if !request.forced && !self.matcher(destination.key()).matches(&template) {
                log::trace!("{} rejects {}", destination.key(), request.item);
                continue;
            }

            let event = PreTransfer {
                actor: request.actor,
                source: source.key().clone(),
                destination: destination.clone(),
                item: template.clone(),
                amount: remaining,
                forced: request.forced,
            };
            if self.events.check(&event).is_prevented() {
                log::debug!("Transfer of {} into {} vetoed", request.item, destination.key());
                continue;
            }

            if !resolver.is_current(&source) {
                log::debug!("Source {} vanished, stopping", source.key());
                break;
            }
            if !resolver.is_current(&destination) {
                log::debug!("Destination {} vanished, skipping", destination.key());
                continue;
            }

            let available = source.count(&request.item);
            if available == 0 {
                break;
            }
            let wanted = remaining.min(available);
            let accepted = wanted - destination.try_add(&template, wanted);
            if accepted == 0 {
                continue;
            }

            let removed = source.try_remove(&request.item, accepted);
            if removed < accepted {
                // Take back what the source could not pay for
                let surplus = accepted - removed;
                destination.try_remove(&request.item, surplus);
                log::warn!(
                    "Source {} yielded {} of {}, rolled back {}",
                    source.key(),
                    removed,
                    accepted,
                    surplus
                );
            }
            if removed == 0 {
                break;
            }

            remaining -= removed;
            outcome.moved += removed;
            outcome.destinations.push(destination.key().clone());
            log::debug!(
                "Moved {} x {} from {} to {}",
                removed,
                request.item,
                source.key(),
                destination.key()
            );

            self.events.notify(&PostTransfer {
                actor: request.actor,
                from: source.key().clone(),
                to: destination.key().clone(),
                item: template.clone(),
                amount: removed,
            });
        }

        Ok(outcome.finish(template, remaining))
    }

    /// Stash everything in `source`, one request per distinct item
    pub fn stash_all(
        &self,
        actor: ActorId,
        source: &ContainerKey,
        scope: AccessibilityScope,
        forced: bool,
    ) -> Result<Vec<TransferOutcome>> {
        let container = Container::open(&*self.world, source)?;
        let specs = container.specs();

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            let amount = container.count(&spec);
            if amount == 0 {
                continue;
            }
            let request = TransferRequest::new(actor, container.key().clone(), spec, amount)
                .with_scope(scope)
                .forced(forced);
            outcomes.push(self.stash(&request)?);
        }

        log::debug!("Stashed {} item kind(s) from {}", outcomes.len(), container.key());
        Ok(outcomes)
    }
}

impl<W: StorageWorld + ?Sized> Drop for StashEngine<W> {
    fn drop(&mut self) {
        self.filters.unsubscribe(self.rule_subscription);
    }
}

impl<W: StorageWorld + ?Sized> fmt::Debug for StashEngine<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StashEngine")
            .field("config", &self.config)
            .field("cached_rules", &self.cache.read().rules.len())
            .finish()
    }
}
