//! Slot inventory backend
//!
//! [`Inventory`] is the storage every container kind ends up writing to.
//! It never refuses an insert with an error: whatever does not fit is
//! handed back to the caller as a leftover amount.

use crate::item::{ItemDefinition, ItemSpec, ItemStack, DEFAULT_MAX_STACK};
use crate::sort::{compare_items, SortMode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to an inventory, used by every view of the same storage
pub type SharedInventory = Arc<RwLock<Inventory>>;

/// Where new items go first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Top up existing compatible stacks, then use empty slots
    #[default]
    MergeFirst,
    /// Use empty slots, then top up existing stacks
    EmptyFirst,
}

/// Inventory component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Inventory slots (None = empty)
    slots: Vec<Option<ItemStack>>,
    /// Placement order for new items
    fill_policy: FillPolicy,
    /// Stack size used for unregistered items
    default_max_stack: u32,
    /// Item definitions for stack size lookup
    #[serde(skip)]
    item_defs: HashMap<String, u32>, // item_id -> max_stack
}

impl Inventory {
    /// Create a new inventory with given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            fill_policy: FillPolicy::default(),
            default_max_stack: DEFAULT_MAX_STACK,
            item_defs: HashMap::new(),
        }
    }

    /// Create a new inventory behind a shared handle
    pub fn shared(capacity: usize) -> SharedInventory {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Set the fill policy
    pub fn with_fill_policy(mut self, policy: FillPolicy) -> Self {
        self.fill_policy = policy;
        self
    }

    /// Set the stack size used for unregistered items
    pub fn with_default_max_stack(mut self, max: u32) -> Self {
        self.default_max_stack = max.max(1);
        self
    }

    /// Move into a shared handle
    pub fn into_shared(self) -> SharedInventory {
        Arc::new(RwLock::new(self))
    }

    /// Register an item definition's stack size
    pub fn register(&mut self, definition: &ItemDefinition) {
        let max_stack = if definition.is_stackable() {
            definition.max_stack
        } else {
            1
        };
        self.register_item(definition.id.clone(), max_stack);
    }

    /// Register a stack size for an item id
    pub fn register_item(&mut self, item_id: impl Into<String>, max_stack: u32) {
        self.item_defs.insert(item_id.into(), max_stack.max(1));
    }

    /// Get max stack for an item
    pub fn max_stack(&self, item_id: &str) -> u32 {
        self.item_defs
            .get(item_id)
            .copied()
            .unwrap_or(self.default_max_stack)
    }

    /// Get inventory capacity
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Get number of used slots
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Get number of free slots
    pub fn free_slots(&self) -> usize {
        self.capacity() - self.used_slots()
    }

    /// Check if inventory is empty
    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    /// Get slot contents
    pub fn get_slot(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot)?.as_ref()
    }

    /// All slots in order, including empty ones
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    /// Count total quantity of an item
    pub fn count(&self, spec: &ItemSpec) -> u32 {
        self.items()
            .filter(|(_, stack)| stack.is(spec))
            .map(|(_, stack)| stack.quantity)
            .sum()
    }

    /// Distinct item specs in first-slot order
    pub fn specs(&self) -> Vec<ItemSpec> {
        let mut specs: Vec<ItemSpec> = Vec::new();
        for (_, stack) in self.items() {
            if !specs.iter().any(|spec| stack.is(spec)) {
                specs.push(stack.spec());
            }
        }
        specs
    }

    /// How much of `item` could still be added
    pub fn room_for(&self, item: &ItemStack) -> u32 {
        let max_stack = self.max_stack(&item.item_id);
        let topping: u32 = self
            .items()
            .filter(|(_, stack)| stack.can_merge(item))
            .map(|(_, stack)| max_stack.saturating_sub(stack.quantity))
            .sum();
        topping.saturating_add((self.free_slots() as u32).saturating_mul(max_stack))
    }

    /// Add `amount` copies of `item`
    ///
    /// `item` only provides identity and tags; its own quantity is ignored.
    /// Returns the amount that could not be placed.
    pub fn try_add(&mut self, item: &ItemStack, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }

        match self.fill_policy {
            FillPolicy::MergeFirst => {
                let remaining = self.top_up(item, amount);
                self.fill_empty(item, remaining)
            }
            FillPolicy::EmptyFirst => {
                let remaining = self.fill_empty(item, amount);
                self.top_up(item, remaining)
            }
        }
    }

    /// Add a whole stack, returns overflow (amount that couldn't fit)
    pub fn add_item(&mut self, stack: ItemStack) -> u32 {
        let amount = stack.quantity;
        self.try_add(&stack, amount)
    }

    fn top_up(&mut self, item: &ItemStack, mut remaining: u32) -> u32 {
        let max_stack = self.max_stack(&item.item_id);

        for existing in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if existing.can_merge(item) && existing.quantity < max_stack {
                remaining = existing.add(remaining, max_stack);
            }
        }

        remaining
    }

    fn fill_empty(&mut self, item: &ItemStack, mut remaining: u32) -> u32 {
        let max_stack = self.max_stack(&item.item_id);

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let amount = remaining.min(max_stack);
                *slot = Some(item.with_quantity(amount));
                remaining -= amount;
            }
        }

        remaining
    }

    /// Remove up to `amount` of `spec`
    ///
    /// Whole stacks that fit in the remaining amount are emptied before
    /// another stack is partially reduced. Returns the amount removed.
    pub fn try_remove(&mut self, spec: &ItemSpec, amount: u32) -> u32 {
        let mut remaining = amount;

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if let Some(stack) = slot {
                if stack.is(spec) && stack.quantity <= remaining {
                    remaining -= stack.quantity;
                    *slot = None;
                }
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if let Some(stack) = slot {
                if stack.is(spec) {
                    remaining -= stack.remove(remaining);
                    if stack.is_empty() {
                        *slot = None;
                    }
                }
            }
        }

        amount - remaining
    }

    /// Clear a slot
    pub fn clear_slot(&mut self, slot: usize) -> Option<ItemStack> {
        self.slots.get_mut(slot)?.take()
    }

    /// Get all items as iterator
    pub fn items(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|stack| (i, stack)))
    }

    /// Merge stacks, remove gaps and order slots by `mode`
    ///
    /// Returns `false` and leaves the slots untouched when the contents no
    /// longer fit, e.g. after a max stack size was lowered.
    pub fn organize(&mut self, mode: SortMode) -> bool {
        let mut items: Vec<ItemStack> = self.items().map(|(_, stack)| stack.clone()).collect();
        // Stable, so `SortMode::Default` keeps slot order
        items.sort_by(|a, b| compare_items(a, b, mode));

        let mut scratch = Self {
            slots: vec![None; self.slots.len()],
            fill_policy: FillPolicy::MergeFirst,
            default_max_stack: self.default_max_stack,
            item_defs: self.item_defs.clone(),
        };
        for item in items {
            if scratch.add_item(item) > 0 {
                log::warn!("Cannot organize inventory without dropping items, keeping slot order");
                return false;
            }
        }

        // Merging can change quantities, so order once more
        let mut merged: Vec<ItemStack> = scratch.slots.into_iter().flatten().collect();
        merged.sort_by(|a, b| compare_items(a, b, mode));
        let capacity = self.slots.len();
        self.slots = merged
            .into_iter()
            .map(Some)
            .chain(std::iter::repeat(None))
            .take(capacity)
            .collect();
        true
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(36)
    }
}
