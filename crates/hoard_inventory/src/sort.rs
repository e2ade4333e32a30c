//! Ordering policy for item display and destination ranking

use crate::item::ItemStack;
use hoard_core::ContainerKey;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Display sort mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Keep the current order
    #[default]
    Default,
    /// Type, then quality, then quantity (largest first)
    Type,
    /// Quality, then type, then quantity (largest first)
    Quality,
    /// Quantity (largest first), then type, then quality
    Quantity,
}

/// Compare two stacks for display
pub fn compare_items(a: &ItemStack, b: &ItemStack, mode: SortMode) -> Ordering {
    let by_type = || a.item_id.cmp(&b.item_id);
    let by_quality = || a.quality.cmp(&b.quality);
    let by_quantity = || b.quantity.cmp(&a.quantity);

    match mode {
        SortMode::Default => Ordering::Equal,
        SortMode::Type => by_type().then_with(by_quality).then_with(by_quantity),
        SortMode::Quality => by_quality().then_with(by_type).then_with(by_quantity),
        SortMode::Quantity => by_quantity().then_with(by_type).then_with(by_quality),
    }
}

/// Anything that can compete as a stash destination
pub trait Ranked {
    /// Declared priority, higher is tried first
    fn priority(&self) -> i32;
    /// Position in the order the destination was discovered
    fn position(&self) -> usize;
    /// Identity key
    fn key(&self) -> &ContainerKey;
}

/// Order two stash destinations
///
/// Higher priority first, then discovery order. Key text only separates
/// destinations that share a position.
pub fn rank_destination<R: Ranked + ?Sized>(a: &R, b: &R) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| a.position().cmp(&b.position()))
        .then_with(|| a.key().lexical_cmp(b.key()))
}
