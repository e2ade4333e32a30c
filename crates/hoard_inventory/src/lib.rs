//! Hoard Inventory - Items, Storage Backends and Filters
//!
//! This crate provides the item side of Hoard.
//!
//! # Features
//!
//! - Item definitions and stacks with quality and descriptive tags
//! - Slot inventory backend with max stack sizes and leftover reporting
//! - Tag filters compiled from rule text (`tag`, `!tag`, `tag*`)
//! - Filter book with rule-changed notifications
//! - Display ordering and destination ranking
//!
//! # Example
//!
//! ```
//! use hoard_inventory::prelude::*;
//!
//! let parsnip = ItemDefinition::new("parsnip", "Parsnip")
//!     .with_category(ItemCategory::Vegetable);
//!
//! let mut chest = Inventory::new(36);
//! let leftover = chest.try_add(&parsnip.stack(1), 40);
//! assert_eq!(leftover, 0);
//!
//! let rule = TagRule::compile("category_vegetable !quality_gold");
//! assert!(rule.matches(&parsnip.stack(1)));
//! ```

pub mod filter;
pub mod inventory;
pub mod item;
pub mod sort;

pub mod prelude {
    pub use crate::filter::{FilterBook, RuleChanged, TagPattern, TagRule, TagTerm, TokenError};
    pub use crate::inventory::{FillPolicy, Inventory, SharedInventory};
    pub use crate::item::{
        quality, ItemCategory, ItemDefinition, ItemSpec, ItemStack, DEFAULT_MAX_STACK,
    };
    pub use crate::sort::{compare_items, rank_destination, Ranked, SortMode};
}

pub use prelude::*;
