//! Item definitions and stacks

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default maximum stack size when an item is not registered
pub const DEFAULT_MAX_STACK: u32 = 999;

/// Item quality levels
pub mod quality {
    pub const NORMAL: u8 = 0;
    pub const SILVER: u8 = 1;
    pub const GOLD: u8 = 2;
    pub const IRIDIUM: u8 = 4;
}

/// Item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Vegetable,
    Fruit,
    Flower,
    Seed,
    Fish,
    Mineral,
    Material,
    Cooking,
    Tool,
    /// Storages that can themselves be carried or held
    Container,
    /// Misc items
    Misc,
}

impl Default for ItemCategory {
    fn default() -> Self {
        Self::Misc
    }
}

impl ItemCategory {
    /// Descriptive tag every item of this category carries
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Vegetable => "category_vegetable",
            Self::Fruit => "category_fruit",
            Self::Flower => "category_flower",
            Self::Seed => "category_seed",
            Self::Fish => "category_fish",
            Self::Mineral => "category_mineral",
            Self::Material => "category_material",
            Self::Cooking => "category_cooking",
            Self::Tool => "category_tool",
            Self::Container => "category_container",
            Self::Misc => "category_misc",
        }
    }
}

/// Item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: ItemCategory,
    /// Maximum stack size (1 = not stackable)
    pub max_stack: u32,
    /// Tags for filtering
    pub tags: BTreeSet<String>,
}

impl ItemDefinition {
    /// Create a new item definition
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: ItemCategory::default(),
            max_stack: DEFAULT_MAX_STACK,
            tags: BTreeSet::new(),
        }
    }

    /// Set category
    pub fn with_category(mut self, category: ItemCategory) -> Self {
        self.category = category;
        self
    }

    /// Set max stack size
    pub fn with_max_stack(mut self, max: u32) -> Self {
        self.max_stack = max.max(1);
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.insert(tag.as_ref().to_lowercase());
        self
    }

    /// Check if stackable
    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Create a stack of this item
    ///
    /// The stack carries the definition's tags plus its category tag.
    pub fn stack(&self, quantity: u32) -> ItemStack {
        let mut stack = ItemStack::new(self.id.clone(), quantity).with_tag(self.category.tag());
        stack.tags.extend(self.tags.iter().cloned());
        stack
    }
}

/// The identity of a stack, without its count or tags
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemSpec {
    pub item_id: String,
    pub quality: u8,
}

impl ItemSpec {
    pub fn new(item_id: impl Into<String>, quality: u8) -> Self {
        Self {
            item_id: item_id.into(),
            quality,
        }
    }
}

impl fmt::Display for ItemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quality == quality::NORMAL {
            write!(f, "{}", self.item_id)
        } else {
            write!(f, "{}@q{}", self.item_id, self.quality)
        }
    }
}

/// A stack of items in an inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item ID (references ItemDefinition)
    pub item_id: String,
    /// Quality or variant
    pub quality: u8,
    /// Quantity
    pub quantity: u32,
    /// Descriptive tags, always lowercase
    pub tags: BTreeSet<String>,
}

impl ItemStack {
    /// Create a new item stack of normal quality
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quality: quality::NORMAL,
            quantity,
            tags: BTreeSet::new(),
        }
    }

    /// Set quality
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.insert(tag.as_ref().to_lowercase());
        self
    }

    /// Add several tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.tags.insert(tag.as_ref().to_lowercase());
        }
        self
    }

    /// Same item with another quantity
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// The identity of this stack
    pub fn spec(&self) -> ItemSpec {
        ItemSpec::new(self.item_id.clone(), self.quality)
    }

    /// Check if this stack is of `spec`
    pub fn is(&self, spec: &ItemSpec) -> bool {
        self.item_id == spec.item_id && self.quality == spec.quality
    }

    /// Check if item has a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check if this stack is empty
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Add to this stack (returns overflow if any)
    pub fn add(&mut self, amount: u32, max_stack: u32) -> u32 {
        let space = max_stack.saturating_sub(self.quantity);
        let to_add = amount.min(space);
        self.quantity += to_add;
        amount - to_add
    }

    /// Remove from this stack (returns amount actually removed)
    pub fn remove(&mut self, amount: u32) -> u32 {
        let to_remove = amount.min(self.quantity);
        self.quantity -= to_remove;
        to_remove
    }

    /// Check if stacks can be merged (same item ID and quality)
    pub fn can_merge(&self, other: &ItemStack) -> bool {
        self.item_id == other.item_id && self.quality == other.quality
    }
}
