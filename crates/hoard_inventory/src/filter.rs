//! Tag filters
//!
//! Rule text is compiled once into a [`TagRule`] and then matched against
//! item tags without looking at the text again.
//!
//! ```text
//! category_vegetable season_* !quality_iridium
//! ```
//!
//! A bare token is required, `!token` is excluded, and a trailing `*`
//! turns either into a prefix match.

use crate::item::ItemStack;
use hoard_core::ContainerKey;
use hoard_event::{Observers, Priority, SubscriberId};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Bound;
use thiserror::Error;

/// Why a token was dropped during compilation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has no tag")]
    Empty,
    #[error("wildcard is only allowed at the end of a token")]
    InteriorWildcard,
    #[error("negation can only be used once")]
    RepeatedNegation,
    #[error("invalid character {0:?}")]
    InvalidChar(char),
}

/// What a term compares against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagPattern {
    /// The tag itself
    Exact(String),
    /// Any tag starting with the stem
    Prefix(String),
}

impl TagPattern {
    /// Check if any of `tags` matches
    pub fn matches_any(&self, tags: &BTreeSet<String>) -> bool {
        match self {
            Self::Exact(tag) => tags.contains(tag),
            Self::Prefix(stem) => tags
                .range::<str, _>((Bound::Included(stem.as_str()), Bound::Unbounded))
                .next()
                .is_some_and(|tag| tag.starts_with(stem.as_str())),
        }
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(tag) => write!(f, "{}", tag),
            Self::Prefix(stem) => write!(f, "{}*", stem),
        }
    }
}

/// One compiled token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagTerm {
    Required(TagPattern),
    Excluded(TagPattern),
}

impl TagTerm {
    /// Parse a single token
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let token = token.to_lowercase();
        let (excluded, body) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token.as_str()),
        };
        if body.starts_with('!') {
            return Err(TokenError::RepeatedNegation);
        }

        let (prefix, tag) = match body.strip_suffix('*') {
            Some(stem) => (true, stem),
            None => (false, body),
        };
        if tag.is_empty() {
            return Err(TokenError::Empty);
        }
        if let Some(c) = tag.chars().find(|c| !is_tag_char(*c)) {
            return Err(if c == '*' {
                TokenError::InteriorWildcard
            } else {
                TokenError::InvalidChar(c)
            });
        }

        let pattern = if prefix {
            TagPattern::Prefix(tag.to_string())
        } else {
            TagPattern::Exact(tag.to_string())
        };
        Ok(if excluded {
            Self::Excluded(pattern)
        } else {
            Self::Required(pattern)
        })
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | ':' | '.' | '-' | '/')
}

impl fmt::Display for TagTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required(pattern) => write!(f, "{}", pattern),
            Self::Excluded(pattern) => write!(f, "!{}", pattern),
        }
    }
}

/// A compiled tag filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRule {
    terms: Vec<TagTerm>,
    rejected: Vec<(String, TokenError)>,
}

impl TagRule {
    /// A rule with no terms, which matches every item
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile rule text
    ///
    /// Malformed tokens are dropped with a warning and kept in
    /// [`TagRule::rejected`]; the remaining tokens still form a rule.
    pub fn compile(text: &str) -> Self {
        let mut rule = Self::default();
        for token in text.split_whitespace() {
            match TagTerm::parse(token) {
                Ok(term) => {
                    if !rule.terms.contains(&term) {
                        rule.terms.push(term);
                    }
                }
                Err(err) => {
                    log::warn!("Dropping filter token '{}': {}", token, err);
                    rule.rejected.push((token.to_string(), err));
                }
            }
        }
        rule
    }

    /// Check if `item` passes this rule
    pub fn matches(&self, item: &ItemStack) -> bool {
        self.matches_tags(&item.tags)
    }

    /// Check a raw tag set
    pub fn matches_tags(&self, tags: &BTreeSet<String>) -> bool {
        let required_ok = self.required().all(|pattern| pattern.matches_any(tags));
        let excluded_ok = !self.excluded().any(|pattern| pattern.matches_any(tags));
        required_ok && excluded_ok
    }

    /// Required patterns
    pub fn required(&self) -> impl Iterator<Item = &TagPattern> {
        self.terms.iter().filter_map(|term| match term {
            TagTerm::Required(pattern) => Some(pattern),
            TagTerm::Excluded(_) => None,
        })
    }

    /// Excluded patterns
    pub fn excluded(&self) -> impl Iterator<Item = &TagPattern> {
        self.terms.iter().filter_map(|term| match term {
            TagTerm::Excluded(pattern) => Some(pattern),
            TagTerm::Required(_) => None,
        })
    }

    /// All compiled terms in source order
    pub fn terms(&self) -> &[TagTerm] {
        &self.terms
    }

    /// Tokens dropped during compilation
    pub fn rejected(&self) -> &[(String, TokenError)] {
        &self.rejected
    }

    /// Check if the rule has no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for TagRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", term)?;
            first = false;
        }
        Ok(())
    }
}

/// Raised when the rule text of one or more containers changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleChanged {
    pub targets: Vec<ContainerKey>,
}

/// Rule text per container, with change notification
///
/// The book only stores text. Whoever compiles and caches rules subscribes
/// to [`FilterBook::on_rule_changed`].
#[derive(Debug, Default)]
pub struct FilterBook {
    rules: RwLock<HashMap<ContainerKey, String>>,
    changed: Observers<RuleChanged>,
}

impl FilterBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule text for `key`
    pub fn get(&self, key: &ContainerKey) -> Option<String> {
        self.rules.read().get(key).cloned()
    }

    /// Set rule text, returns whether anything changed
    pub fn set(&self, key: ContainerKey, text: impl Into<String>) -> bool {
        self.set_many([(key, text.into())]) > 0
    }

    /// Set several rules with a single notification, returns the number changed
    pub fn set_many<I>(&self, rules: I) -> usize
    where
        I: IntoIterator<Item = (ContainerKey, String)>,
    {
        let mut targets = Vec::new();
        {
            let mut book = self.rules.write();
            for (key, text) in rules {
                if book.get(&key) != Some(&text) {
                    book.insert(key.clone(), text);
                    targets.push(key);
                }
            }
        }
        self.raise(targets)
    }

    /// Remove the rule for `key`, returns whether one existed
    pub fn remove(&self, key: &ContainerKey) -> bool {
        let removed = self.rules.write().remove(key).is_some();
        if removed {
            self.raise(vec![key.clone()]);
        }
        removed
    }

    /// Subscribe to rule changes
    pub fn on_rule_changed<F>(&self, priority: impl Into<Priority>, handler: F) -> SubscriberId
    where
        F: Fn(&RuleChanged) + Send + Sync + 'static,
    {
        self.changed.subscribe_with_priority(priority, handler)
    }

    /// Unsubscribe from rule changes
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.changed.unsubscribe(id)
    }

    /// Number of rule-changed subscribers
    pub fn listeners(&self) -> usize {
        self.changed.len()
    }

    fn raise(&self, targets: Vec<ContainerKey>) -> usize {
        let count = targets.len();
        if count > 0 {
            log::debug!("Filter rules changed for {} container(s)", count);
            self.changed.notify(&RuleChanged { targets });
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(tags: &[&str]) -> ItemStack {
        ItemStack::new("thing", 1).with_tags(tags)
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        let rule = TagRule::compile("   ");
        assert!(rule.is_empty());
        assert!(rule.matches(&item(&[])));
        assert!(rule.matches(&item(&["anything"])));
    }

    #[test]
    fn test_required_and_excluded() {
        let rule = TagRule::compile("category_vegetable !quality_gold");

        assert!(rule.matches(&item(&["category_vegetable"])));
        assert!(!rule.matches(&item(&["category_vegetable", "quality_gold"])));
        assert!(!rule.matches(&item(&["category_fruit"])));
    }

    #[test]
    fn test_every_required_must_match() {
        let rule = TagRule::compile("a b");
        assert!(rule.matches(&item(&["a", "b", "c"])));
        assert!(!rule.matches(&item(&["a"])));
    }

    #[test]
    fn test_prefix_wildcards() {
        let rule = TagRule::compile("vegetable* !vegetable_rotten*");

        assert!(rule.matches(&item(&["vegetable_root"])));
        assert!(rule.matches(&item(&["aaa", "vegetable"])));
        assert!(!rule.matches(&item(&["vegetable_rotten_old"])));
        assert!(!rule.matches(&item(&["vegetal"])));
    }

    #[test]
    fn test_case_insensitive() {
        let rule = TagRule::compile("Category_Fish");
        assert!(rule.matches(&item(&["CATEGORY_FISH"])));
        assert_eq!(rule.to_string(), "category_fish");
    }

    #[test]
    fn test_malformed_tokens_dropped() {
        let rule = TagRule::compile("fish ! * !* !!bad ve*g ok$ fruit*");

        assert_eq!(rule.to_string(), "fish fruit*");
        let errors: Vec<&TokenError> = rule.rejected().iter().map(|(_, e)| e).collect();
        assert_eq!(
            errors,
            vec![
                &TokenError::Empty,
                &TokenError::Empty,
                &TokenError::Empty,
                &TokenError::RepeatedNegation,
                &TokenError::InteriorWildcard,
                &TokenError::InvalidChar('$'),
            ]
        );
    }

    #[test]
    fn test_matching_is_stable() {
        let rule = TagRule::compile("a* !b");
        let thing = item(&["apple"]);
        let first = rule.matches(&thing);
        assert_eq!(first, rule.matches(&thing));
        assert!(first);
    }

    #[test]
    fn test_filter_book_notifies_changes() {
        let book = FilterBook::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        book.on_rule_changed(Priority::NORMAL, move |event: &RuleChanged| {
            seen_clone.lock().push(event.targets.clone());
        });

        let key = ContainerKey::placed("farm", 1, 1);
        assert!(book.set(key.clone(), "fish"));
        // Same text is not a change
        assert!(!book.set(key.clone(), "fish"));
        assert!(book.remove(&key));
        assert!(!book.remove(&key));

        let other = ContainerKey::household("farm");
        let changed =
            book.set_many(vec![(key.clone(), "a".to_string()), (other.clone(), "b".to_string())]);
        assert_eq!(changed, 2);

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], vec![key, other]);
    }
}
