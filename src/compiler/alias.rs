//! Alias allocation.
//!
//! One [`AliasNamespace`] serves a statement (or a statement and the
//! statements nested inside it). Table aliases use the `T` prefix and
//! output column aliases the `A` prefix, drawn from the same allocator so
//! the two can never collide.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::attributes::AttributeRef;
use super::tables::TableId;

/// Identity of something that needs an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKey {
    Table(TableId),
    /// Item identity output column.
    ItemId,
    /// Presence output column of a joined aspect table.
    Presence(TableId),
    Attribute(AttributeRef),
    /// Value output column of a collection statement.
    Value,
    /// Aggregate count output column.
    Count,
    /// Derived table wrapping a nested statement.
    Derived,
}

/// Bijective map from keys to `<prefix><n>` aliases.
///
/// Entries are never removed, so a key keeps its alias for the lifetime of
/// the namespace.
#[derive(Debug, Clone)]
pub struct AliasNamespace<K = AliasKey> {
    aliases: HashMap<K, String>,
    used: HashSet<String>,
}

impl<K: Eq + Hash> AliasNamespace<K> {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            used: HashSet::new(),
        }
    }

    /// Alias of `key`, allocating `prefix` + the smallest free number on
    /// first use.
    pub fn get_or_create(&mut self, key: K, prefix: &str) -> String {
        if let Some(alias) = self.aliases.get(&key) {
            return alias.clone();
        }

        let alias = (0..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|candidate| !self.used.contains(candidate))
            .unwrap_or_else(|| prefix.to_string());
        tracing::trace!(alias = %alias, "alias allocated");

        self.used.insert(alias.clone());
        self.aliases.insert(key, alias.clone());
        alias
    }

    pub fn get(&self, key: &K) -> Option<&str> {
        self.aliases.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl<K: Eq + Hash> Default for AliasNamespace<K> {
    fn default() -> Self {
        Self::new()
    }
}
