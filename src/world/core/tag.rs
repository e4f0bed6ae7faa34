//! Tagged entity payloads
//!
//! A small structured-value tree attached to cells that carry more state than
//! a type and aux data can express (container contents, sign text, spawner
//! settings).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which containers keep their inventory
pub const ITEMS_KEY: &str = "Items";

/// A single tag value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Byte(i8),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(CompoundTag),
}

/// Named tags, ordered by key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundTag {
    entries: BTreeMap<String, Tag>,
}

impl CompoundTag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), value)
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: Tag) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether this tag holds a non-empty inventory list
    pub fn has_items(&self) -> bool {
        matches!(self.get(ITEMS_KEY), Some(Tag::List(items)) if !items.is_empty())
    }

    /// Copy `other`'s entries over this tag, replacing existing keys
    pub fn merge(&mut self, other: &CompoundTag) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}
