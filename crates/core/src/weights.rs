//! Weight table model.
//!
//! A weight table maps a spec path suffix to its measured duration and the
//! weight derived from it:
//!
//! ```json
//! { "features/login.feature": { "time": 5321, "weight": 12 } }
//! ```
//!
//! Key order is part of the model: resolution rules that depend on
//! iteration order see the keys in the order the document lists them.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Measured duration and balancing weight for one spec suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    /// Measured duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,

    /// Balancing weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl WeightEntry {
    /// Entry carrying only a weight.
    pub fn weighted(weight: f64) -> Self {
        Self {
            time: None,
            weight: Some(weight),
        }
    }

    /// Entry carrying only a measured duration.
    pub fn timed(time: f64) -> Self {
        Self {
            time: Some(time),
            weight: None,
        }
    }
}

/// Suffix-keyed weight table in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    entries: Vec<(String, WeightEntry)>,
}

impl WeightTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, suffix: impl Into<String>, entry: WeightEntry) {
        let suffix = suffix.into();
        match self.entries.iter_mut().find(|(key, _)| *key == suffix) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((suffix, entry)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, suffix: impl Into<String>, entry: WeightEntry) -> Self {
        self.insert(suffix, entry);
        self
    }

    /// Look up an entry by exact key.
    pub fn get(&self, suffix: &str) -> Option<&WeightEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == suffix)
            .map(|(_, entry)| entry)
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WeightEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Overlay `other` on top of this table; its entries take precedence.
    pub fn merge(&mut self, other: &WeightTable) {
        for (key, entry) in other.iter() {
            self.insert(key, *entry);
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for WeightTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeightTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = WeightTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of spec suffixes to weight entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = WeightTable::new();
                while let Some((key, entry)) = access.next_entry::<String, WeightEntry>()? {
                    table.insert(key, entry);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
