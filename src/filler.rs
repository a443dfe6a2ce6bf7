//! Filler lexicons: concrete items that resolve placeholder slots.
//!
//! A [`FillerTable`] holds candidate items for one slot base name (`agent`,
//! `object`, ...). Items carry a primary text field plus arbitrary string
//! attributes used in constraint matching. Tables fix their candidate order
//! once at construction with a dedicated shuffle seed, so every sampling
//! mode sees the same deterministic sequence.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, TelarError};
use crate::slots::{SlotKey, MAGNET_ITEM};
use crate::table::Table;

/// Seed fixing the candidate order of every filler table.
pub const FILLER_SHUFFLE_SEED: u64 = 42;

/// One concrete lexical item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillerItem {
    /// Primary text substituted into sentences.
    pub item: String,
    /// Attribute columns used as constraint keys, in table column order.
    pub attrs: Vec<(String, String)>,
}

impl FillerItem {
    /// Attribute value by key.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Whether an item satisfies every constraint of a slot key.
///
/// A magnet slot matches exactly the magnet item text and nothing else.
///
/// # Errors
///
/// Returns [`TelarError::Specification`] when a constraint references an
/// attribute the item does not carry.
pub fn item_matches(key: &SlotKey, item: &FillerItem) -> Result<bool> {
    if key.is_magnet {
        return Ok(item.item == MAGNET_ITEM);
    }
    for (k, v) in &key.constraints {
        match item.attr(k) {
            None => {
                return Err(TelarError::specification(format!(
                    "missing attribute `{k}={v}` in filler item `{}`",
                    item.item
                )))
            }
            Some(actual) if actual != v => return Ok(false),
            Some(_) => {}
        }
    }
    Ok(true)
}

/// A named table of filler items in deterministic shuffled order.
#[derive(Debug, Clone)]
pub struct FillerTable {
    name: String,
    items: Vec<FillerItem>,
}

impl FillerTable {
    /// Build a table, fixing the candidate order with
    /// [`FILLER_SHUFFLE_SEED`].
    #[must_use]
    pub fn new(name: impl Into<String>, mut items: Vec<FillerItem>) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(FILLER_SHUFFLE_SEED);
        items.shuffle(&mut rng);
        Self {
            name: name.into(),
            items,
        }
    }

    /// Build from a generic table with a mandatory `item` column; every
    /// other column becomes an attribute. The base name is the table
    /// identifier with its `filler-` prefix stripped.
    ///
    /// # Errors
    ///
    /// Returns [`TelarError::InvalidTable`] when the `item` column is
    /// missing.
    pub fn from_table(table: &Table) -> Result<Self> {
        table.require_columns(&["item"])?;
        let name = table
            .identifier()
            .strip_prefix("filler-")
            .unwrap_or(table.identifier())
            .to_string();
        let items = table
            .rows()
            .iter()
            .map(|row| FillerItem {
                item: row.get_or_empty("item").to_string(),
                attrs: row
                    .fields()
                    .filter(|(k, _)| *k != "item")
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .collect();
        Ok(Self::new(name, items))
    }

    /// Slot base name this table serves.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Items in the fixed shuffled order.
    #[must_use]
    pub fn items(&self) -> &[FillerItem] {
        &self.items
    }

    /// Items eligible for a slot key, in table order.
    ///
    /// # Errors
    ///
    /// Propagates constraint errors from [`item_matches`].
    pub fn eligible(&self, key: &SlotKey) -> Result<Vec<&FillerItem>> {
        let mut out = Vec::new();
        for item in &self.items {
            if item_matches(key, item)? {
                out.push(item);
            }
        }
        Ok(out)
    }
}
