use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for every item in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item instance. Items have no tile of their own; they live in an
/// entity's storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier for this item.
    pub id: ItemId,
    /// Index into the item type catalog.
    pub type_id: u32,
}

impl Item {
    /// Create an item of the given type.
    pub fn new(id: ItemId, type_id: u32) -> Self {
        Self { id, type_id }
    }

    /// Script reference text for this item.
    pub fn reference(&self) -> String {
        format!("$Item[{}]", self.id)
    }
}
