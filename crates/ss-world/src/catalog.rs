use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Common view over entity and item type descriptors.
pub trait TypeDescriptor {
    /// Catalog id of the type.
    fn id(&self) -> u32;
    /// Display name; also the owner name used by script filenames.
    fn name(&self) -> &str;
    /// Function names declared by the type, with or without a script file.
    fn declared_functions(&self) -> &[String];
}

/// Descriptor for a kind of entity (e.g. "Character", "Chest").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    /// Catalog id.
    pub id: u32,
    /// Type name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Whether the type blocks other entities from entering its tile.
    #[serde(default)]
    pub solid: bool,
    /// Footprint radius; 1 is a single tile.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Number of inventory slots spawned entities start with.
    #[serde(default)]
    pub storage_slots: usize,
    /// Default integer variables for spawned entities.
    #[serde(default)]
    pub variables: BTreeMap<String, i64>,
    /// Function names referenced by this type.
    #[serde(default)]
    pub functions: Vec<String>,
}

fn default_size() -> u32 {
    1
}

impl EntityType {
    /// Create a non-solid type with no storage.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            solid: false,
            size: 1,
            storage_slots: 0,
            variables: BTreeMap::new(),
            functions: Vec::new(),
        }
    }

    /// Mark the type as solid.
    pub fn solid(mut self) -> Self {
        self.solid = true;
        self
    }

    /// Give spawned entities `slots` empty inventory slots.
    pub fn with_storage(mut self, slots: usize) -> Self {
        self.storage_slots = slots;
        self
    }

    /// Add a default integer variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

impl TypeDescriptor for EntityType {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn declared_functions(&self) -> &[String] {
        &self.functions
    }
}

/// Descriptor for a kind of item (e.g. "Wood", "Key").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    /// Catalog id.
    pub id: u32,
    /// Type name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Function names referenced by this type.
    #[serde(default)]
    pub functions: Vec<String>,
}

impl ItemType {
    /// Create an item type.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            functions: Vec::new(),
        }
    }
}

impl TypeDescriptor for ItemType {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn declared_functions(&self) -> &[String] {
        &self.functions
    }
}

/// A JSON-backed list of type descriptors, `{ "types": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned", serialize = "T: Serialize"))]
pub struct TypeCatalog<T> {
    /// Descriptors, in file order.
    pub types: Vec<T>,
}

impl<T> Default for TypeCatalog<T> {
    fn default() -> Self {
        Self { types: Vec::new() }
    }
}

impl<T: TypeDescriptor + Serialize + DeserializeOwned> TypeCatalog<T> {
    /// Build a catalog from descriptors.
    pub fn new(types: Vec<T>) -> Self {
        Self { types }
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> WorldResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> WorldResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Write the catalog as pretty JSON.
    pub fn save(&self, path: &Path) -> WorldResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| WorldError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: u32) -> Option<&T> {
        self.types.iter().find(|t| t.id() == id)
    }

    /// Look up a descriptor by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&T> {
        self.types.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Iterate over all descriptors.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.types.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entity_catalog_with_defaults() {
        let json = r#"{ "types": [
            { "id": 0, "name": "Character", "solid": true, "variables": { "Health": 10 } },
            { "id": 1, "name": "Door", "functions": ["open"] }
        ] }"#;
        let catalog = TypeCatalog::<EntityType>::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let character = catalog.get(0).unwrap();
        assert!(character.solid);
        assert_eq!(character.size, 1);
        assert_eq!(character.variables.get("Health"), Some(&10));
        assert_eq!(catalog.find_by_name("door").unwrap().functions, vec!["open"]);
    }

    #[test]
    fn save_and_reload_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("itemTypeData.json");
        let catalog = TypeCatalog::new(vec![ItemType::new(0, "Wood"), ItemType::new(1, "Key")]);
        catalog.save(&path).unwrap();

        let loaded = TypeCatalog::<ItemType>::load(&path).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = TypeCatalog::<ItemType>::load(Path::new("/nonexistent/types.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/types.json"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(TypeCatalog::<ItemType>::from_json("{ not json").is_err());
    }
}
