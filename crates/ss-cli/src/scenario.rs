//! JSON scenario files: type catalogs plus the entities to spawn.

use std::path::Path;

use serde::Deserialize;

use ss_world::{Direction, EntityId, EntityType, ItemType, SERVER_OWNER, TilePos, TypeCatalog, World};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub item_types: Vec<ItemType>,
    pub entities: Vec<EntitySpec>,
}

/// One entity to spawn, optionally with a script attached.
#[derive(Debug, Deserialize)]
pub struct EntitySpec {
    /// Entity type name.
    #[serde(rename = "type")]
    pub type_name: String,
    pub position: [i32; 3],
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "server_owner")]
    pub owner: i32,
    /// Behavior script name, loaded from `behavior/`.
    #[serde(default)]
    pub script: Option<String>,
    /// Inline script text.
    #[serde(default)]
    pub source: Option<String>,
    /// Item type names placed into the entity's storage.
    #[serde(default)]
    pub items: Vec<String>,
}

fn server_owner() -> i32 {
    SERVER_OWNER
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| format!("invalid scenario {}: {e}", path.display()))
    }

    /// Build the world and spawn every entity, returning their ids in
    /// scenario order.
    pub fn build_world(&self) -> Result<(World, Vec<EntityId>), String> {
        let mut world = World::new(
            TypeCatalog::new(self.entity_types.clone()),
            TypeCatalog::new(self.item_types.clone()),
        );

        let mut ids = Vec::with_capacity(self.entities.len());
        for spec in &self.entities {
            let type_id = world
                .entity_types()
                .find_by_name(&spec.type_name)
                .map(|t| t.id)
                .ok_or_else(|| format!("unknown entity type '{}'", spec.type_name))?;
            let [x, y, z] = spec.position;
            let id = world
                .spawn(type_id, TilePos::new(x, y, z), spec.owner)
                .map_err(|e| e.to_string())?;
            world.set_direction(id, spec.direction).map_err(|e| e.to_string())?;

            for item_name in &spec.items {
                let item_type = world
                    .item_types()
                    .find_by_name(item_name)
                    .map(|t| t.id)
                    .ok_or_else(|| format!("unknown item type '{item_name}'"))?;
                world.give_item(id, item_type).map_err(|e| format!("{}: {e}", spec.type_name))?;
            }
            ids.push(id);
        }

        Ok((world, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_world_from_json() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "name": "pair",
                "entity_types": [
                    { "id": 0, "name": "Npc", "storage_slots": 2 },
                    { "id": 1, "name": "Door", "solid": true }
                ],
                "item_types": [{ "id": 0, "name": "Key" }],
                "entities": [
                    { "type": "Npc", "position": [0, 0, 0], "direction": "right", "items": ["Key"] },
                    { "type": "Door", "position": [1, 0, 0], "owner": 4 }
                ]
            }"#,
        )
        .unwrap();

        let (world, ids) = scenario.build_world().unwrap();
        assert_eq!(ids.len(), 2);
        let npc = world.entity(ids[0]).unwrap();
        assert_eq!(npc.direction, Direction::Right);
        assert_eq!(npc.owner_id, SERVER_OWNER);
        assert!(npc.item_in_slot(0).is_some());
        assert_eq!(world.entity(ids[1]).unwrap().owner_id, 4);
    }

    #[test]
    fn unknown_types_are_reported() {
        let scenario: Scenario = serde_json::from_str(
            r#"{ "entity_types": [], "entities": [{ "type": "Ghost", "position": [0, 0, 0] }] }"#,
        )
        .unwrap();
        assert_eq!(scenario.build_world().unwrap_err(), "unknown entity type 'Ghost'");
    }
}
