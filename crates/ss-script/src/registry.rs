use std::collections::HashMap;

use ss_world::{EntityId, ItemId, TypeDescriptor, World};

use crate::loader::ScriptCategory;
use crate::repository::{DeclaredFunction, FunctionDescriptor, FunctionId, FunctionRepository};

/// Per-type public function lists, computed once from the world's type
/// catalogs and the function repository.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entity_functions: HashMap<u32, Vec<FunctionId>>,
    item_functions: HashMap<u32, Vec<FunctionId>>,
}

impl TypeRegistry {
    /// Match every entity and item type to the functions whose owner name
    /// equals the type name (case-insensitive).
    pub fn build(world: &World, repository: &FunctionRepository) -> Self {
        let entity_functions = world
            .entity_types()
            .iter()
            .map(|t| (t.id(), repository.functions_for(ScriptCategory::Entity, t.name())))
            .collect();
        let item_functions = world
            .item_types()
            .iter()
            .map(|t| (t.id(), repository.functions_for(ScriptCategory::Item, t.name())))
            .collect();
        Self {
            entity_functions,
            item_functions,
        }
    }

    /// Public function ids of an entity type.
    pub fn entity_functions(&self, type_id: u32) -> &[FunctionId] {
        self.entity_functions
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Public function ids of an item type.
    pub fn item_functions(&self, type_id: u32) -> &[FunctionId] {
        self.item_functions
            .get(&type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve `name` among the public functions of an entity's type.
    pub fn resolve_entity_function<'r>(
        &self,
        world: &World,
        repository: &'r FunctionRepository,
        entity: EntityId,
        name: &str,
    ) -> Option<&'r FunctionDescriptor> {
        let type_id = world.entity(entity)?.type_id;
        find(repository, self.entity_functions(type_id), name)
    }

    /// Resolve `name` among the public functions of an item's type.
    pub fn resolve_item_function<'r>(
        &self,
        world: &World,
        repository: &'r FunctionRepository,
        item: ItemId,
        name: &str,
    ) -> Option<&'r FunctionDescriptor> {
        let type_id = world.item(item)?.type_id;
        find(repository, self.item_functions(type_id), name)
    }
}

fn find<'r>(repository: &'r FunctionRepository, ids: &[FunctionId], name: &str) -> Option<&'r FunctionDescriptor> {
    ids.iter()
        .filter_map(|id| repository.get(*id))
        .find(|f| f.name == name)
}

/// Functions named in the world's type catalogs.
pub fn declared_functions(world: &World) -> Vec<DeclaredFunction> {
    let entities = world.entity_types().iter().flat_map(|t| {
        t.declared_functions()
            .iter()
            .map(|f| DeclaredFunction::new(ScriptCategory::Entity, t.name(), f.as_str()))
    });
    let items = world.item_types().iter().flat_map(|t| {
        t.declared_functions()
            .iter()
            .map(|f| DeclaredFunction::new(ScriptCategory::Item, t.name(), f.as_str()))
    });
    entities.chain(items).collect()
}
