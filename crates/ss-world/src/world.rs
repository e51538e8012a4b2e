use std::collections::{BTreeMap, HashMap};

use crate::catalog::{EntityType, ItemType, TypeCatalog};
use crate::entity::{Command, Direction, Entity, EntityId, TilePos};
use crate::error::{WorldError, WorldResult};
use crate::event::{EventLog, WorldEvent, WorldEventKind};
use crate::item::{Item, ItemId};

/// Tunables for entity behavior.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Cooldown applied after a successful step.
    pub ticks_per_movement: u32,
    /// Upper bound for any cooldown.
    pub max_cooldown: u32,
    /// Visible log lines kept per entity (0 = unlimited).
    pub max_log_lines: usize,
    /// Maximum event log size (0 = unlimited).
    pub max_events: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ticks_per_movement: 8,
            max_cooldown: 100,
            max_log_lines: 10,
            max_events: 0,
        }
    }
}

impl WorldConfig {
    /// Set the cooldown applied after a successful step.
    pub fn with_ticks_per_movement(mut self, ticks: u32) -> Self {
        self.ticks_per_movement = ticks;
        self
    }

    /// Set the number of visible log lines kept per entity.
    pub fn with_max_log_lines(mut self, lines: usize) -> Self {
        self.max_log_lines = lines;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}

/// The tile world. Owns entities, items, type catalogs, and the tile index.
///
/// Positions must only change through [`World::try_move`] so the tile index
/// stays consistent.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    entity_types: TypeCatalog<EntityType>,
    item_types: TypeCatalog<ItemType>,
    entities: BTreeMap<EntityId, Entity>,
    items: BTreeMap<ItemId, Item>,

    // Indexes
    tiles: HashMap<TilePos, Vec<EntityId>>,

    next_entity: u32,
    next_item: u32,
    events: EventLog,
    tick: u64,
}

impl World {
    /// Create an empty world over the given catalogs.
    pub fn new(entity_types: TypeCatalog<EntityType>, item_types: TypeCatalog<ItemType>) -> Self {
        Self::with_config(entity_types, item_types, WorldConfig::default())
    }

    /// Create an empty world with explicit tunables.
    pub fn with_config(
        entity_types: TypeCatalog<EntityType>,
        item_types: TypeCatalog<ItemType>,
        config: WorldConfig,
    ) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            config,
            entity_types,
            item_types,
            entities: BTreeMap::new(),
            items: BTreeMap::new(),
            tiles: HashMap::new(),
            next_entity: 0,
            next_item: 0,
            events,
            tick: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn entity_types(&self) -> &TypeCatalog<EntityType> {
        &self.entity_types
    }

    pub fn item_types(&self) -> &TypeCatalog<ItemType> {
        &self.item_types
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Spawn an entity of `type_id` at `pos`, seeded from its type.
    pub fn spawn(&mut self, type_id: u32, pos: TilePos, owner_id: i32) -> WorldResult<EntityId> {
        let ty = self
            .entity_types
            .get(type_id)
            .ok_or(WorldError::UnknownEntityType(type_id))?;

        let id = EntityId(self.next_entity);
        let mut entity = Entity::new(id, type_id, pos, owner_id);
        for (name, value) in &ty.variables {
            entity.set_variable(name.clone(), *value);
        }
        entity.storage = vec![None; ty.storage_slots];

        self.insert_entity(entity)
    }

    /// Insert a fully built entity (e.g. restored from saved data).
    pub fn insert_entity(&mut self, mut entity: Entity) -> WorldResult<EntityId> {
        if self.entity_types.get(entity.type_id).is_none() {
            return Err(WorldError::UnknownEntityType(entity.type_id));
        }
        let id = entity.id;
        if id.0 >= self.next_entity {
            self.next_entity = id.0 + 1;
        }
        entity.sync_position_variables();
        self.tiles.entry(entity.pos).or_default().push(id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity from the world and the tile index.
    pub fn remove_entity(&mut self, id: EntityId) -> WorldResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        self.unindex(id, entity.pos);
        Ok(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Type descriptor of an entity.
    pub fn entity_type_of(&self, id: EntityId) -> Option<&EntityType> {
        self.entity(id)
            .and_then(|e| self.entity_types.get(e.type_id))
    }

    /// All entities standing on `pos`, in arrival order.
    pub fn entities_at(&self, pos: TilePos) -> &[EntityId] {
        self.tiles.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first entity standing on `pos`.
    pub fn entity_at(&self, pos: TilePos) -> Option<EntityId> {
        self.entities_at(pos).first().copied()
    }

    /// Whether any entity on `pos` is of a solid type.
    pub fn tile_is_solid(&self, pos: TilePos) -> bool {
        self.entities_at(pos).iter().any(|id| {
            self.entity_type_of(*id).is_some_and(|t| t.solid)
        })
    }

    /// Move an entity to `to`. With `solid_check`, the move fails when the
    /// target tile holds a solid entity. Returns whether the entity moved.
    pub fn try_move(&mut self, id: EntityId, to: TilePos, solid_check: bool) -> WorldResult<bool> {
        let from = self.entity(id).ok_or(WorldError::EntityNotFound(id))?.pos;
        if solid_check && self.tile_is_solid(to) {
            return Ok(false);
        }

        self.unindex(id, from);
        self.tiles.entry(to).or_default().push(id);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.pos = to;
            entity.sync_position_variables();
        }
        self.emit(WorldEventKind::Moved { entity: id, from, to });
        Ok(true)
    }

    /// Turn an entity to face `direction`.
    pub fn set_direction(&mut self, id: EntityId, direction: Direction) -> WorldResult<()> {
        let entity = self.entity_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        entity.direction = direction;
        Ok(())
    }

    /// Queue a command on an entity. Only the entity's owner may command it.
    pub fn send_command(&mut self, id: EntityId, command: Command, sender: i32) -> WorldResult<()> {
        let entity = self.entity_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        if entity.owner_id != sender {
            return Err(WorldError::NotAuthorized {
                entity: id,
                sender,
                owner: entity.owner_id,
            });
        }
        entity.push_command(command);
        Ok(())
    }

    /// Raise an entity's cooldown to at least `ticks`.
    pub fn extend_cooldown(&mut self, id: EntityId, ticks: u32) -> WorldResult<()> {
        let max = self.config.max_cooldown;
        let entity = self.entity_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        entity.extend_cooldown(ticks, max);
        Ok(())
    }

    /// Append a line to an entity's visible log.
    pub fn append_log(&mut self, id: EntityId, message: impl Into<String>) -> WorldResult<()> {
        let message = message.into();
        let max = self.config.max_log_lines;
        let entity = self.entity_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        entity.push_log(message.clone(), max);
        self.emit(WorldEventKind::Logged { entity: id, message });
        Ok(())
    }

    /// Request a shake animation on an entity.
    pub fn shake(&mut self, id: EntityId, seconds: f64) -> WorldResult<()> {
        if !self.entities.contains_key(&id) {
            return Err(WorldError::EntityNotFound(id));
        }
        self.emit(WorldEventKind::Shaken { entity: id, seconds });
        Ok(())
    }

    fn unindex(&mut self, id: EntityId, pos: TilePos) {
        if let Some(ids) = self.tiles.get_mut(&pos) {
            ids.retain(|eid| *eid != id);
            if ids.is_empty() {
                self.tiles.remove(&pos);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Type descriptor of an item.
    pub fn item_type_of(&self, id: ItemId) -> Option<&ItemType> {
        self.item(id).and_then(|i| self.item_types.get(i.type_id))
    }

    /// Create an item of `item_type` in the first empty slot of `entity`.
    pub fn give_item(&mut self, entity: EntityId, item_type: u32) -> WorldResult<ItemId> {
        if self.item_types.get(item_type).is_none() {
            return Err(WorldError::UnknownItemType(item_type));
        }
        let next = ItemId(self.next_item);
        let holder = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        if !holder.has_storage() {
            return Err(WorldError::NoStorage(entity));
        }
        let slot = holder
            .storage
            .iter()
            .position(Option::is_none)
            .ok_or(WorldError::InventoryFull(entity))?;

        holder.storage[slot] = Some(next);
        self.next_item += 1;
        self.items.insert(next, Item::new(next, item_type));
        self.emit(WorldEventKind::InventoryChanged {
            entity,
            item: next,
            slot,
        });
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Ticking and events
    // -----------------------------------------------------------------------

    /// Current tick, as set by the driver.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Record an event at the current tick.
    pub fn emit(&mut self, kind: WorldEventKind) {
        self.events.push(WorldEvent::new(self.tick, kind));
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// Advance every entity by one tick: burn down cooldowns, or execute the
    /// next queued command.
    pub fn tick_entities(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if entity.decrement_cooldown() {
                continue;
            }
            if let Some(command) = entity.pop_command() {
                self.execute_command(id, command);
            }
        }
    }

    fn execute_command(&mut self, id: EntityId, command: Command) {
        match command {
            Command::Move(direction) => {
                let Some(entity) = self.entities.get_mut(&id) else {
                    return;
                };
                entity.direction = direction;
                let target = entity.pos.step(direction);
                if let Ok(true) = self.try_move(id, target, true) {
                    let ticks = self.config.ticks_per_movement;
                    let _ = self.extend_cooldown(id, ticks);
                } else {
                    tracing::debug!("entity {id} blocked moving {direction} to {target}");
                }
            }
        }
    }
}
