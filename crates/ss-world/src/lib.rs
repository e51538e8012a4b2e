//! Tile-grid world model for SimpleScript.
//!
//! This crate is the capability surface scripts act on: entities with a
//! tile position, facing, integer variables, inventory and a visible log;
//! items held in inventories; and the type catalogs both are built from.
//! It knows nothing about scripts. The interpreter in `ss-script` looks
//! entities up by id and mutates them only through the narrow methods on
//! [`World`].

/// JSON-backed entity and item type catalogs.
pub mod catalog;
/// Entity ids, tile positions, directions, and the entity struct.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// World events: visible-log and inventory notifications.
pub mod event;
/// Item ids and the item struct.
pub mod item;
/// The world model that owns entities, items, and the tile index.
pub mod world;

/// Re-export catalog types.
pub use catalog::{EntityType, ItemType, TypeCatalog, TypeDescriptor};
/// Re-export core entity types.
pub use entity::{Command, Direction, Entity, EntityId, SERVER_OWNER, TilePos};
/// Re-export error types.
pub use error::{WorldError, WorldResult};
/// Re-export event types.
pub use event::{EventLog, WorldEvent, WorldEventKind};
/// Re-export item types.
pub use item::{Item, ItemId};
/// Re-export world model types.
pub use world::{World, WorldConfig};
