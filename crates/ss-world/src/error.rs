use crate::entity::EntityId;
use crate::item::ItemId;

/// Alias for `Result<T, WorldError>`.
pub type WorldResult<T> = Result<T, WorldError>;

/// Errors that can occur when manipulating a world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The requested item ID does not exist in the world.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// No entity type with this id is in the catalog.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(u32),

    /// No item type with this id is in the catalog.
    #[error("unknown item type: {0}")]
    UnknownItemType(u32),

    /// The entity has no inventory slots at all.
    #[error("Entity has no item storage")]
    NoStorage(EntityId),

    /// Every inventory slot is occupied.
    #[error("Inventory full")]
    InventoryFull(EntityId),

    /// A command was sent by someone other than the entity's owner.
    #[error("command from owner {sender} rejected by entity {entity} (owner {owner})")]
    NotAuthorized {
        /// Target entity.
        entity: EntityId,
        /// Owner id of the sender.
        sender: i32,
        /// Owner id of the entity.
        owner: i32,
    },

    /// Reading or writing a catalog file failed.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File that was accessed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Catalog JSON could not be parsed or written.
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
}
