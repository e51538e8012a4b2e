use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::ItemId;

/// Unique identifier for every entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner id used for server-owned entities and fully authorized scripts.
pub const SERVER_OWNER: i32 = -1;

/// A tile coordinate. `y` is the vertical axis; the ground plane is `x`/`z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Horizontal axis, grows to the right.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// Depth axis, grows upward on the map.
    pub z: i32,
}

impl TilePos {
    /// Create a tile position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset this position by one step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Signed sum of per-axis deltas, `|Δx + Δy + Δz|`.
    ///
    /// This is not a Manhattan distance: opposite deltas cancel out. The
    /// call-range check depends on exactly this formula.
    pub fn summed_delta(self, other: TilePos) -> i32 {
        ((other.x - self.x) + (other.y - self.y) + (other.z - self.z)).abs()
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Facing direction of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `+z`, script index 0.
    #[default]
    Up,
    /// `-z`, script index 1.
    Down,
    /// `-x`, script index 2.
    Left,
    /// `+x`, script index 3.
    Right,
}

impl Direction {
    /// Map a script direction index (0..=3) to a direction.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    /// The script index of this direction.
    pub fn index(self) -> i64 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// Tile offset of one step in this direction.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Up => (0, 0, 1),
            Self::Down => (0, 0, -1),
            Self::Left => (-1, 0, 0),
            Self::Right => (1, 0, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A queued action. Entities execute at most one command per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Turn towards `direction` and try to step onto the next tile.
    Move(Direction),
}

/// A scriptable world object living on one tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Index into the entity type catalog.
    pub type_id: u32,
    /// Owner of the entity; [`SERVER_OWNER`] for the server.
    pub owner_id: i32,
    /// Current tile.
    pub pos: TilePos,
    /// Facing direction.
    pub direction: Direction,
    /// Integer variables readable from scripts (`$Entity[3].Health`).
    pub variables: BTreeMap<String, i64>,
    /// Inventory slots. An entity without slots has no storage.
    pub storage: Vec<Option<ItemId>>,
    /// Most recent visible log lines, oldest first.
    pub log: VecDeque<String>,
    #[serde(skip)]
    cooldown: u32,
    #[serde(skip)]
    commands: VecDeque<Command>,
}

impl Entity {
    /// Create an entity at `pos` with `x`/`y`/`z` variables seeded from it.
    pub fn new(id: EntityId, type_id: u32, pos: TilePos, owner_id: i32) -> Self {
        let mut entity = Self {
            id,
            type_id,
            owner_id,
            pos,
            direction: Direction::default(),
            variables: BTreeMap::new(),
            storage: Vec::new(),
            log: VecDeque::new(),
            cooldown: 0,
            commands: VecDeque::new(),
        };
        entity.sync_position_variables();
        entity
    }

    /// Script reference text for this entity.
    pub fn reference(&self) -> String {
        format!("$Entity[{}]", self.id)
    }

    /// Whether the entity may run script work this tick.
    pub fn can_act(&self) -> bool {
        self.cooldown == 0 && self.commands.is_empty()
    }

    /// Remaining ticks before the entity may act again.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Raise the cooldown to at least `ticks`, capped at `max`.
    pub fn extend_cooldown(&mut self, ticks: u32, max: u32) {
        self.cooldown = self.cooldown.max(ticks).min(max);
    }

    /// Number of queued commands.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn push_command(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub(crate) fn pop_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    pub(crate) fn decrement_cooldown(&mut self) -> bool {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            true
        } else {
            false
        }
    }

    /// Whether this entity has any inventory slots.
    pub fn has_storage(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Item held in `slot`, if any.
    pub fn item_in_slot(&self, slot: usize) -> Option<ItemId> {
        self.storage.get(slot).copied().flatten()
    }

    /// Whether the entity holds `item` in any slot.
    pub fn holds(&self, item: ItemId) -> bool {
        self.storage.iter().any(|s| *s == Some(item))
    }

    /// Read an integer variable.
    pub fn variable(&self, name: &str) -> Option<i64> {
        self.variables.get(name).copied()
    }

    /// Write an integer variable, creating it if needed.
    pub fn set_variable(&mut self, name: impl Into<String>, value: i64) {
        self.variables.insert(name.into(), value);
    }

    pub(crate) fn sync_position_variables(&mut self) {
        self.variables.insert("x".into(), i64::from(self.pos.x));
        self.variables.insert("y".into(), i64::from(self.pos.y));
        self.variables.insert("z".into(), i64::from(self.pos.z));
    }

    pub(crate) fn push_log(&mut self, message: String, max_lines: usize) {
        self.log.push_back(message);
        while max_lines > 0 && self.log.len() > max_lines {
            self.log.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summed_delta_cancels_opposite_axes() {
        let a = TilePos::new(0, 0, 0);
        assert_eq!(a.summed_delta(TilePos::new(1, 0, 0)), 1);
        assert_eq!(a.summed_delta(TilePos::new(1, 0, -1)), 0);
        assert_eq!(a.summed_delta(TilePos::new(2, 0, 1)), 3);
    }

    #[test]
    fn direction_index_round_trips() {
        for i in 0..4 {
            assert_eq!(Direction::from_index(i).unwrap().index(), i);
        }
        assert!(Direction::from_index(4).is_none());
        assert!(Direction::from_index(-1).is_none());
    }

    #[test]
    fn step_uses_direction_offsets() {
        let origin = TilePos::new(5, 0, 5);
        assert_eq!(origin.step(Direction::Up), TilePos::new(5, 0, 6));
        assert_eq!(origin.step(Direction::Down), TilePos::new(5, 0, 4));
        assert_eq!(origin.step(Direction::Left), TilePos::new(4, 0, 5));
        assert_eq!(origin.step(Direction::Right), TilePos::new(6, 0, 5));
    }

    #[test]
    fn new_entity_seeds_position_variables() {
        let e = Entity::new(EntityId(1), 0, TilePos::new(3, 0, -2), SERVER_OWNER);
        assert_eq!(e.variable("x"), Some(3));
        assert_eq!(e.variable("y"), Some(0));
        assert_eq!(e.variable("z"), Some(-2));
        assert_eq!(e.reference(), "$Entity[1]");
    }

    #[test]
    fn cooldown_gates_acting() {
        let mut e = Entity::new(EntityId(1), 0, TilePos::default(), SERVER_OWNER);
        assert!(e.can_act());
        e.extend_cooldown(5, 100);
        assert!(!e.can_act());
        e.extend_cooldown(2, 100);
        assert_eq!(e.cooldown(), 5);
        e.extend_cooldown(500, 100);
        assert_eq!(e.cooldown(), 100);
    }

    #[test]
    fn queued_command_blocks_acting() {
        let mut e = Entity::new(EntityId(1), 0, TilePos::default(), SERVER_OWNER);
        e.push_command(Command::Move(Direction::Left));
        assert!(!e.can_act());
        assert_eq!(e.pop_command(), Some(Command::Move(Direction::Left)));
        assert!(e.can_act());
    }

    #[test]
    fn log_is_bounded() {
        let mut e = Entity::new(EntityId(1), 0, TilePos::default(), SERVER_OWNER);
        for i in 0..15 {
            e.push_log(format!("line {i}"), 10);
        }
        assert_eq!(e.log.len(), 10);
        assert_eq!(e.log.front().map(String::as_str), Some("line 5"));
    }
}
