use crate::entity::{EntityId, TilePos};
use crate::item::ItemId;

/// What kind of world event occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEventKind {
    /// A message was appended to an entity's visible log.
    Logged {
        /// The entity whose log changed.
        entity: EntityId,
        /// The appended line.
        message: String,
    },
    /// An entity's inventory changed.
    InventoryChanged {
        /// The entity whose storage changed.
        entity: EntityId,
        /// The item that was added.
        item: ItemId,
        /// Slot index the item landed in.
        slot: usize,
    },
    /// An entity changed tiles.
    Moved {
        /// The entity that moved.
        entity: EntityId,
        /// Previous tile.
        from: TilePos,
        /// New tile.
        to: TilePos,
    },
    /// A shake animation was requested for an entity.
    Shaken {
        /// The entity to shake.
        entity: EntityId,
        /// Animation length in seconds.
        seconds: f64,
    },
    /// A script attached to an entity terminated with an error.
    ScriptFailed {
        /// The entity the script was attached to.
        entity: EntityId,
        /// Rendered error message.
        error: String,
    },
}

impl WorldEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Logged { entity, .. }
            | Self::InventoryChanged { entity, .. }
            | Self::Moved { entity, .. }
            | Self::Shaken { entity, .. }
            | Self::ScriptFailed { entity, .. } => *entity == id,
        }
    }
}

/// A record of something that happened in the world.
#[derive(Debug, Clone)]
pub struct WorldEvent {
    /// The tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: WorldEventKind,
}

impl WorldEvent {
    /// Create a new event at `tick`.
    pub fn new(tick: u64, kind: WorldEventKind) -> Self {
        Self { tick, kind }
    }
}

/// Accumulates events during a run. External panels (status, inventory,
/// terminal) poll this instead of being called back.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<WorldEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: WorldEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Change the capacity, dropping the oldest events that no longer fit.
    pub fn set_max_events(&mut self, max_events: usize) {
        self.max_events = max_events;
        if max_events > 0 && self.events.len() > max_events {
            let drain_count = self.events.len() - max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged(entity: u32, message: &str) -> WorldEventKind {
        WorldEventKind::Logged {
            entity: EntityId(entity),
            message: message.into(),
        }
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        log.push(WorldEvent::new(1, logged(7, "hello")));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_entity(EntityId(7)).len(), 1);
        assert!(log.events_for_entity(EntityId(8)).is_empty());
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.push(WorldEvent::new(i, logged(1, "x")));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn shrinking_capacity_keeps_newest() {
        let mut log = EventLog::new(0);
        for i in 0..4 {
            log.push(WorldEvent::new(i, logged(1, "x")));
        }
        log.set_max_events(3);
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[0].tick, 1);
        log.push(WorldEvent::new(9, logged(1, "y")));
        assert_eq!(log.events()[0].tick, 2);
    }

    #[test]
    fn event_kind_involves_entity() {
        let moved = WorldEventKind::Moved {
            entity: EntityId(1),
            from: TilePos::new(0, 0, 0),
            to: TilePos::new(1, 0, 0),
        };
        assert!(moved.involves(EntityId(1)));
        assert!(!moved.involves(EntityId(2)));

        let given = WorldEventKind::InventoryChanged {
            entity: EntityId(2),
            item: ItemId(0),
            slot: 0,
        };
        assert!(given.involves(EntityId(2)));
    }
}
