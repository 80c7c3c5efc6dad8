//! World event log: bounded ring of tick-scoped events with a visibility
//! level used by the fanout step (wire shape).

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::ids::{CharacterId, FamilyTreeId};

const MAX_EVENTS: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Personal,
    Regional,
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    pub tick: u64,
    pub level: EventLevel,
    pub family_tree_id: Option<FamilyTreeId>,
    pub character_id: Option<CharacterId>,
    pub summary: String,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct WorldEventLog {
    events: VecDeque<WorldEvent>,
}

impl WorldEventLog {
    pub fn push(&mut self, event: WorldEvent) {
        self.events.push_back(event);
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
    }

    /// Events whose level is not `personal`, fanned out to every connected
    /// owner.
    pub fn broadcastable(&self, since_tick: u64) -> Vec<&WorldEvent> {
        self.events
            .iter()
            .filter(|e| e.tick >= since_tick && e.level != EventLevel::Personal)
            .collect()
    }

    /// Events scoped to one family's owner only.
    pub fn for_family(&self, family_tree_id: FamilyTreeId, since_tick: u64) -> Vec<&WorldEvent> {
        self.events
            .iter()
            .filter(|e| e.tick >= since_tick && e.family_tree_id == Some(family_tree_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_caps_at_max_events() {
        let mut log = WorldEventLog::default();
        for tick in 0..(MAX_EVENTS as u64 + 100) {
            log.push(WorldEvent {
                tick,
                level: EventLevel::Global,
                family_tree_id: None,
                character_id: None,
                summary: "tick".into(),
            });
        }
        assert_eq!(log.len(), MAX_EVENTS);
    }

    #[test]
    fn personal_events_excluded_from_broadcast() {
        let mut log = WorldEventLog::default();
        log.push(WorldEvent {
            tick: 0,
            level: EventLevel::Personal,
            family_tree_id: Some(FamilyTreeId(0)),
            character_id: None,
            summary: "private".into(),
        });
        log.push(WorldEvent {
            tick: 0,
            level: EventLevel::Global,
            family_tree_id: None,
            character_id: None,
            summary: "public".into(),
        });
        assert_eq!(log.broadcastable(0).len(), 1);
    }
}
