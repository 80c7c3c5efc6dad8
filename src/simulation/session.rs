//! Session / owner layer: tracks connected observers and their
//! subscriptions. Transport (the actual socket) lives in `crate::http`; this
//! module only owns the bookkeeping the engine needs to know who to notify.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::simulation::ids::{FamilyTreeId, OwnerId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Perception { tick: u64, payload: serde_json::Value },
    Event { tick: u64, event: serde_json::Value },
    Ack { message: String },
    Error { message: String },
}

/// One connected owner's outbox. Delivery itself is transport's job; this
/// struct only holds the channel the transport layer drains.
pub struct Session {
    pub owner_id: OwnerId,
    pub subscriptions: HashSet<FamilyTreeId>,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Default, Resource)]
pub struct SessionRegistry {
    sessions: HashMap<OwnerId, Session>,
}

impl SessionRegistry {
    /// `registerSession`. Auth token validation is transport's
    /// responsibility; by the time a session reaches here it is trusted.
    pub fn register_session(
        &mut self,
        owner_id: OwnerId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sessions.insert(
            owner_id,
            Session {
                owner_id,
                subscriptions: HashSet::new(),
                sender,
            },
        );
        receiver
    }

    pub fn unregister(&mut self, owner_id: OwnerId) {
        self.sessions.remove(&owner_id);
    }

    pub fn subscribe(&mut self, owner_id: OwnerId, family_tree_id: FamilyTreeId) {
        if let Some(session) = self.sessions.get_mut(&owner_id) {
            session.subscriptions.insert(family_tree_id);
        }
    }

    /// `send`: best-effort delivery to one owner. A closed channel
    /// (the owner disconnected) is silently dropped, matching the
    /// broadcast-has-zero-receivers case in `broadcast`.
    pub fn send(&self, owner_id: OwnerId, message: ServerMessage) {
        if let Some(session) = self.sessions.get(&owner_id) {
            let _ = session.sender.send(message);
        }
    }

    /// `broadcast`: delivered to every connected owner regardless of
    /// subscriptions.
    pub fn broadcast(&self, message: ServerMessage) {
        for session in self.sessions.values() {
            let _ = session.sender.send(message.clone());
        }
    }

    /// Delivers to only the owners subscribed to `family_tree_id`.
    pub fn send_to_family_subscribers(&self, family_tree_id: FamilyTreeId, message: ServerMessage) {
        for session in self.sessions.values() {
            if session.subscriptions.contains(&family_tree_id) {
                let _ = session.sender.send(message.clone());
            }
        }
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribed_owner_does_not_receive_family_message() {
        let mut registry = SessionRegistry::default();
        let owner = OwnerId(0);
        let mut rx = registry.register_session(owner);
        registry.send_to_family_subscribers(
            FamilyTreeId(1),
            ServerMessage::Ack { message: "hi".into() },
        );
        assert!(rx.try_recv().is_err());

        registry.subscribe(owner, FamilyTreeId(1));
        registry.send_to_family_subscribers(
            FamilyTreeId(1),
            ServerMessage::Ack { message: "hi".into() },
        );
        assert!(rx.try_recv().is_ok());
    }
}
