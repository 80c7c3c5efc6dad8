//! Shared state handed to every Axum handler: a sender into the engine's
//! command channel and the read-only world summary refreshed every tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::simulation::command::CommandSender;
use crate::simulation::ids::OwnerId;
use crate::simulation::WorldSummary;

pub struct AppState {
    pub commands: CommandSender,
    pub summary: Arc<RwLock<WorldSummary>>,
    next_owner_id: AtomicU64,
}

impl AppState {
    pub fn new(commands: CommandSender, summary: Arc<RwLock<WorldSummary>>) -> Self {
        Self { commands, summary, next_owner_id: AtomicU64::new(0) }
    }

    /// Allocates a fresh owner id for a newly opened WebSocket session.
    pub fn allocate_owner_id(&self) -> OwnerId {
        OwnerId(self.next_owner_id.fetch_add(1, Ordering::Relaxed))
    }
}
