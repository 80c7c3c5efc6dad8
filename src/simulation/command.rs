//! The inbox the tick loop drains between the perception and legacy steps.
//!
//! The HTTP/WebSocket layer never touches `SessionRegistry` or the action
//! kernel directly — every cross-thread request is a message on this
//! channel, drained synchronously inside the tick so no external caller can
//! observe or mutate engine state mid-tick.

use bevy_ecs::prelude::Resource;
use tokio::sync::{mpsc, oneshot};

use crate::simulation::action::{Action, ActionOutcome, ActionError};
use crate::simulation::character::{Character, FamilyTree};
use crate::simulation::diplomacy::{Pact, ProposalOutcome};
use crate::simulation::espionage::MissionType;
use crate::simulation::ids::{CharacterId, FamilyTreeId, MissionId, OwnerId, PactId, RegionId};
use crate::simulation::intel::IntelRecord;
use crate::simulation::region::Region;
use crate::simulation::session::ServerMessage;
use crate::simulation::species::Species;
use crate::simulation::taxonomy::{Rank, TraitOverrides};
use crate::simulation::trust::RiskAssessment;

pub enum EngineCommand {
    RegisterSession {
        owner_id: OwnerId,
        respond_to: oneshot::Sender<mpsc::UnboundedReceiver<ServerMessage>>,
    },
    Unregister {
        owner_id: OwnerId,
    },
    Subscribe {
        owner_id: OwnerId,
        family_tree_id: FamilyTreeId,
    },
    SubmitAction {
        character_id: CharacterId,
        action: Action,
        respond_to: oneshot::Sender<Result<ActionOutcome, ActionError>>,
    },
    GetRegions {
        respond_to: oneshot::Sender<Vec<Region>>,
    },
    GetRegion {
        region_id: RegionId,
        respond_to: oneshot::Sender<Option<Region>>,
    },
    GetSpecies {
        respond_to: oneshot::Sender<Vec<Species>>,
    },
    GetCharacter {
        character_id: CharacterId,
        respond_to: oneshot::Sender<Option<Character>>,
    },
    GetFamilyTree {
        family_tree_id: FamilyTreeId,
        respond_to: oneshot::Sender<Option<FamilyTree>>,
    },
    GetSpeciesByName {
        name: String,
        respond_to: oneshot::Sender<Option<Species>>,
    },
    ProposePact {
        proposer_id: CharacterId,
        target_id: CharacterId,
        offer: String,
        demand: String,
        respond_to: oneshot::Sender<Result<ProposalOutcome, ActionError>>,
    },
    GetPactsForCharacter {
        character_id: CharacterId,
        respond_to: oneshot::Sender<Vec<Pact>>,
    },
    ShareIntel {
        from_family_id: FamilyTreeId,
        to_family_id: FamilyTreeId,
        region_id: RegionId,
        utility: f32,
        respond_to: oneshot::Sender<RiskAssessment>,
    },
    StartMission {
        mission_type: MissionType,
        agent_character_id: CharacterId,
        support_character_ids: Vec<CharacterId>,
        target_region_id: RegionId,
        target_family_id: Option<FamilyTreeId>,
        respond_to: oneshot::Sender<Result<MissionId, &'static str>>,
    },
    BreakPact {
        pact_id: PactId,
        breaker_id: CharacterId,
        respond_to: oneshot::Sender<Result<(), &'static str>>,
    },
    RecordIntelAccuracy {
        observer_family_id: FamilyTreeId,
        subject_family_id: FamilyTreeId,
        was_accurate: bool,
        respond_to: oneshot::Sender<()>,
    },
    KnowsHeartland {
        observer_family_id: FamilyTreeId,
        target_family_id: FamilyTreeId,
        respond_to: oneshot::Sender<bool>,
    },
    GetIntel {
        family_tree_id: FamilyTreeId,
        region_id: RegionId,
        respond_to: oneshot::Sender<Option<IntelRecord>>,
    },
    GetTaxonomyTraitOverrides {
        rank: Rank,
        name: String,
        respond_to: oneshot::Sender<Option<TraitOverrides>>,
    },
}

/// Wraps the receiving half in a `Mutex` purely to satisfy bevy's `Resource`
/// bound (`Sync`); the tick loop is the only reader and never contends.
#[derive(Resource)]
pub struct CommandInbox(std::sync::Mutex<mpsc::UnboundedReceiver<EngineCommand>>);

impl CommandInbox {
    pub fn new(receiver: mpsc::UnboundedReceiver<EngineCommand>) -> Self {
        Self(std::sync::Mutex::new(receiver))
    }

    /// Drains every command currently queued without blocking.
    pub fn drain(&self) -> Vec<EngineCommand> {
        let mut receiver = self.0.lock().expect("command inbox mutex poisoned");
        let mut commands = Vec::new();
        while let Ok(command) = receiver.try_recv() {
            commands.push(command);
        }
        commands
    }
}

/// Handle held by the HTTP layer to submit commands into the engine.
pub type CommandSender = mpsc::UnboundedSender<EngineCommand>;

pub fn channel() -> (CommandSender, CommandInbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (sender, CommandInbox::new(receiver))
}
