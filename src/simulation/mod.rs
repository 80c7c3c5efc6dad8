//! World assembly: resource wiring, the ordered tick schedule, and the
//! public `SimulationWorld` handle `main` drives.

pub mod action;
pub mod arena;
pub mod character;
pub mod climate;
pub mod command;
pub mod config;
pub mod diplomacy;
pub mod ecosystem;
pub mod espionage;
pub mod events;
pub mod evolution;
pub mod genetics;
pub mod ids;
pub mod intel;
pub mod legacy;
pub mod perception;
pub mod region;
pub mod seed;
pub mod session;
pub mod snapshot;
pub mod species;
pub mod taxonomy;
pub mod trust;

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::Schedule;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::simulation::action::{process_action, Action, ActionError};
use crate::simulation::character::{CharacterClass, CharacterRegistry, FamilyTreeRegistry, GeneTrait};
use crate::simulation::climate::{celestial_state, diffuse_pollution, update_region_weather};
use crate::simulation::command::{CommandInbox, EngineCommand};
use crate::simulation::config::SimulationConfig;
use crate::simulation::diplomacy::{evaluate_proposal, PactRegistry};
use crate::simulation::ecosystem::{initialize_world_ecosystem, EcosystemState};
use crate::simulation::espionage::{generate_detection_report, HeartlandTracker, MissionRegistry, MissionType, StartMissionParams};
use crate::simulation::events::{EventLevel, WorldEvent, WorldEventLog};
use crate::simulation::evolution::evolution_tick;
use crate::simulation::genetics::{calculate_offspring_genetics, offspring_count, offspring_sex};
use crate::simulation::ids::{CharacterId, SpeciesId};
use crate::simulation::intel::IntelligenceMap;
use crate::simulation::legacy::{process_character_death, CardRegistry, MainCharacterManager};
use crate::simulation::perception::build_action_context;
use crate::simulation::region::RegionRegistry;
use crate::simulation::session::{ServerMessage, SessionRegistry};
use crate::simulation::species::SpeciesRegistry;
use crate::simulation::taxonomy::Diet;
use crate::simulation::trust::TrustLedger;

/// Game clock. A tick is one simulated hour; 24 ticks make a day, 365 days
/// make a year.
#[derive(Debug, Resource)]
pub struct WorldClock {
    pub tick: u64,
    pub started_at: String,
}

impl WorldClock {
    pub fn era(&self) -> String {
        format!("year {}", self.tick / (24 * 365) + 1)
    }

    pub fn time_of_day(&self) -> &'static str {
        match self.tick % 24 {
            0..=4 => "night",
            5..=7 => "dawn",
            8..=17 => "day",
            18..=20 => "dusk",
            _ => "night",
        }
    }

    pub fn season(&self) -> &'static str {
        let day_of_year = (self.tick / 24) % 365;
        match day_of_year {
            0..=90 => "spring",
            91..=181 => "summer",
            182..=272 => "autumn",
            _ => "winter",
        }
    }
}

#[derive(Resource)]
pub struct RngResource(pub SmallRng);

/// Characters that have already had `legacy_tick_system` process their
/// death, so a second pass over the same tick never double-inherits.
#[derive(Default, Resource)]
pub struct DeathLedger(HashSet<CharacterId>);

/// Tick watermark up to which `event_fanout_system` has already delivered
/// events, so the same `WorldEvent` is never broadcast twice.
#[derive(Default, Resource)]
pub struct EventCursor(u64);

/// A read-only view of world state cheap enough to refresh every tick and
/// hand to HTTP handlers without touching the `World` itself.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorldSummary {
    pub tick: u64,
    pub era: String,
    pub time_of_day: String,
    pub season: String,
    pub living_characters: usize,
    pub region_count: usize,
    pub species_count: usize,
    pub connected_sessions: usize,
}

pub struct SimulationWorld {
    world: World,
    schedule: Schedule,
    pub summary: Arc<RwLock<WorldSummary>>,
}

impl SimulationWorld {
    pub fn new(config: SimulationConfig, command_inbox: CommandInbox) -> Self {
        let mut world = World::new();
        let mut rng = SmallRng::seed_from_u64(0xE47D_47C4);

        let mut taxonomy = taxonomy::TaxonomyEngine::default();
        let mut species = SpeciesRegistry::default();
        seed::seed_taxonomy_and_species(&mut taxonomy, &mut species);

        let mut regions = RegionRegistry::default();
        seed::seed_regions(&mut regions);

        let mut characters = CharacterRegistry::default();
        let mut family_trees = FamilyTreeRegistry::default();
        let ecosystem =
            initialize_world_ecosystem(&mut species, &mut regions, &mut characters, &mut family_trees, &mut rng);

        world.insert_resource(config);
        world.insert_resource(taxonomy);
        world.insert_resource(species);
        world.insert_resource(regions);
        world.insert_resource(characters);
        world.insert_resource(family_trees);
        world.insert_resource(ecosystem);
        world.insert_resource(WorldEventLog::default());
        world.insert_resource(CardRegistry::default());
        world.insert_resource(MainCharacterManager);
        world.insert_resource(MissionRegistry::default());
        world.insert_resource(HeartlandTracker::default());
        world.insert_resource(PactRegistry::default());
        world.insert_resource(TrustLedger::default());
        world.insert_resource(IntelligenceMap::default());
        world.insert_resource(SessionRegistry::default());
        world.insert_resource(command_inbox);
        world.insert_resource(DeathLedger::default());
        world.insert_resource(EventCursor::default());
        world.insert_resource(WorldClock { tick: 0, started_at: chrono::Utc::now().to_rfc3339() });
        world.insert_resource(RngResource(rng));

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                advance_clock_system,
                climate_tick_system,
                ecology_tick_system,
                gestation_tick_system,
                perception_broadcast_system,
                command_drain_system,
                periodic_subtasks_system,
                legacy_tick_system,
                class_promotion_system,
                event_fanout_system,
                checkpoint_system,
            )
                .chain(),
        );

        let summary = Arc::new(RwLock::new(WorldSummary::default()));
        let mut simulation = Self { world, schedule, summary };
        simulation.refresh_summary();
        simulation
    }

    pub fn tick(&mut self) {
        self.schedule.run(&mut self.world);
        self.refresh_summary();
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn refresh_summary(&mut self) {
        let clock = self.world.resource::<WorldClock>();
        let characters = self.world.resource::<CharacterRegistry>();
        let regions = self.world.resource::<RegionRegistry>();
        let species = self.world.resource::<SpeciesRegistry>();
        let sessions = self.world.resource::<SessionRegistry>();
        let summary = WorldSummary {
            tick: clock.tick,
            era: clock.era(),
            time_of_day: clock.time_of_day().to_string(),
            season: clock.season().to_string(),
            living_characters: characters.iter().filter(|c| c.is_alive).count(),
            region_count: regions.len(),
            species_count: species.get_all().len(),
            connected_sessions: sessions.connected_count(),
        };
        *self.summary.write().expect("summary lock poisoned") = summary;
    }
}

fn advance_clock_system(mut clock: ResMut<WorldClock>) {
    clock.tick += 1;
}

fn climate_tick_system(clock: Res<WorldClock>, mut regions: ResMut<RegionRegistry>) {
    for region in regions.iter_mut() {
        let celestial = celestial_state(clock.tick, region.coordinates.latitude);
        update_region_weather(region, &celestial, clock.tick);
    }
    diffuse_pollution(&mut regions);
}

fn decide_action(
    context: &perception::ActionContext,
    diet: Diet,
    energy: f32,
    actor_species_id: SpeciesId,
    ecosystem: &EcosystemState,
) -> Action {
    if energy < 0.3 {
        return Action::Rest;
    }
    if matches!(diet, Diet::Carnivore | Diet::Omnivore)
        && context
            .nearby_characters
            .iter()
            .any(|n| ecosystem.edge(actor_species_id, n.species_id).is_some())
    {
        return Action::Hunt;
    }
    if let Some(resource) = context.available_resources.iter().find(|r| r.quantity > 1.0) {
        if resource.kind == "fresh_water" {
            return Action::Drink { resource_kind: resource.kind.clone() };
        }
        return Action::Forage { resource_kind: resource.kind.clone() };
    }
    Action::Rest
}

/// Autonomous per-character decisions: builds each living character's
/// perception context, chooses an action with a simple energy/diet-driven
/// policy, and resolves it. Owner-controlled characters are steered instead
/// via `command_drain_system`'s `SubmitAction` branch, which runs
/// immediately after this system in the same tick.
fn ecology_tick_system(
    clock: Res<WorldClock>,
    mut characters: ResMut<CharacterRegistry>,
    mut regions: ResMut<RegionRegistry>,
    species: Res<SpeciesRegistry>,
    ecosystem: Res<EcosystemState>,
    mut intel: ResMut<IntelligenceMap>,
    mut rng: ResMut<RngResource>,
    mut events: ResMut<WorldEventLog>,
) {
    let living_ids: Vec<CharacterId> = characters.iter().filter(|c| c.is_alive).map(|c| c.id).collect();
    let time_of_day = clock.time_of_day();
    let season = clock.season();

    for id in living_ids {
        let Some(context) = build_action_context(id, &characters, &regions, &species, &ecosystem, clock.tick, time_of_day, season)
        else {
            continue;
        };
        let Some(character) = characters.get(id) else { continue };
        let species_id = character.species_id;
        let energy = character.energy;
        let Ok(species_entry) = species.get(species_id) else { continue };
        let diet = species_entry.traits.diet;
        let action = decide_action(&context, diet, energy, species_id, &ecosystem);

        if let Ok(outcome) =
            process_action(&action, &context, &mut characters, &mut regions, &species, &ecosystem, &mut intel, clock.tick, &mut rng.0)
        {
            if outcome.predator_encounter {
                let family_tree_id = characters.get(id).map(|c| c.family_tree_id);
                events.push(WorldEvent {
                    tick: clock.tick,
                    level: EventLevel::Personal,
                    family_tree_id,
                    character_id: Some(id),
                    summary: outcome.narrative,
                });
            }
        }

        if let Some(character) = characters.get_mut(id) {
            character.age += 1;
            character.energy = (character.energy - 0.02).max(0.0);
            let lifespan = species.get(character.species_id).map(|s| s.traits.lifespan_ticks).unwrap_or(u64::MAX);
            if character.age > lifespan || character.health <= 0.0 {
                character.is_alive = false;
            }
        }
    }
}

/// Resolves every pregnancy whose gestation ended this tick: draws offspring
/// genetics from both parents, mints the children, and folds them into the
/// mother's family tree. A father who died mid-gestation quietly ends the
/// pregnancy with no birth.
fn gestation_tick_system(
    clock: Res<WorldClock>,
    mut characters: ResMut<CharacterRegistry>,
    species: Res<SpeciesRegistry>,
    mut family_trees: ResMut<FamilyTreeRegistry>,
    mut rng: ResMut<RngResource>,
    mut events: ResMut<WorldEventLog>,
) {
    let due: Vec<(CharacterId, CharacterId)> = characters
        .iter()
        .filter(|c| c.is_alive && c.gestation_ends_at_tick == Some(clock.tick))
        .filter_map(|c| c.pending_mate_id.map(|father_id| (c.id, father_id)))
        .collect();

    for (mother_id, father_id) in due {
        let mother = characters.get(mother_id).cloned();
        let father = characters.get(father_id).cloned();
        let (Some(mother), Some(father)) = (mother, father) else { continue };
        if let Some(mother_mut) = characters.get_mut(mother_id) {
            mother_mut.gestation_ends_at_tick = None;
            mother_mut.pending_mate_id = None;
        }
        if !father.is_alive {
            continue;
        }
        let Ok(reproduction_rate) = species.get(mother.species_id).map(|s| s.traits.reproduction_rate) else {
            continue;
        };
        let count = offspring_count(reproduction_rate, &mut rng.0);
        let generation = mother.generation.max(father.generation) + 1;

        let mut children = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let genetics = calculate_offspring_genetics(&mother, &father, &mut rng.0);
            let sex = offspring_sex(&mut rng.0);
            let child_id = characters.birth_offspring(
                mother.species_id,
                mother.region_id,
                mother.family_tree_id,
                clock.tick,
                sex,
                vec![father_id, mother_id],
                generation,
                genetics,
            );
            family_trees.add_member(mother.family_tree_id, child_id, generation);
            children.push(child_id);
        }

        if let Some(mother_mut) = characters.get_mut(mother_id) {
            mother_mut.child_ids.extend(children.iter().copied());
        }
        if let Some(father_mut) = characters.get_mut(father_id) {
            father_mut.child_ids.extend(children.iter().copied());
        }
        events.push(WorldEvent {
            tick: clock.tick,
            level: EventLevel::Personal,
            family_tree_id: Some(mother.family_tree_id),
            character_id: Some(mother_id),
            summary: format!("{} offspring born", children.len()),
        });
    }
}

/// Sends each connected owner a lightweight snapshot of the family trees
/// they subscribe to, so observers don't need to poll the REST surface.
fn perception_broadcast_system(
    clock: Res<WorldClock>,
    sessions: Res<SessionRegistry>,
    family_trees: Res<FamilyTreeRegistry>,
    characters: Res<CharacterRegistry>,
    events: Res<WorldEventLog>,
) {
    for tree in family_trees.iter() {
        let living = tree.members.iter().filter(|&&id| characters.get(id).map(|c| c.is_alive).unwrap_or(false)).count();
        let personal_events: Vec<_> = events
            .for_family(tree.id, clock.tick.saturating_sub(1))
            .into_iter()
            .map(|e| &e.summary)
            .collect();
        let payload = serde_json::json!({
            "family_tree_id": tree.id,
            "generations": tree.generations,
            "living_members": living,
            "is_extinct": tree.is_extinct,
            "personal_events": personal_events,
        });
        sessions.send_to_family_subscribers(tree.id, ServerMessage::Perception { tick: clock.tick, payload });
    }
}

/// Drains commands queued by the HTTP layer since the last tick. Runs
/// mid-tick so owner-submitted actions land in the same tick as NPC
/// decisions rather than waiting a full cycle.
fn command_drain_system(
    inbox: Res<CommandInbox>,
    mut sessions: ResMut<SessionRegistry>,
    mut characters: ResMut<CharacterRegistry>,
    mut regions: ResMut<RegionRegistry>,
    species: Res<SpeciesRegistry>,
    ecosystem: Res<EcosystemState>,
    family_trees: Res<FamilyTreeRegistry>,
    clock: Res<WorldClock>,
    mut rng: ResMut<RngResource>,
    mut pacts: ResMut<PactRegistry>,
    mut trust: ResMut<TrustLedger>,
    mut intel: ResMut<IntelligenceMap>,
    mut missions: ResMut<MissionRegistry>,
    heartlands: Res<HeartlandTracker>,
    taxonomy: Res<taxonomy::TaxonomyEngine>,
) {
    for command in inbox.drain() {
        match command {
            EngineCommand::RegisterSession { owner_id, respond_to } => {
                let receiver = sessions.register_session(owner_id);
                let _ = respond_to.send(receiver);
            }
            EngineCommand::Unregister { owner_id } => {
                sessions.unregister(owner_id);
            }
            EngineCommand::Subscribe { owner_id, family_tree_id } => {
                sessions.subscribe(owner_id, family_tree_id);
                sessions.send(
                    owner_id,
                    ServerMessage::Ack { message: format!("subscribed to family tree {}", family_tree_id.0) },
                );
            }
            EngineCommand::SubmitAction { character_id, action, respond_to } => {
                let time_of_day = clock.time_of_day();
                let season = clock.season();
                let outcome = match build_action_context(character_id, &characters, &regions, &species, &ecosystem, clock.tick, time_of_day, season) {
                    Some(context) => process_action(&action, &context, &mut characters, &mut regions, &species, &ecosystem, &mut intel, clock.tick, &mut rng.0),
                    None => Err(ActionError::NotAlive),
                };
                let _ = respond_to.send(outcome);
            }
            EngineCommand::GetRegions { respond_to } => {
                let _ = respond_to.send(regions.iter().cloned().collect());
            }
            EngineCommand::GetRegion { region_id, respond_to } => {
                let _ = respond_to.send(regions.get(region_id).ok().cloned());
            }
            EngineCommand::GetSpecies { respond_to } => {
                let _ = respond_to.send(species.get_all().to_vec());
            }
            EngineCommand::GetCharacter { character_id, respond_to } => {
                let _ = respond_to.send(characters.get(character_id).cloned());
            }
            EngineCommand::GetFamilyTree { family_tree_id, respond_to } => {
                let _ = respond_to.send(family_trees.get(family_tree_id).cloned());
            }
            EngineCommand::GetSpeciesByName { name, respond_to } => {
                let _ = respond_to.send(species.get_by_name(&name).cloned());
            }
            EngineCommand::ProposePact { proposer_id, target_id, offer, demand, respond_to } => {
                let outcome = propose_pact(
                    proposer_id, target_id, offer, demand,
                    &characters, &ecosystem, &trust, clock.tick, &mut rng.0,
                );
                match outcome {
                    Ok(outcome) => {
                        if let Some(pact) = &outcome.pact {
                            let proposer_family = characters.get(proposer_id).map(|c| c.family_tree_id);
                            let target_family = characters.get(target_id).map(|c| c.family_tree_id);
                            if let (Some(a), Some(b)) = (proposer_family, target_family) {
                                pacts.add(pact.clone());
                                trust.record_cooperation(a, b, clock.tick);
                            }
                        }
                        let _ = respond_to.send(Ok(outcome));
                    }
                    Err(err) => {
                        let _ = respond_to.send(Err(err));
                    }
                }
            }
            EngineCommand::GetPactsForCharacter { character_id, respond_to } => {
                let _ = respond_to.send(pacts.get_for_character(character_id).into_iter().cloned().collect());
            }
            EngineCommand::ShareIntel { from_family_id, to_family_id, region_id, utility, respond_to } => {
                let assessment = trust.evaluate_intel_sharing_willingness(from_family_id, to_family_id, utility);
                if assessment.willing {
                    intel.share_intel(from_family_id, to_family_id, region_id, clock.tick);
                }
                let _ = respond_to.send(assessment);
            }
            EngineCommand::BreakPact { pact_id, breaker_id, respond_to } => {
                let outcome = break_pact(pact_id, breaker_id, &characters, &mut pacts, &mut trust, clock.tick);
                let _ = respond_to.send(outcome);
            }
            EngineCommand::RecordIntelAccuracy { observer_family_id, subject_family_id, was_accurate, respond_to } => {
                trust.record_intel_accuracy(observer_family_id, subject_family_id, was_accurate);
                let _ = respond_to.send(());
            }
            EngineCommand::KnowsHeartland { observer_family_id, target_family_id, respond_to } => {
                let _ = respond_to.send(heartlands.knows(observer_family_id, target_family_id));
            }
            EngineCommand::GetIntel { family_tree_id, region_id, respond_to } => {
                let _ = respond_to.send(intel.get(family_tree_id, region_id).cloned());
            }
            EngineCommand::GetTaxonomyTraitOverrides { rank, name, respond_to } => {
                let _ = respond_to.send(taxonomy.get(rank, &name).cloned());
            }
            EngineCommand::StartMission {
                mission_type,
                agent_character_id,
                support_character_ids,
                target_region_id,
                target_family_id,
                respond_to,
            } => {
                let outcome = match characters.get(agent_character_id) {
                    Some(agent) if agent.is_alive => {
                        let agent_speed = agent.gene(GeneTrait::Speed);
                        let agent_family_id = agent.family_tree_id;
                        missions.start_mission(
                            StartMissionParams {
                                mission_type,
                                agent_character_id,
                                support_character_ids,
                                target_region_id,
                                target_family_id,
                                agent_family_id,
                                tick: clock.tick,
                            },
                            agent_speed,
                        )
                    }
                    _ => Err("agent not alive"),
                };
                let _ = respond_to.send(outcome);
            }
        }
    }
}

/// Breaks a pact the given character is party to: the other side is the
/// victim, and every other living character sharing the victim's region
/// witnesses the betrayal and marks the breaker down.
fn break_pact(
    pact_id: crate::simulation::ids::PactId,
    breaker_id: CharacterId,
    characters: &CharacterRegistry,
    pacts: &mut PactRegistry,
    trust: &mut TrustLedger,
    tick: u64,
) -> Result<(), &'static str> {
    let pact = pacts.get(pact_id).ok_or("unknown pact")?.clone();
    if pact.broken {
        return Err("already broken");
    }
    let victim_id = if breaker_id == pact.proposer {
        pact.target
    } else if breaker_id == pact.target {
        pact.proposer
    } else {
        return Err("not a party to this pact");
    };
    let breaker_family = characters.get(breaker_id).ok_or("unknown breaker")?.family_tree_id;
    let victim = characters.get(victim_id).ok_or("unknown victim")?;
    let victim_family = victim.family_tree_id;
    let victim_region = victim.region_id;

    let witness_families: Vec<_> = characters
        .iter()
        .filter(|c| c.is_alive && c.region_id == victim_region && c.family_tree_id != breaker_family && c.family_tree_id != victim_family)
        .map(|c| c.family_tree_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    pacts.break_pact(pact_id, breaker_family, victim_family, &witness_families, breaker_id, trust, tick);
    Ok(())
}

/// Validates both parties, derives the enemy-relationship signal from the
/// food web (a predator/prey pair across families starts further apart),
/// and rolls `evaluate_proposal`.
#[allow(clippy::too_many_arguments)]
fn propose_pact(
    proposer_id: CharacterId,
    target_id: CharacterId,
    offer: String,
    demand: String,
    characters: &CharacterRegistry,
    ecosystem: &EcosystemState,
    trust: &TrustLedger,
    tick: u64,
    rng: &mut impl rand::Rng,
) -> Result<crate::simulation::diplomacy::ProposalOutcome, ActionError> {
    let proposer = characters.get(proposer_id).ok_or(ActionError::NotAlive)?;
    if !proposer.is_alive {
        return Err(ActionError::NotAlive);
    }
    let target = characters.get(target_id).ok_or(ActionError::TargetUnreachable)?;
    if !target.is_alive {
        return Err(ActionError::TargetUnreachable);
    }
    let enemy_relationship_strength =
        if ecosystem.edge(proposer.species_id, target.species_id).is_some() || ecosystem.edge(target.species_id, proposer.species_id).is_some() {
            1.0
        } else {
            0.0
        };
    Ok(evaluate_proposal(
        proposer.family_tree_id,
        target.family_tree_id,
        proposer_id,
        target_id,
        proposer.species_id,
        target.species_id,
        offer,
        demand,
        trust,
        enemy_relationship_strength,
        tick,
        rng,
    ))
}

/// Trust decay, intel decay, and mission/espionage resolution run every
/// tick; only pact expiry is gated on the slower politics cadence.
fn periodic_subtasks_system(
    config: Res<SimulationConfig>,
    clock: Res<WorldClock>,
    regions: Res<RegionRegistry>,
    mut pacts: ResMut<PactRegistry>,
    mut trust: ResMut<TrustLedger>,
    mut intel: ResMut<IntelligenceMap>,
    mut missions: ResMut<MissionRegistry>,
    mut heartlands: ResMut<HeartlandTracker>,
    mut characters: ResMut<CharacterRegistry>,
    mut species: ResMut<SpeciesRegistry>,
    mut rng: ResMut<RngResource>,
    mut events: ResMut<WorldEventLog>,
) {
    if clock.tick % config.politics_interval_ticks == 0 {
        pacts.expire_pacts(clock.tick);
    }

    trust.tick_trust_decay(clock.tick);
    intel.decay_all(clock.tick);

    let active_missions: Vec<_> = missions
        .iter()
        .filter(|m| !m.completed && !m.detected)
        .map(|m| (m.id, m.agent_character_id, m.agent_family_id, m.target_region_id))
        .collect();
    for (mission_id, agent_id, agent_family_id, region_id) in active_missions {
        let Some(agent) = characters.get(agent_id) else { continue };
        let agent_size = agent.gene(GeneTrait::Size);
        let agent_intelligence = agent.gene(GeneTrait::Intelligence);
        let sentinels: Vec<&crate::simulation::character::Character> = characters
            .iter()
            .filter(|c| c.is_alive && c.region_id == region_id && c.family_tree_id != agent_family_id)
            .collect();
        let sentinel_sizes: Vec<f32> = sentinels.iter().map(|c| c.gene(GeneTrait::Size)).collect();
        let detector_intelligence = sentinels
            .iter()
            .map(|c| c.gene(GeneTrait::Intelligence))
            .fold(0.0f32, f32::max);
        if missions.attempt_detection(mission_id, agent_size, agent_intelligence, &sentinel_sizes, &mut rng.0) {
            let (_, description) = generate_detection_report(detector_intelligence);
            events.push(WorldEvent {
                tick: clock.tick,
                level: EventLevel::Personal,
                family_tree_id: Some(agent_family_id),
                character_id: Some(agent_id),
                summary: format!("mission spotted: {description}"),
            });
        }
    }

    missions.tick_missions(clock.tick, &mut characters, &mut intel, &mut heartlands, &mut rng.0);

    let resolved_spy_missions: Vec<_> = missions
        .iter()
        .filter(|m| m.mission_type == MissionType::Spy && !m.detected && m.resolved_at_tick == Some(clock.tick))
        .map(|m| (m.id, m.target_region_id))
        .collect();
    for (mission_id, region_id) in resolved_spy_missions {
        if let Ok(region) = regions.get(region_id) {
            missions.resolve_spy(mission_id, &mut intel, region, clock.tick);
        }
    }
    missions.prune(clock.tick);

    if clock.tick % config.evolution_interval_ticks == 0 {
        evolution_tick(&mut species, &characters);
    }
}

/// Finds characters that died since the last pass, picks an heir among
/// their direct children, transfers legacy, and mints a memorial card.
fn legacy_tick_system(
    mut characters: ResMut<CharacterRegistry>,
    mut cards: ResMut<CardRegistry>,
    mut death_ledger: ResMut<DeathLedger>,
    mut events: ResMut<WorldEventLog>,
    mut family_trees: ResMut<FamilyTreeRegistry>,
    mut species: ResMut<SpeciesRegistry>,
    clock: Res<WorldClock>,
) {
    let newly_dead: Vec<_> = characters
        .iter()
        .filter(|c| !c.is_alive && !death_ledger.0.contains(&c.id))
        .map(|c| (c.id, c.child_ids.clone(), c.role.clone(), c.fame, c.family_tree_id, c.species_id, c.character_class.clone()))
        .collect();

    for (dead_id, children, name, fame, family_tree_id, species_id, character_class) in newly_dead {
        death_ledger.0.insert(dead_id);
        let outcome = process_character_death(&mut characters, dead_id, &children);
        if character_class == CharacterClass::Main {
            cards.issue(dead_id, name, fame);
        }
        events.push(WorldEvent {
            tick: clock.tick,
            level: EventLevel::Regional,
            family_tree_id: Some(family_tree_id),
            character_id: Some(dead_id),
            summary: if outcome.legacy_transferred {
                format!("legacy passed to {:?}", outcome.heir)
            } else {
                "line ended with no living heir".to_string()
            },
        });

        let tree_has_living_members = family_trees
            .get(family_tree_id)
            .is_some_and(|tree| tree.members.iter().any(|&member_id| characters.get(member_id).is_some_and(|c| c.is_alive)));
        if !tree_has_living_members {
            if let Some(tree) = family_trees.get_mut(family_tree_id) {
                if !tree.is_extinct {
                    tree.is_extinct = true;
                    let _ = species.update_population(species_id, -1);
                }
            }
        }
    }
}

fn class_promotion_system(manager: Res<MainCharacterManager>, mut characters: ResMut<CharacterRegistry>) {
    manager.evaluate_promotions(&mut characters);
}

/// Delivers every non-personal `WorldEvent` recorded since the last fanout
/// pass to every connected owner. Personal events stay local to
/// `ecology_tick_system`'s direct family-subscriber notifications.
fn event_fanout_system(clock: Res<WorldClock>, events: Res<WorldEventLog>, sessions: Res<SessionRegistry>, mut cursor: ResMut<EventCursor>) {
    if events.is_empty() {
        cursor.0 = clock.tick;
        return;
    }
    for event in events.broadcastable(cursor.0) {
        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        sessions.broadcast(ServerMessage::Event { tick: event.tick, event: payload });
    }
    cursor.0 = clock.tick;
}

/// Serializes and writes a checkpoint every `checkpoint_interval_ticks`.
/// The write itself happens on a spawned task so the tick loop never blocks
/// on file I/O.
fn checkpoint_system(
    config: Res<SimulationConfig>,
    clock: Res<WorldClock>,
    regions: Res<RegionRegistry>,
    species: Res<SpeciesRegistry>,
    family_trees: Res<FamilyTreeRegistry>,
    cards: Res<CardRegistry>,
) {
    if clock.tick == 0 || clock.tick % config.checkpoint_interval_ticks != 0 {
        return;
    }
    let regions: Vec<_> = regions.iter().cloned().collect();
    let species: Vec<_> = species.get_all().to_vec();
    let family_trees: Vec<_> = family_trees.iter().cloned().collect();
    let cards: Vec<_> = cards.iter().cloned().collect();
    let document = snapshot::serialize("earthwatch", clock.tick, &clock.era(), &clock.started_at, &regions, &species, &family_trees, &cards);
    let dir = std::path::PathBuf::from(&config.checkpoint_dir);
    let timestamp = chrono::Utc::now().to_rfc3339();

    tokio::spawn(async move {
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!(error = %err, "failed to create checkpoint directory");
            return;
        }
        match snapshot::write_checkpoint(&dir, &document, None, &timestamp).await {
            Ok(path) => tracing::info!(path = %path.display(), "checkpoint written"),
            Err(err) => tracing::error!(error = %err, "checkpoint write failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::character::{CreateCharacterParams, Sex};

    fn test_world() -> SimulationWorld {
        let (_sender, inbox) = command::channel();
        SimulationWorld::new(SimulationConfig::default(), inbox)
    }

    #[tokio::test]
    async fn gestation_tick_system_births_offspring_with_inherited_genetics() {
        let mut sim = test_world();
        let world = sim.world_mut();

        let (species_id, region_id) = {
            let species = world.resource::<SpeciesRegistry>();
            let regions = world.resource::<RegionRegistry>();
            (species.get_all()[0].id, regions.iter().next().unwrap().id)
        };

        let tree_id = world
            .resource_mut::<FamilyTreeRegistry>()
            .create_tree(species_id, None, CharacterId(0));

        let (father_id, mother_id) = world.resource_scope(|world, mut characters: Mut<CharacterRegistry>| {
            let species = world.resource::<SpeciesRegistry>();
            let mut rng = SmallRng::seed_from_u64(7);
            let father_id = characters
                .create_character(
                    species,
                    CreateCharacterParams {
                        species_id,
                        region_id,
                        family_tree_id: tree_id,
                        tick: 0,
                        sex: Some(Sex::Male),
                        is_genesis_elder: true,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    &mut rng,
                )
                .unwrap();
            let mother_id = characters
                .create_character(
                    species,
                    CreateCharacterParams {
                        species_id,
                        region_id,
                        family_tree_id: tree_id,
                        tick: 0,
                        sex: Some(Sex::Female),
                        is_genesis_elder: true,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    &mut rng,
                )
                .unwrap();
            (father_id, mother_id)
        });
        world.resource_mut::<FamilyTreeRegistry>().add_member(tree_id, father_id, 0);
        world.resource_mut::<FamilyTreeRegistry>().add_member(tree_id, mother_id, 0);

        world.resource_scope(|world, mut characters: Mut<CharacterRegistry>| {
            world.resource_scope(|world, mut rng: Mut<RngResource>| {
                let species = world.resource::<SpeciesRegistry>();
                character::breed(&mut characters, species, father_id, mother_id, 0, &mut rng.0).unwrap().unwrap();
            });
        });

        let due_tick = world.resource::<WorldClock>().tick + 1;
        world
            .resource_mut::<CharacterRegistry>()
            .get_mut(mother_id)
            .unwrap()
            .gestation_ends_at_tick = Some(due_tick);

        sim.tick();

        let world = sim.world();
        let mother = world.resource::<CharacterRegistry>().get(mother_id).unwrap().clone();
        assert!(mother.gestation_ends_at_tick.is_none());
        assert!(mother.pending_mate_id.is_none());
        assert!(!mother.child_ids.is_empty());

        let child_id = mother.child_ids[0];
        let child = world.resource::<CharacterRegistry>().get(child_id).unwrap().clone();
        assert!(child.is_alive);
        assert_eq!(child.generation, 1);
        assert!(child.parent_ids.contains(&father_id));
        assert!(child.parent_ids.contains(&mother_id));

        let tree = world
            .resource::<FamilyTreeRegistry>()
            .iter()
            .find(|t| t.id == tree_id)
            .unwrap();
        assert!(tree.members.contains(&child_id));
    }
}
