//! Action kernel: typed per-character actions and their outcomes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::simulation::character::{breed as breed_characters, CharacterRegistry};
use crate::simulation::ecosystem::EcosystemState;
use crate::simulation::ids::CharacterId;
use crate::simulation::intel::IntelligenceMap;
use crate::simulation::perception::ActionContext;
use crate::simulation::region::{can_hunt, RegionRegistry};
use crate::simulation::species::SpeciesRegistry;

/// error conditions every action may signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionError {
    NotAlive,
    WrongRegion,
    NotMature,
    InsufficientEnergy,
    TargetUnreachable,
    Refused { narrative: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Rest,
    Forage { resource_kind: String },
    Drink { resource_kind: String },
    Hunt,
    Attack { target_id: CharacterId },
    Breed { partner_id: CharacterId },
    Move { to_region_id: crate::simulation::ids::RegionId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub narrative: String,
    pub predator_encounter: bool,
}

fn ok(narrative: impl Into<String>) -> ActionOutcome {
    ActionOutcome {
        success: true,
        narrative: narrative.into(),
        predator_encounter: false,
    }
}

fn failed(narrative: impl Into<String>) -> ActionOutcome {
    ActionOutcome {
        success: false,
        narrative: narrative.into(),
        predator_encounter: false,
    }
}

const REST_ENERGY_GAIN: f32 = 0.15;
const REST_HEALTH_GAIN: f32 = 0.05;
const PREDATOR_ENCOUNTER_BASE: f32 = 0.02;
const PREDATOR_ENCOUNTER_DAMAGE: f32 = 0.2;
const COUNTER_DAMAGE: f32 = 0.25;
const SIZE_RATIO_SAFE_THRESHOLD: f32 = 1.5;

/// `checkPredatorEncounter`: rolls whether resting in a region with
/// nearby predators draws an attack, scaled by how many threats are present.
pub fn check_predator_encounter(context: &ActionContext, p_base: f32, rng: &mut impl Rng) -> bool {
    if context.threats.is_empty() {
        return false;
    }
    let probability = (p_base * context.threats.len() as f32).min(0.5);
    rng.gen_bool(probability as f64)
}

/// `processAction`. Mutates characters/regions in place; returns the
/// structured outcome the engine surfaces to the owner and event log.
pub fn process_action(
    action: &Action,
    context: &ActionContext,
    characters: &mut CharacterRegistry,
    regions: &mut RegionRegistry,
    species: &SpeciesRegistry,
    ecosystem: &EcosystemState,
    intel: &mut IntelligenceMap,
    tick: u64,
    rng: &mut impl Rng,
) -> Result<ActionOutcome, ActionError> {
    let actor_species_id = characters.get(context.actor_id).ok_or(ActionError::NotAlive)?.species_id;

    match action {
        Action::Rest => {
            let predator_encounter = check_predator_encounter(context, PREDATOR_ENCOUNTER_BASE, rng);
            let actor = characters.get_mut(context.actor_id).ok_or(ActionError::NotAlive)?;
            actor.energy = (actor.energy + REST_ENERGY_GAIN).min(1.0);
            if predator_encounter {
                actor.health = (actor.health - PREDATOR_ENCOUNTER_DAMAGE).max(0.0);
                Ok(ActionOutcome {
                    success: true,
                    narrative: "predator encounter while resting".to_string(),
                    predator_encounter: true,
                })
            } else {
                actor.health = (actor.health + REST_HEALTH_GAIN).min(1.0);
                Ok(ok("rested peacefully"))
            }
        }

        Action::Forage { resource_kind } | Action::Drink { resource_kind } => {
            let region = regions.get_mut(context.region_id).map_err(|_| ActionError::WrongRegion)?;
            let Some(resource) = region.resources.iter_mut().find(|r| &r.kind == resource_kind) else {
                return Ok(failed(format!("no {resource_kind} available here")));
            };
            let consumed = resource.renew_rate.max(1.0).min(resource.quantity);
            if consumed <= 0.0 {
                return Ok(failed(format!("{resource_kind} depleted")));
            }
            resource.quantity -= consumed;
            let actor = characters.get_mut(context.actor_id).ok_or(ActionError::NotAlive)?;
            actor.energy = (actor.energy + 0.1).min(1.0);
            Ok(ok(format!("consumed {consumed:.1} {resource_kind}")))
        }

        Action::Hunt => {
            let diet = species.get(actor_species_id).map_err(|_| ActionError::NotAlive)?.traits.diet;
            if !can_hunt(diet) {
                return Ok(failed("no hunting instinct"));
            }
            let prey_candidate = context
                .nearby_characters
                .iter()
                .find(|nearby| ecosystem.edge(actor_species_id, nearby.species_id).is_some());
            let Some(prey) = prey_candidate else {
                return Ok(failed("no suitable prey"));
            };
            let (actor_strength, actor_speed) = {
                let actor = characters.get(context.actor_id).ok_or(ActionError::NotAlive)?;
                (actor.gene(crate::simulation::character::GeneTrait::Strength), actor.gene(crate::simulation::character::GeneTrait::Speed))
            };
            let (prey_speed, prey_health) = {
                let prey_character = characters.get(prey.id).ok_or(ActionError::TargetUnreachable)?;
                (prey_character.gene(crate::simulation::character::GeneTrait::Speed), prey_character.health)
            };
            let success_probability = hunt_success_probability(actor_strength, actor_speed, prey_speed, prey_health);
            if rng.gen_bool(success_probability as f64) {
                if let Some(prey_character) = characters.get_mut(prey.id) {
                    prey_character.health = 0.0;
                    prey_character.is_alive = false;
                }
                Ok(ok("hunt succeeded"))
            } else {
                Ok(failed("hunt failed"))
            }
        }

        Action::Attack { target_id } => {
            let (actor_size, target_size) = {
                let (a, t) = characters
                    .get_pair_mut(context.actor_id, *target_id)
                    .ok_or(ActionError::TargetUnreachable)?;
                (
                    a.gene(crate::simulation::character::GeneTrait::Size),
                    t.gene(crate::simulation::character::GeneTrait::Size),
                )
            };
            let ratio = target_size / actor_size.max(0.001);
            let success_probability = (1.0 - (ratio - 1.0).max(0.0) * 0.3).clamp(0.1, 0.9);
            let succeeded = rng.gen_bool(success_probability as f64);
            let (actor, target) = characters
                .get_pair_mut(context.actor_id, *target_id)
                .ok_or(ActionError::TargetUnreachable)?;
            if succeeded {
                target.health = (target.health - 0.3).max(0.0);
                if target.health <= 0.0 {
                    target.is_alive = false;
                }
                Ok(ok("attack landed"))
            } else {
                if ratio > SIZE_RATIO_SAFE_THRESHOLD {
                    actor.health = (actor.health - COUNTER_DAMAGE).max(0.0);
                    Ok(failed("attack failed, took counter-damage"))
                } else {
                    Ok(failed("attack failed"))
                }
            }
        }

        Action::Breed { partner_id } => {
            let (male, female) = {
                let actor = characters.get(context.actor_id).ok_or(ActionError::NotAlive)?;
                let partner = characters.get(*partner_id).ok_or(ActionError::TargetUnreachable)?;
                match (actor.sex, partner.sex) {
                    (crate::simulation::character::Sex::Male, crate::simulation::character::Sex::Female) => {
                        (context.actor_id, *partner_id)
                    }
                    (crate::simulation::character::Sex::Female, crate::simulation::character::Sex::Male) => {
                        (*partner_id, context.actor_id)
                    }
                    _ => return Ok(failed("same sex")),
                }
            };
            match breed_characters(characters, species, male, female, tick, rng) {
                Ok(Ok(())) => Ok(ok("breeding started")),
                Ok(Err(reason)) => Ok(failed(reason)),
                Err(_) => Err(ActionError::TargetUnreachable),
            }
        }

        Action::Move { to_region_id } => {
            let actor_region = characters.get(context.actor_id).ok_or(ActionError::NotAlive)?.region_id;
            let region = regions.get(actor_region).map_err(|_| ActionError::WrongRegion)?;
            if !region.connections.contains(to_region_id) {
                return Err(ActionError::TargetUnreachable);
            }
            if let Ok(old_region) = regions.get_mut(actor_region) {
                if let Some(population) = old_region.populations.get_mut(&actor_species_id) {
                    population.characters.retain(|&id| id != context.actor_id);
                    population.count = population.count.saturating_sub(1);
                }
            }
            if let Ok(new_region) = regions.get_mut(*to_region_id) {
                let population = new_region.populations.entry(actor_species_id).or_default();
                population.characters.push(context.actor_id);
                population.count += 1;
            }
            let family_tree_id = characters.get(context.actor_id).map(|c| c.family_tree_id);
            if let Some(actor) = characters.get_mut(context.actor_id) {
                actor.region_id = *to_region_id;
            }
            if let (Some(family_tree_id), Ok(new_region)) = (family_tree_id, regions.get(*to_region_id)) {
                intel.record_exploration(family_tree_id, *to_region_id, new_region, tick);
            }
            Ok(ok("moved to new region"))
        }
    }
}

fn hunt_success_probability(actor_strength: f32, actor_speed: f32, prey_speed: f32, prey_health: f32) -> f32 {
    let power = (actor_strength + actor_speed) / 2.0;
    let defense = (prey_speed * prey_health.max(0.1)).max(1.0);
    (power / (power + defense)).clamp(0.05, 0.95)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::character::{CreateCharacterParams, Sex};
    use crate::simulation::ids::RegionId;
    use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor, Tier};
    use crate::simulation::taxonomy::{Diet, PerceptionTraits, ResolvedTraits};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn herbivore_traits() -> ResolvedTraits {
        ResolvedTraits {
            intelligence: 10.0,
            size: 20.0,
            strength: 10.0,
            speed: 20.0,
            lifespan_ticks: 1000,
            maturity_ticks: 50,
            gestation_ticks: 20,
            reproduction_rate: 2.0,
            diet: Diet::Herbivore,
            social_structure: "herd".into(),
            nocturnal: false,
            aquatic: false,
            can_fly: false,
            habitat: HashSet::new(),
            perception: PerceptionTraits {
                visual_range: 10.0,
                hearing_range: 10.0,
                smell_range: 10.0,
                echolocation: false,
                electroreception: false,
                thermal_sensing: false,
            },
        }
    }

    #[test]
    fn herbivore_cannot_hunt() {
        let mut species = SpeciesRegistry::default();
        let species_id = species.register(SpeciesDescriptor {
            name: "Deer".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "deer".into(),
            },
            traits: herbivore_traits(),
            tier: Tier::Notable,
        });
        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let actor = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id,
                    region_id: RegionId(0),
                    family_tree_id: crate::simulation::ids::FamilyTreeId(0),
                    tick: 0,
                    sex: Some(Sex::Male),
                    is_genesis_elder: true,
                    parent_ids: vec![],
                    generation: 0,
                },
                &mut rng,
            )
            .unwrap();
        let regions = RegionRegistry::default();
        let ecosystem = EcosystemState::default();
        let mut intel = IntelligenceMap::default();
        let context = ActionContext {
            actor_id: actor,
            region_id: RegionId(0),
            nearby_characters: vec![],
            available_resources: vec![],
            threats: vec![],
            tick: 0,
            time_of_day: "day".into(),
            season: "summer".into(),
        };
        let mut regions_mut = regions;
        let outcome = process_action(
            &Action::Hunt,
            &context,
            &mut characters,
            &mut regions_mut,
            &species,
            &ecosystem,
            &mut intel,
            0,
            &mut rng,
        )
        .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.narrative, "no hunting instinct");
    }
}
