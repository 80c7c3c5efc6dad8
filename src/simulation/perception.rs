//! Perception kernel: builds an agent's observable context.

use serde::{Deserialize, Serialize};

use crate::simulation::character::{Character, CharacterRegistry, Sex};
use crate::simulation::ecosystem::EcosystemState;
use crate::simulation::ids::{CharacterId, RegionId};
use crate::simulation::region::{RegionRegistry, ResourceStock};
use crate::simulation::species::SpeciesRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyCharacter {
    pub id: CharacterId,
    pub species_id: crate::simulation::ids::SpeciesId,
    pub sex: Sex,
    pub health: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub predator_id: CharacterId,
    pub predator_species_id: crate::simulation::ids::SpeciesId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionContext {
    pub actor_id: CharacterId,
    pub region_id: RegionId,
    pub nearby_characters: Vec<NearbyCharacter>,
    pub available_resources: Vec<ResourceStock>,
    pub threats: Vec<Threat>,
    pub tick: u64,
    pub time_of_day: String,
    pub season: String,
}

/// habitat-layer visibility gate: a character only perceives others whose
/// species habitat includes the shared region's layer. Perception range and
/// sense modalities (echolocation, thermal sensing, electroreception)
/// narrow the visible set further but never let an actor cross layers.
fn senses_character(
    actor_species: &crate::simulation::taxonomy::ResolvedTraits,
    other: &Character,
    other_species: &crate::simulation::taxonomy::ResolvedTraits,
    region_layer: crate::simulation::taxonomy::Layer,
) -> bool {
    if !other.is_alive {
        return false;
    }
    if !other_species.habitat.contains(&region_layer) {
        return false;
    }
    let perception = &actor_species.perception;
    let has_long_range_sense =
        perception.echolocation || perception.thermal_sensing || perception.electroreception;
    let base_range = perception
        .visual_range
        .max(perception.hearing_range)
        .max(perception.smell_range);
    has_long_range_sense || base_range > 0.0
}

/// `buildActionContext`. Returns `None` when the character is dead,
/// unknown, or its region no longer exists.
pub fn build_action_context(
    character_id: CharacterId,
    characters: &CharacterRegistry,
    regions: &RegionRegistry,
    species: &SpeciesRegistry,
    ecosystem: &EcosystemState,
    tick: u64,
    time_of_day: &str,
    season: &str,
) -> Option<ActionContext> {
    let actor = characters.get(character_id)?;
    if !actor.is_alive {
        return None;
    }
    let region = regions.get(actor.region_id).ok()?;
    let actor_traits = &species.get(actor.species_id).ok()?.traits;

    let nearby_characters: Vec<NearbyCharacter> = region
        .populations
        .values()
        .flat_map(|population| population.characters.iter())
        .filter(|&&id| id != actor.id)
        .filter_map(|&id| characters.get(id))
        .filter(|other| {
            let Ok(other_species) = species.get(other.species_id) else { return false };
            senses_character(actor_traits, other, &other_species.traits, region.layer)
        })
        .map(|other| NearbyCharacter {
            id: other.id,
            species_id: other.species_id,
            sex: other.sex,
            health: other.health,
        })
        .collect();

    let threats: Vec<Threat> = nearby_characters
        .iter()
        .filter(|nearby| ecosystem.edge(nearby.species_id, actor.species_id).is_some())
        .map(|nearby| Threat {
            predator_id: nearby.id,
            predator_species_id: nearby.species_id,
        })
        .collect();

    Some(ActionContext {
        actor_id: character_id,
        region_id: actor.region_id,
        nearby_characters,
        available_resources: region.resources.clone(),
        threats,
        tick,
        time_of_day: time_of_day.to_string(),
        season: season.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::character::{CreateCharacterParams, Sex};
    use crate::simulation::ids::FamilyTreeId;
    use crate::simulation::region::{Biome, Coordinates, RegionSpec};
    use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor, Tier};
    use crate::simulation::taxonomy::{Diet, Layer, PerceptionTraits, ResolvedTraits};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn unknown_character_has_no_context() {
        let characters = CharacterRegistry::default();
        let regions = RegionRegistry::default();
        let species = SpeciesRegistry::default();
        let ecosystem = EcosystemState::default();
        assert!(build_action_context(
            CharacterId(0),
            &characters,
            &regions,
            &species,
            &ecosystem,
            0,
            "day",
            "summer"
        )
        .is_none());
    }

    fn traits_with_habitat(habitat: HashSet<Layer>) -> ResolvedTraits {
        ResolvedTraits {
            intelligence: 10.0,
            size: 5.0,
            strength: 5.0,
            speed: 10.0,
            lifespan_ticks: 1000,
            maturity_ticks: 50,
            gestation_ticks: 20,
            reproduction_rate: 2.0,
            diet: Diet::Omnivore,
            social_structure: "solitary".into(),
            nocturnal: false,
            aquatic: false,
            can_fly: false,
            habitat,
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

    /// A surface-dwelling ladybug and an underwater shark end up in the same
    /// region's population roster; the habitat-layer gate must still keep
    /// the shark out of the ladybug's perceived context.
    #[test]
    fn nearby_characters_excludes_species_outside_region_layer() {
        let mut species = SpeciesRegistry::default();
        let ladybug_id = species.register(SpeciesDescriptor {
            name: "Ladybug".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "ladybug".into(),
            },
            traits: traits_with_habitat(HashSet::from([Layer::Surface])),
            tier: Tier::Notable,
        });
        let shark_id = species.register(SpeciesDescriptor {
            name: "Shark".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "shark".into(),
            },
            traits: traits_with_habitat(HashSet::from([Layer::Underwater])),
            tier: Tier::Notable,
        });

        let mut regions = RegionRegistry::default();
        let region_id = regions.create_region(RegionSpec {
            name: "Mixed Roster".into(),
            layer: Layer::Surface,
            biome: Biome::Grassland,
            coordinates: Coordinates { latitude: 0.0, longitude: 0.0 },
            elevation: 0.0,
            resources: vec![],
        });

        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let ladybug = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id: ladybug_id,
                    region_id,
                    family_tree_id: FamilyTreeId(0),
                    tick: 0,
                    sex: Some(Sex::Male),
                    is_genesis_elder: true,
                    parent_ids: vec![],
                    generation: 0,
                },
                &mut rng,
            )
            .unwrap();
        let shark = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id: shark_id,
                    region_id,
                    family_tree_id: FamilyTreeId(0),
                    tick: 0,
                    sex: Some(Sex::Male),
                    is_genesis_elder: true,
                    parent_ids: vec![],
                    generation: 0,
                },
                &mut rng,
            )
            .unwrap();

        let region = regions.get_mut(region_id).unwrap();
        region.populations.entry(ladybug_id).or_default().characters.push(ladybug);
        region.populations.entry(shark_id).or_default().characters.push(shark);

        let ecosystem = EcosystemState::default();
        let context = build_action_context(ladybug, &characters, &regions, &species, &ecosystem, 0, "day", "summer").unwrap();

        assert!(context.nearby_characters.iter().all(|nearby| nearby.id != shark));
    }
}
