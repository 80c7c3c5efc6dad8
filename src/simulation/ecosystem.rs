//! Ecosystem state and world-boot initializer: food-web edges,
//! per-region carrying capacity, and initial population seeding.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::simulation::character::{CharacterRegistry, CreateCharacterParams, Sex};
use crate::simulation::ids::{RegionId, SpeciesId};
use crate::simulation::region::{is_biome_suitable, RegionRegistry};
use crate::simulation::species::{SpeciesRegistry, Tier};
use crate::simulation::taxonomy::Diet;
use crate::simulation::character::FamilyTreeRegistry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FoodWebEdge {
    pub predator: SpeciesId,
    pub prey: SpeciesId,
    pub efficiency: f32,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct EcosystemState {
    pub food_web: Vec<FoodWebEdge>,
    pub carrying_capacity: HashMap<RegionId, i64>,
}

impl EcosystemState {
    pub fn edge(&self, predator: SpeciesId, prey: SpeciesId) -> Option<&FoodWebEdge> {
        self.food_web
            .iter()
            .find(|e| e.predator == predator && e.prey == prey)
    }
}

fn max_prey_count(predator_diet: Diet, predator_size: f32) -> usize {
    let raw = if predator_diet == Diet::Carnivore {
        (predator_size / 10.0 + 3.0).clamp(3.0, 12.0)
    } else {
        (predator_size / 15.0 + 2.0).clamp(2.0, 6.0)
    };
    raw.round() as usize
}

fn efficiency_for(predator_diet: Diet, predator_size: f32, prey_size: f32) -> f32 {
    let ratio = predator_size / prey_size.max(1.0);
    let value = if predator_diet == Diet::Carnivore {
        (0.05 + 0.03 * ratio.min(3.0)).min(0.2)
    } else {
        0.03 + 0.02 * ratio.min(2.0)
    };
    value.clamp(0.001, 0.2)
}

/// Builds the food web with the unified diet-based logic: carnivore and
/// omnivore predators share the same selection path, filter-feeders and
/// herbivores are never predators.
pub fn build_food_web(species: &SpeciesRegistry) -> Vec<FoodWebEdge> {
    let all = species.get_all();
    let mut edges = Vec::new();
    for predator in all {
        if !matches!(predator.traits.diet, Diet::Carnivore | Diet::Omnivore) {
            continue;
        }
        let ideal = 0.4 * predator.traits.size;
        let mut candidates: Vec<&crate::simulation::species::Species> = all
            .iter()
            .filter(|prey| prey.id != predator.id)
            .filter(|prey| !prey.traits.habitat.is_disjoint(&predator.traits.habitat))
            .filter(|prey| prey.traits.size <= 1.2 * predator.traits.size)
            .filter(|prey| prey.traits.size >= 0.02 * predator.traits.size)
            .filter(|prey| {
                predator.traits.diet != Diet::Omnivore || prey.traits.diet != Diet::Carnivore
            })
            .collect();
        candidates.sort_by(|a, b| {
            let da = (a.traits.size - ideal).abs();
            let db = (b.traits.size - ideal).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        let max_prey = max_prey_count(predator.traits.diet, predator.traits.size);
        for prey in candidates.into_iter().take(max_prey) {
            let efficiency = efficiency_for(predator.traits.diet, predator.traits.size, prey.traits.size);
            edges.push(FoodWebEdge {
                predator: predator.id,
                prey: prey.id,
                efficiency,
            });
        }
    }
    edges
}

/// Per-region carrying capacity: sum of resource max quantities times the
/// biome multiplier.
pub fn compute_carrying_capacity(regions: &RegionRegistry) -> HashMap<RegionId, i64> {
    let mut map = HashMap::new();
    for region in regions.iter() {
        let resource_sum: f32 = region.resources.iter().map(|r| r.max_quantity).sum();
        let capacity = (resource_sum * region.biome.capacity_multiplier()) as i64;
        map.insert(region.id, capacity);
    }
    map
}

fn size_factor(size: f32) -> f32 {
    (1.0 - size / 150.0).max(0.2)
}

fn tier_base_population(tier: Tier) -> i64 {
    match tier {
        Tier::Flagship => 150,
        Tier::Notable | Tier::Generated => 75,
    }
}

/// world-boot initializer: seeds 20%-40% (min 3) of the suitable regions
/// per species with an initial population, builds the food web, and
/// computes carrying capacity.
pub fn initialize_world_ecosystem(
    species: &mut SpeciesRegistry,
    regions: &mut RegionRegistry,
    characters: &mut CharacterRegistry,
    trees: &mut FamilyTreeRegistry,
    rng: &mut impl Rng,
) -> EcosystemState {
    let species_ids: Vec<SpeciesId> = species.get_all().iter().map(|s| s.id).collect();
    for species_id in species_ids {
        let (habitat, aquatic, can_fly, size, tier) = {
            let s = species.get(species_id).expect("species exists");
            (
                s.traits.habitat.clone(),
                s.traits.aquatic,
                s.traits.can_fly,
                s.traits.size,
                s.tier,
            )
        };
        let mut suitable: Vec<RegionId> = regions
            .iter()
            .filter(|r| habitat.contains(&r.layer))
            .filter(|r| is_biome_suitable(aquatic, can_fly, size, &habitat, r))
            .map(|r| r.id)
            .collect();
        if suitable.is_empty() {
            continue;
        }
        let fraction = rng.gen_range(0.2..=0.4);
        let mut count = ((suitable.len() as f32) * fraction).round() as usize;
        count = count.max(3).min(suitable.len());
        // Deterministic-ish selection: shuffle via partial Fisher-Yates.
        for i in 0..count {
            let j = rng.gen_range(i..suitable.len());
            suitable.swap(i, j);
        }
        let chosen = &suitable[..count];

        let base_population = tier_base_population(tier);
        let scaled = ((base_population as f32) * size_factor(size)).round() as i64;

        for &region_id in chosen {
            let mut members = Vec::with_capacity(scaled.max(1) as usize);
            for _ in 0..scaled.max(1) {
                let sex = if rng.gen_bool(0.5) { Some(Sex::Male) } else { Some(Sex::Female) };
                // Family trees need a root id before they can be created; we
                // temporarily point every elder at tree id 0 and fix it up
                // once the real tree exists below.
                if let Ok(id) = characters.create_character(
                    species,
                    CreateCharacterParams {
                        species_id,
                        region_id,
                        family_tree_id: crate::simulation::ids::FamilyTreeId(0),
                        tick: 0,
                        sex,
                        is_genesis_elder: true,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    rng,
                ) {
                    members.push(id);
                }
            }
            let Some(&root) = members.first() else { continue };
            let tree_id = trees.create_tree(species_id, None, root);
            for &member in &members {
                if let Some(character) = characters.get_mut(member) {
                    character.family_tree_id = tree_id;
                }
                trees.add_member(tree_id, member, 0);
                if let Ok(region) = regions.get_mut(region_id) {
                    let population = region.populations.entry(species_id).or_default();
                    population.count += 1;
                    population.characters.push(member);
                }
            }
            let _ = species.update_population(species_id, members.len() as i64);
        }
    }

    let food_web = build_food_web(species);
    let carrying_capacity = compute_carrying_capacity(regions);
    EcosystemState {
        food_web,
        carrying_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor};
    use crate::simulation::taxonomy::{Layer, PerceptionTraits, ResolvedTraits};
    use std::collections::HashSet;

    fn make_species(
        registry: &mut SpeciesRegistry,
        name: &str,
        diet: Diet,
        size: f32,
        habitat: HashSet<Layer>,
    ) -> SpeciesId {
        registry.register(SpeciesDescriptor {
            name: name.into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: name.into(),
            },
            traits: ResolvedTraits {
                intelligence: 20.0,
                size,
                strength: 20.0,
                speed: 20.0,
                lifespan_ticks: 5000,
                maturity_ticks: 100,
                gestation_ticks: 50,
                reproduction_rate: 2.0,
                diet,
                social_structure: "herd".into(),
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
            },
            tier: crate::simulation::species::Tier::Notable,
        })
    }

    #[test]
    fn food_web_never_has_herbivore_predators_and_efficiency_in_range() {
        let mut species = SpeciesRegistry::default();
        let wolf = make_species(&mut species, "wolf", Diet::Carnivore, 60.0, HashSet::from([Layer::Surface]));
        let deer = make_species(&mut species, "deer", Diet::Herbivore, 50.0, HashSet::from([Layer::Surface]));
        let grass_eater = make_species(&mut species, "rabbit", Diet::Herbivore, 5.0, HashSet::from([Layer::Surface]));
        let _ = grass_eater;
        let edges = build_food_web(&species);
        assert!(edges.iter().all(|e| e.predator != deer));
        for e in &edges {
            assert!(e.efficiency > 0.0 && e.efficiency <= 0.2);
            let predator = species.get(e.predator).unwrap();
            let prey = species.get(e.prey).unwrap();
            assert!(prey.traits.size <= 1.2 * predator.traits.size);
            assert!(prey.traits.size >= 0.02 * predator.traits.size);
        }
        assert!(edges.iter().any(|e| e.predator == wolf));
    }
}
