//! Evolutionary drift (`evolution.tick`): every 500 ticks,
//! species baseline traits nudge toward the realized genetics of their
//! living population, grouped by species. A species with too few living
//! members to mean anything is left alone.

use std::collections::HashMap;

use crate::simulation::character::{CharacterRegistry, GeneTrait};
use crate::simulation::ids::SpeciesId;
use crate::simulation::species::SpeciesRegistry;

const MIN_COHORT: u32 = 5;
const DRIFT_RATE: f32 = 0.01;

struct GeneSums {
    size: f32,
    speed: f32,
    strength: f32,
    intelligence: f32,
    count: u32,
}

impl Default for GeneSums {
    fn default() -> Self {
        Self { size: 0.0, speed: 0.0, strength: 0.0, intelligence: 0.0, count: 0 }
    }
}

/// Averages core genes across each species' living population and nudges
/// the species' resolved trait baseline a small fraction of the way toward
/// that average — selection pressure expressed as slow drift rather than a
/// discrete mutation event.
pub fn evolution_tick(species: &mut SpeciesRegistry, characters: &CharacterRegistry) {
    let mut sums: HashMap<SpeciesId, GeneSums> = HashMap::new();
    for character in characters.iter().filter(|c| c.is_alive) {
        let entry = sums.entry(character.species_id).or_default();
        entry.size += character.gene(GeneTrait::Size);
        entry.speed += character.gene(GeneTrait::Speed);
        entry.strength += character.gene(GeneTrait::Strength);
        entry.intelligence += character.gene(GeneTrait::Intelligence);
        entry.count += 1;
    }

    for (species_id, sums) in sums {
        if sums.count < MIN_COHORT {
            continue;
        }
        let n = sums.count as f32;
        if let Ok(entry) = species.get_mut(species_id) {
            entry.traits.size += (sums.size / n - entry.traits.size) * DRIFT_RATE;
            entry.traits.speed += (sums.speed / n - entry.traits.speed) * DRIFT_RATE;
            entry.traits.strength += (sums.strength / n - entry.traits.strength) * DRIFT_RATE;
            entry.traits.intelligence += (sums.intelligence / n - entry.traits.intelligence) * DRIFT_RATE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::character::{CreateCharacterParams, Sex};
    use crate::simulation::ids::{FamilyTreeId, RegionId};
    use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor, Tier};
    use crate::simulation::taxonomy::{Diet, PerceptionTraits, ResolvedTraits};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn traits() -> ResolvedTraits {
        ResolvedTraits {
            intelligence: 50.0,
            size: 50.0,
            strength: 50.0,
            speed: 50.0,
            lifespan_ticks: 5000,
            maturity_ticks: 100,
            gestation_ticks: 50,
            reproduction_rate: 2.0,
            diet: Diet::Omnivore,
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
    fn small_cohort_does_not_move_baseline() {
        let mut species = SpeciesRegistry::default();
        let species_id = species.register(SpeciesDescriptor {
            name: "Test".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "s".into(),
            },
            traits: traits(),
            tier: Tier::Notable,
        });
        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..3 {
            characters
                .create_character(
                    &species,
                    CreateCharacterParams {
                        species_id,
                        region_id: RegionId(0),
                        family_tree_id: FamilyTreeId(0),
                        tick: 0,
                        sex: Some(Sex::Male),
                        is_genesis_elder: false,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    &mut rng,
                )
                .unwrap();
        }
        let before = species.get(species_id).unwrap().traits.size;
        evolution_tick(&mut species, &characters);
        assert_eq!(species.get(species_id).unwrap().traits.size, before);
    }

    #[test]
    fn large_cohort_drifts_baseline_toward_population_mean() {
        let mut species = SpeciesRegistry::default();
        let species_id = species.register(SpeciesDescriptor {
            name: "Test".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "s".into(),
            },
            traits: traits(),
            tier: Tier::Notable,
        });
        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..10 {
            let id = characters
                .create_character(
                    &species,
                    CreateCharacterParams {
                        species_id,
                        region_id: RegionId(0),
                        family_tree_id: FamilyTreeId(0),
                        tick: 0,
                        sex: Some(Sex::Male),
                        is_genesis_elder: false,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    &mut rng,
                )
                .unwrap();
            let character = characters.get_mut(id).unwrap();
            for gene in &mut character.genetics {
                if gene.trait_ == GeneTrait::Size {
                    gene.value = 90.0;
                }
            }
        }
        let before = species.get(species_id).unwrap().traits.size;
        evolution_tick(&mut species, &characters);
        let after = species.get(species_id).unwrap().traits.size;
        assert!(after > before);
    }
}
