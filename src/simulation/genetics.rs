//! Genetics & breeding : compatibility checks and offspring generation.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::simulation::character::{Character, Gene, Sex, APPEARANCE_GENES, CORE_GENES};
use crate::simulation::species::SpeciesRegistry;

const MUTATION_SIGMA: f32 = 6.0;
/// Cross-species mating succeeds only this often per attempt, even when the
/// pair is structurally compatible (, "deliberately rare").
pub const CROSS_SPECIES_SUCCESS_RATE: f32 = 0.01;

/// `canBreed`. Checked independent of all probabilistic effects; for a
/// same-species pair that passes, breeding always proceeds. For a
/// cross-species pair that passes, the caller still rolls
/// `CROSS_SPECIES_SUCCESS_RATE` before committing.
pub fn can_breed(
    a: &Character,
    b: &Character,
    species: &SpeciesRegistry,
    tick: u64,
) -> Result<(), &'static str> {
    if a.sex == b.sex {
        return Err("same sex");
    }
    let species_a = species.get(a.species_id).map_err(|_| "unknown species")?;
    let species_b = species.get(b.species_id).map_err(|_| "unknown species")?;
    if a.age < species_a.traits.maturity_ticks || b.age < species_b.traits.maturity_ticks {
        return Err("not mature");
    }
    if a.parent_ids.contains(&b.id) || b.parent_ids.contains(&a.id) {
        return Err("parent-child");
    }
    if !a.parent_ids.is_empty()
        && !b.parent_ids.is_empty()
        && a.parent_ids.iter().any(|p| b.parent_ids.contains(p))
    {
        return Err("sibling");
    }
    let female = if a.sex == Sex::Female { a } else { b };
    if female.gestation_ends_at_tick.map_or(false, |t| t > tick) {
        return Err("gestating");
    }
    if a.health < 0.3 || b.health < 0.3 {
        return Err("low health");
    }
    if a.species_id != b.species_id {
        if species_a.traits.habitat.is_disjoint(&species_b.traits.habitat) {
            return Err("habitat incompatible");
        }
        let (sa, sb) = (species_a.traits.size, species_b.traits.size);
        let ratio = sa.max(sb) / sa.min(sb).max(0.001);
        if ratio > 2.0 {
            return Err("size incompatible");
        }
    }
    Ok(())
}

/// Rolls whether a structurally-compatible cross-species attempt actually
/// succeeds. Same-species pairs should not call this; they always proceed.
pub fn cross_species_attempt_succeeds(rng: &mut impl Rng) -> bool {
    rng.gen_bool(CROSS_SPECIES_SUCCESS_RATE as f64)
}

fn sample_gene(rng: &mut impl Rng, mean: f32) -> f32 {
    let normal = Normal::new(mean as f64, MUTATION_SIGMA as f64).expect("finite sigma");
    (normal.sample(rng) as f32).clamp(0.0, 100.0)
}

/// `calculateOffspringGenetics`: every gene present on either parent is
/// blended as Gaussian((m+f)/2, sigma) and clamped to [0, 100].
pub fn calculate_offspring_genetics(mother: &Character, father: &Character, rng: &mut impl Rng) -> Vec<Gene> {
    let mut genetics = Vec::with_capacity(14);
    for trait_ in CORE_GENES.into_iter().chain(APPEARANCE_GENES) {
        let mean = (mother.gene(trait_) + father.gene(trait_)) / 2.0;
        genetics.push(Gene {
            trait_,
            value: sample_gene(rng, mean),
        });
    }
    genetics
}

/// Offspring count from `species.reproductionRate` with small jitter,
/// floored at 1.
pub fn offspring_count(reproduction_rate: f32, rng: &mut impl Rng) -> u32 {
    let jitter = rng.gen_range(-0.5..=0.5);
    ((reproduction_rate + jitter).round() as i32).max(1) as u32
}

pub fn offspring_sex(rng: &mut impl Rng) -> Sex {
    if rng.gen_bool(0.5) {
        Sex::Male
    } else {
        Sex::Female
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::character::{CharacterRegistry, CreateCharacterParams};
    use crate::simulation::ids::{FamilyTreeId, RegionId};
    use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor, Tier};
    use crate::simulation::taxonomy::{Diet, Layer, PerceptionTraits, ResolvedTraits};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn traits(size: f32, habitat: HashSet<Layer>) -> ResolvedTraits {
        ResolvedTraits {
            intelligence: 20.0,
            size,
            strength: 20.0,
            speed: 20.0,
            lifespan_ticks: 5000,
            maturity_ticks: 100,
            gestation_ticks: 50,
            reproduction_rate: 1.0,
            diet: Diet::Herbivore,
            social_structure: "herd".into(),
            nocturnal: false,
            aquatic: true,
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

    #[test]
    fn cross_species_size_ratio_blocks_breeding() {
        let mut species = SpeciesRegistry::default();
        let shark = species.register(SpeciesDescriptor {
            name: "Shark".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "shark".into(),
            },
            traits: traits(70.0, HashSet::from([Layer::Underwater])),
            tier: Tier::Notable,
        });
        let salmon = species.register(SpeciesDescriptor {
            name: "Salmon".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "salmon".into(),
            },
            traits: traits(25.0, HashSet::from([Layer::Underwater])),
            tier: Tier::Notable,
        });

        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let a = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id: shark,
                    region_id: RegionId(0),
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
        let b = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id: salmon,
                    region_id: RegionId(0),
                    family_tree_id: FamilyTreeId(0),
                    tick: 0,
                    sex: Some(Sex::Female),
                    is_genesis_elder: true,
                    parent_ids: vec![],
                    generation: 0,
                },
                &mut rng,
            )
            .unwrap();
        let ca = characters.get(a).unwrap();
        let cb = characters.get(b).unwrap();
        let result = can_breed(ca, cb, &species, 0);
        assert_eq!(result, Err("size incompatible"));
    }

    #[test]
    fn offspring_count_never_below_one() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(offspring_count(0.1, &mut rng) >= 1);
        }
    }
}
