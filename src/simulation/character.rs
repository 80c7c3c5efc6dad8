//! Character & family tree : per-individual state and lineage grouping.

use std::collections::HashSet;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::simulation::arena::Arena;
use crate::simulation::ids::{CharacterId, FamilyTreeId, IdCounter, OwnerId, RegionId, SpeciesId};
use crate::simulation::species::SpeciesRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// The 8 core genes plus 6 appearance genes, every character carries exactly
/// these 14 (genetics-seeding invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneTrait {
    Size,
    Speed,
    Strength,
    Intelligence,
    Endurance,
    Aggression,
    Curiosity,
    Sociability,
    BodySizeVar,
    LimbLength,
    CoatShade,
    MarkingPattern,
    EarSize,
    TeethSize,
}

pub const CORE_GENES: [GeneTrait; 8] = [
    GeneTrait::Size,
    GeneTrait::Speed,
    GeneTrait::Strength,
    GeneTrait::Intelligence,
    GeneTrait::Endurance,
    GeneTrait::Aggression,
    GeneTrait::Curiosity,
    GeneTrait::Sociability,
];

pub const APPEARANCE_GENES: [GeneTrait; 6] = [
    GeneTrait::BodySizeVar,
    GeneTrait::LimbLength,
    GeneTrait::CoatShade,
    GeneTrait::MarkingPattern,
    GeneTrait::EarSize,
    GeneTrait::TeethSize,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Gene {
    pub trait_: GeneTrait,
    pub value: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    Experience,
    Inherited,
    Taught,
    Rumor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub topic: String,
    pub source: KnowledgeSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub target_id: CharacterId,
    pub relationship_type: String,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Main,
    Regular,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub species_id: SpeciesId,
    pub region_id: RegionId,
    pub family_tree_id: FamilyTreeId,
    pub parent_ids: Vec<CharacterId>,
    pub child_ids: Vec<CharacterId>,
    pub sex: Sex,
    pub age: u64,
    pub birth_tick: u64,
    pub genetics: Vec<Gene>,
    pub health: f32,
    pub energy: f32,
    pub inventory: Vec<InventoryItem>,
    pub knowledge: Vec<KnowledgeRecord>,
    pub relationships: Vec<Relationship>,
    pub fame: f32,
    pub role: String,
    pub character_class: CharacterClass,
    pub is_genesis_elder: bool,
    pub gestation_ends_at_tick: Option<u64>,
    pub last_breeding_tick: Option<u64>,
    pub pending_mate_id: Option<CharacterId>,
    pub is_alive: bool,
    pub generation: u32,
}

impl Character {
    pub fn gene(&self, trait_: GeneTrait) -> f32 {
        self.genetics
            .iter()
            .find(|g| g.trait_ == trait_)
            .map(|g| g.value)
            .unwrap_or(50.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyTree {
    pub id: FamilyTreeId,
    pub species_id: SpeciesId,
    pub owner_id: Option<OwnerId>,
    pub root_character_id: CharacterId,
    pub generations: u32,
    pub members: HashSet<CharacterId>,
    pub is_extinct: bool,
}

pub struct CreateCharacterParams {
    pub species_id: SpeciesId,
    pub region_id: RegionId,
    pub family_tree_id: FamilyTreeId,
    pub tick: u64,
    pub sex: Option<Sex>,
    pub is_genesis_elder: bool,
    pub parent_ids: Vec<CharacterId>,
    pub generation: u32,
}

fn sample_gaussian_clamped(rng: &mut impl Rng, mean: f32, sigma: f32) -> f32 {
    let normal = Normal::new(mean as f64, sigma as f64).expect("finite sigma");
    (normal.sample(rng) as f32).clamp(0.0, 100.0)
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct CharacterRegistry {
    characters: Arena<Character>,
    counter: IdCounter,
}

impl CharacterRegistry {
    pub fn create_character(
        &mut self,
        species: &SpeciesRegistry,
        params: CreateCharacterParams,
        rng: &mut impl Rng,
    ) -> EngineResult<CharacterId> {
        let species_traits = &species.get(params.species_id)?.traits;
        let id = CharacterId(self.counter.next_raw());

        let mut genetics = Vec::with_capacity(14);
        let core_means = [
            (GeneTrait::Size, species_traits.size, 10.0),
            (GeneTrait::Speed, species_traits.speed, 10.0),
            (GeneTrait::Strength, species_traits.strength, 10.0),
            (GeneTrait::Intelligence, species_traits.intelligence, 10.0),
            (GeneTrait::Endurance, 50.0, 15.0),
            (GeneTrait::Aggression, 30.0, 15.0),
            (GeneTrait::Curiosity, 50.0, 15.0),
            (GeneTrait::Sociability, 50.0, 15.0),
        ];
        for (trait_, mean, sigma) in core_means {
            genetics.push(Gene {
                trait_,
                value: sample_gaussian_clamped(rng, mean, sigma),
            });
        }
        for trait_ in APPEARANCE_GENES {
            genetics.push(Gene {
                trait_,
                value: sample_gaussian_clamped(rng, 50.0, 15.0),
            });
        }

        let sex = params.sex.unwrap_or_else(|| {
            if rng.gen_bool(0.5) {
                Sex::Male
            } else {
                Sex::Female
            }
        });

        let age = if params.is_genesis_elder {
            species_traits.maturity_ticks * 2
        } else {
            0
        };

        let character = Character {
            id,
            species_id: params.species_id,
            region_id: params.region_id,
            family_tree_id: params.family_tree_id,
            parent_ids: params.parent_ids,
            child_ids: Vec::new(),
            sex,
            age,
            birth_tick: params.tick,
            genetics,
            health: 1.0,
            energy: 0.5,
            inventory: Vec::new(),
            knowledge: Vec::new(),
            relationships: Vec::new(),
            fame: 0.0,
            role: "unassigned".to_string(),
            character_class: if params.is_genesis_elder {
                CharacterClass::Main
            } else {
                CharacterClass::Regular
            },
            is_genesis_elder: params.is_genesis_elder,
            gestation_ends_at_tick: None,
            last_breeding_tick: None,
            pending_mate_id: None,
            is_alive: true,
            generation: params.generation,
        };
        self.characters.push(character);
        Ok(id)
    }

    /// Creates a gestated offspring from already-computed inherited
    /// genetics, bypassing the species-mean sampling `create_character`
    /// uses for founding populations.
    #[allow(clippy::too_many_arguments)]
    pub fn birth_offspring(
        &mut self,
        species_id: SpeciesId,
        region_id: RegionId,
        family_tree_id: FamilyTreeId,
        tick: u64,
        sex: Sex,
        parent_ids: Vec<CharacterId>,
        generation: u32,
        genetics: Vec<Gene>,
    ) -> CharacterId {
        let id = CharacterId(self.counter.next_raw());
        let character = Character {
            id,
            species_id,
            region_id,
            family_tree_id,
            parent_ids,
            child_ids: Vec::new(),
            sex,
            age: 0,
            birth_tick: tick,
            genetics,
            health: 1.0,
            energy: 0.5,
            inventory: Vec::new(),
            knowledge: Vec::new(),
            relationships: Vec::new(),
            fame: 0.0,
            role: "unassigned".to_string(),
            character_class: CharacterClass::Regular,
            is_genesis_elder: false,
            gestation_ends_at_tick: None,
            last_breeding_tick: None,
            pending_mate_id: None,
            is_alive: true,
            generation,
        };
        self.characters.push(character);
        id
    }

    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.index())
    }

    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(id.index())
    }

    pub fn get_pair_mut(
        &mut self,
        a: CharacterId,
        b: CharacterId,
    ) -> Option<(&mut Character, &mut Character)> {
        self.characters.get_two_mut(a.index(), b.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.iter_mut()
    }
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct FamilyTreeRegistry {
    trees: Arena<FamilyTree>,
    counter: IdCounter,
}

impl FamilyTreeRegistry {
    pub fn create_tree(
        &mut self,
        species_id: SpeciesId,
        owner_id: Option<OwnerId>,
        root_character_id: CharacterId,
    ) -> FamilyTreeId {
        let id = FamilyTreeId(self.counter.next_raw());
        let mut members = HashSet::new();
        members.insert(root_character_id);
        self.trees.push(FamilyTree {
            id,
            species_id,
            owner_id,
            root_character_id,
            generations: 1,
            members,
            is_extinct: false,
        });
        id
    }

    pub fn get(&self, id: FamilyTreeId) -> Option<&FamilyTree> {
        self.trees.get(id.index())
    }

    pub fn get_mut(&mut self, id: FamilyTreeId) -> Option<&mut FamilyTree> {
        self.trees.get_mut(id.index())
    }

    pub fn add_member(&mut self, id: FamilyTreeId, member: CharacterId, generation: u32) {
        if let Some(tree) = self.trees.get_mut(id.index()) {
            tree.members.insert(member);
            if generation + 1 > tree.generations {
                tree.generations = generation + 1;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FamilyTree> {
        self.trees.iter()
    }
}

/// `breed`: validates via `canBreed`, then starts gestation. A
/// structurally-compatible cross-species pair additionally rolls
/// `CROSS_SPECIES_SUCCESS_RATE` before gestation begins.
pub fn breed(
    characters: &mut CharacterRegistry,
    species: &SpeciesRegistry,
    male: CharacterId,
    female: CharacterId,
    tick: u64,
    rng: &mut impl rand::Rng,
) -> EngineResult<Result<(), &'static str>> {
    let (cross_species, check) = {
        let m = characters.get(male).ok_or(EngineError::DuplicateId { registry: "character" })?;
        let f = characters.get(female).ok_or(EngineError::DuplicateId { registry: "character" })?;
        (
            m.species_id != f.species_id,
            crate::simulation::genetics::can_breed(m, f, species, tick),
        )
    };
    if let Err(reason) = check {
        return Ok(Err(reason));
    }
    if cross_species && !crate::simulation::genetics::cross_species_attempt_succeeds(rng) {
        return Ok(Err("cross-species attempt failed"));
    }
    let gestation_ticks = species.get(
        characters
            .get(female)
            .expect("checked above")
            .species_id,
    )?.traits.gestation_ticks;
    if let Some(mother) = characters.get_mut(female) {
        mother.gestation_ends_at_tick = Some(tick + gestation_ticks);
        mother.last_breeding_tick = Some(tick);
        mother.pending_mate_id = Some(male);
    }
    if let Some(father) = characters.get_mut(male) {
        father.last_breeding_tick = Some(tick);
    }
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::species::{SpeciesDescriptor, NamedTaxonomyPath, Tier};
    use crate::simulation::taxonomy::{Diet, PerceptionTraits};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet as Set;

    fn make_species(registry: &mut SpeciesRegistry, intelligence: f32) -> SpeciesId {
        registry.register(SpeciesDescriptor {
            name: "Test".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "S".into(),
            },
            traits: crate::simulation::taxonomy::ResolvedTraits {
                intelligence,
                size: 50.0,
                strength: 40.0,
                speed: 30.0,
                lifespan_ticks: 5000,
                maturity_ticks: 100,
                gestation_ticks: 50,
                reproduction_rate: 2.0,
                diet: Diet::Omnivore,
                social_structure: "pack".into(),
                nocturnal: false,
                aquatic: false,
                can_fly: false,
                habitat: Set::new(),
                perception: PerceptionTraits {
                    visual_range: 10.0,
                    hearing_range: 10.0,
                    smell_range: 10.0,
                    echolocation: false,
                    electroreception: false,
                    thermal_sensing: false,
                },
            },
            tier: Tier::Notable,
        })
    }

    #[test]
    fn seeded_character_has_exactly_14_genes_in_bounds() {
        let mut species = SpeciesRegistry::default();
        let species_id = make_species(&mut species, 80.0);
        let mut characters = CharacterRegistry::default();
        let mut trees = FamilyTreeRegistry::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let tree_root = CharacterId(0);
        let tree = trees.create_tree(species_id, None, tree_root);
        let id = characters
            .create_character(
                &species,
                CreateCharacterParams {
                    species_id,
                    region_id: RegionId(0),
                    family_tree_id: tree,
                    tick: 0,
                    sex: None,
                    is_genesis_elder: false,
                    parent_ids: vec![],
                    generation: 0,
                },
                &mut rng,
            )
            .unwrap();
        let character = characters.get(id).unwrap();
        assert_eq!(character.genetics.len(), 14);
        for gene in &character.genetics {
            assert!(gene.value >= 0.0 && gene.value <= 100.0);
        }
    }

    #[test]
    fn gene_mean_tracks_species_trait_over_samples() {
        let mut species = SpeciesRegistry::default();
        let species_id = make_species(&mut species, 80.0);
        let mut characters = CharacterRegistry::default();
        let mut trees = FamilyTreeRegistry::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let tree = trees.create_tree(species_id, None, CharacterId(0));
        let mut total = 0.0;
        let n = 30;
        for _ in 0..n {
            let id = characters
                .create_character(
                    &species,
                    CreateCharacterParams {
                        species_id,
                        region_id: RegionId(0),
                        family_tree_id: tree,
                        tick: 0,
                        sex: None,
                        is_genesis_elder: false,
                        parent_ids: vec![],
                        generation: 0,
                    },
                    &mut rng,
                )
                .unwrap();
            total += characters.get(id).unwrap().gene(GeneTrait::Intelligence);
        }
        let mean = total / n as f32;
        assert!((mean - 80.0).abs() < 15.0, "mean {} too far from 80", mean);
    }
}
