//! Legacy, death & character class.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::arena::Arena;
use crate::simulation::character::{Character, CharacterClass, CharacterRegistry, KnowledgeSource};
use crate::simulation::ids::{CardId, CharacterId, IdCounter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathOutcome {
    pub legacy_transferred: bool,
    pub heir: Option<CharacterId>,
    pub respawn: bool,
}

/// `processCharacterDeath`. Picks the healthiest descendant (ties
/// broken by fame) as heir and transfers legacy; signals respawn when the
/// tree has no living descendants.
pub fn process_character_death(
    characters: &mut CharacterRegistry,
    dead: CharacterId,
    descendants: &[CharacterId],
) -> DeathOutcome {
    let heir = descendants
        .iter()
        .copied()
        .filter_map(|id| characters.get(id).map(|c| (id, c.health, c.fame)))
        .filter(|(_, health, _)| *health > 0.0)
        .max_by(|(_, health_a, fame_a), (_, health_b, fame_b)| {
            health_a
                .partial_cmp(health_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| fame_a.partial_cmp(fame_b).unwrap_or(std::cmp::Ordering::Equal))
        })
        .map(|(id, _, _)| id);

    match heir {
        Some(heir_id) => {
            inherit_legacy(characters, dead, heir_id);
            DeathOutcome {
                legacy_transferred: true,
                heir: Some(heir_id),
                respawn: false,
            }
        }
        None => DeathOutcome {
            legacy_transferred: false,
            heir: None,
            respawn: true,
        },
    }
}

const FAME_INHERITANCE_FACTOR: f32 = 0.3;
const RELATIONSHIP_CARRYOVER_THRESHOLD: f32 = 0.5;
const RELATIONSHIP_CARRYOVER_FACTOR: f32 = 0.5;

/// `inheritLegacy`: moves inventory, promotes experience knowledge to
/// inherited, and carries over a fraction of fame and strong relationships.
pub fn inherit_legacy(characters: &mut CharacterRegistry, parent: CharacterId, child: CharacterId) {
    let Some((parent_inventory, parent_experience, parent_fame, parent_relationships)) = characters
        .get(parent)
        .map(|p| {
            (
                p.inventory.clone(),
                p.knowledge
                    .iter()
                    .filter(|k| k.source == KnowledgeSource::Experience)
                    .cloned()
                    .collect::<Vec<_>>(),
                p.fame,
                p.relationships
                    .iter()
                    .filter(|r| r.strength.abs() >= RELATIONSHIP_CARRYOVER_THRESHOLD)
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        })
    else {
        return;
    };

    let Some(child_character) = characters.get_mut(child) else { return };
    child_character.inventory.extend(parent_inventory);
    for mut record in parent_experience {
        record.source = KnowledgeSource::Inherited;
        child_character.knowledge.push(record);
    }
    child_character.fame += FAME_INHERITANCE_FACTOR * parent_fame;
    for mut relationship in parent_relationships {
        relationship.strength *= RELATIONSHIP_CARRYOVER_FACTOR;
        child_character.relationships.push(relationship);
    }
}

const PROMOTION_SLOTS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorialCard {
    pub id: CardId,
    pub character_id: CharacterId,
    pub name: String,
    pub fame: f32,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct CardRegistry {
    cards: Arena<MemorialCard>,
    counter: IdCounter,
}

impl CardRegistry {
    pub fn issue(&mut self, character_id: CharacterId, name: impl Into<String>, fame: f32) -> CardId {
        let id = CardId(self.counter.next_raw());
        self.cards.push(MemorialCard {
            id,
            character_id,
            name: name.into(),
            fame,
        });
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemorialCard> {
        self.cards.iter()
    }
}

fn impact_score(character: &Character) -> f32 {
    character.fame + character.relationships.len() as f32 * 0.1
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct MainCharacterManager;

impl MainCharacterManager {
    /// `evaluatePromotions`: genesis elders are always main; otherwise
    /// the top 20 alive characters by impact are promoted, the rest demoted.
    pub fn evaluate_promotions(&self, characters: &mut CharacterRegistry) {
        let mut ranked: Vec<(CharacterId, f32, bool)> = characters
            .iter()
            .filter(|c| c.is_alive)
            .map(|c| (c.id, impact_score(c), c.is_genesis_elder))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut promoted = 0usize;
        let mut promote_ids = std::collections::HashSet::new();
        for (id, _, is_genesis_elder) in &ranked {
            if *is_genesis_elder || promoted < PROMOTION_SLOTS {
                promote_ids.insert(*id);
                if !is_genesis_elder {
                    promoted += 1;
                }
            }
        }

        for character in characters.iter_mut() {
            if !character.is_alive {
                continue;
            }
            character.character_class = if promote_ids.contains(&character.id) {
                CharacterClass::Main
            } else {
                CharacterClass::Regular
            };
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
    use crate::simulation::species::SpeciesRegistry;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn make_species(registry: &mut SpeciesRegistry) -> crate::simulation::ids::SpeciesId {
        registry.register(SpeciesDescriptor {
            name: "Test".into(),
            path: NamedTaxonomyPath {
                class: "C".into(),
                order: "O".into(),
                family: "F".into(),
                genus: "G".into(),
                species: "S".into(),
            },
            traits: ResolvedTraits {
                intelligence: 10.0,
                size: 50.0,
                strength: 10.0,
                speed: 10.0,
                lifespan_ticks: 1000,
                maturity_ticks: 100,
                gestation_ticks: 50,
                reproduction_rate: 1.0,
                diet: Diet::Omnivore,
                social_structure: "solitary".into(),
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
            },
            tier: Tier::Notable,
        })
    }

    #[test]
    fn heir_is_healthiest_descendant_ties_broken_by_fame() {
        let mut species = SpeciesRegistry::default();
        let species_id = make_species(&mut species);
        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut make = |health: f32, fame: f32| {
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
            character.health = health;
            character.fame = fame;
            id
        };
        let weak = make(0.2, 10.0);
        let strong_low_fame = make(0.9, 1.0);
        let strong_high_fame = make(0.9, 5.0);
        let dead = make(0.0, 0.0);

        let outcome = process_character_death(
            &mut characters,
            dead,
            &[weak, strong_low_fame, strong_high_fame],
        );
        assert_eq!(outcome.heir, Some(strong_high_fame));
        assert!(outcome.legacy_transferred);
    }

    #[test]
    fn no_living_descendants_signals_respawn() {
        let mut species = SpeciesRegistry::default();
        let species_id = make_species(&mut species);
        let mut characters = CharacterRegistry::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let dead = characters
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
        let outcome = process_character_death(&mut characters, dead, &[]);
        assert!(outcome.respawn);
        assert!(outcome.heir.is_none());
    }
}
