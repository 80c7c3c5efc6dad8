//! Taxonomy engine: rank nodes with parent links and partial trait
//! overrides, resolved into a full species trait set by walking root to leaf.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub fn label(self) -> &'static str {
        match self {
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    Carnivore,
    Herbivore,
    Omnivore,
    FilterFeeder,
    Detritivore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Surface,
    Underwater,
    Underground,
}

/// Partial perception overrides; a deep-merged sub-object within trait maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerceptionOverride {
    pub visual_range: Option<f32>,
    pub hearing_range: Option<f32>,
    pub smell_range: Option<f32>,
    pub echolocation: Option<bool>,
    pub electroreception: Option<bool>,
    pub thermal_sensing: Option<bool>,
}

impl PerceptionOverride {
    fn merge_over(&self, base: &PerceptionOverride) -> PerceptionOverride {
        PerceptionOverride {
            visual_range: self.visual_range.or(base.visual_range),
            hearing_range: self.hearing_range.or(base.hearing_range),
            smell_range: self.smell_range.or(base.smell_range),
            echolocation: self.echolocation.or(base.echolocation),
            electroreception: self.electroreception.or(base.electroreception),
            thermal_sensing: self.thermal_sensing.or(base.thermal_sensing),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerceptionTraits {
    pub visual_range: f32,
    pub hearing_range: f32,
    pub smell_range: f32,
    pub echolocation: bool,
    pub electroreception: bool,
    pub thermal_sensing: bool,
}

/// A partial trait map as recorded on one taxonomy node. Every field is
/// optional; `resolveTraits` folds these root-to-leaf, later values winning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraitOverrides {
    pub intelligence: Option<f32>,
    pub size: Option<f32>,
    pub strength: Option<f32>,
    pub speed: Option<f32>,
    pub lifespan_ticks: Option<u64>,
    pub maturity_ticks: Option<u64>,
    pub gestation_ticks: Option<u64>,
    pub reproduction_rate: Option<f32>,
    pub diet: Option<Diet>,
    pub social_structure: Option<String>,
    pub nocturnal: Option<bool>,
    pub aquatic: Option<bool>,
    pub can_fly: Option<bool>,
    pub habitat: Option<HashSet<Layer>>,
    pub perception: PerceptionOverride,
}

impl TraitOverrides {
    fn merge_over(&self, base: &TraitOverrides) -> TraitOverrides {
        TraitOverrides {
            intelligence: self.intelligence.or(base.intelligence),
            size: self.size.or(base.size),
            strength: self.strength.or(base.strength),
            speed: self.speed.or(base.speed),
            lifespan_ticks: self.lifespan_ticks.or(base.lifespan_ticks),
            maturity_ticks: self.maturity_ticks.or(base.maturity_ticks),
            gestation_ticks: self.gestation_ticks.or(base.gestation_ticks),
            reproduction_rate: self.reproduction_rate.or(base.reproduction_rate),
            diet: self.diet.or(base.diet),
            social_structure: self
                .social_structure
                .clone()
                .or_else(|| base.social_structure.clone()),
            nocturnal: self.nocturnal.or(base.nocturnal),
            aquatic: self.aquatic.or(base.aquatic),
            can_fly: self.can_fly.or(base.can_fly),
            habitat: self.habitat.clone().or_else(|| base.habitat.clone()),
            perception: self.perception.merge_over(&base.perception),
        }
    }
}

/// Fully resolved species traits, the output of `resolveTraits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedTraits {
    pub intelligence: f32,
    pub size: f32,
    pub strength: f32,
    pub speed: f32,
    pub lifespan_ticks: u64,
    pub maturity_ticks: u64,
    pub gestation_ticks: u64,
    pub reproduction_rate: f32,
    pub diet: Diet,
    pub social_structure: String,
    pub nocturnal: bool,
    pub aquatic: bool,
    pub can_fly: bool,
    pub habitat: HashSet<Layer>,
    pub perception: PerceptionTraits,
}

/// Class-level defaults applied when a trait is absent across the whole path.
fn class_default_overrides() -> TraitOverrides {
    TraitOverrides {
        intelligence: Some(10.0),
        size: Some(20.0),
        strength: Some(10.0),
        speed: Some(10.0),
        lifespan_ticks: Some(2000),
        maturity_ticks: Some(200),
        gestation_ticks: Some(50),
        reproduction_rate: Some(1.0),
        diet: Some(Diet::Omnivore),
        social_structure: Some("solitary".to_string()),
        nocturnal: Some(false),
        aquatic: Some(false),
        can_fly: Some(false),
        habitat: Some(HashSet::from([Layer::Surface])),
        perception: PerceptionOverride {
            visual_range: Some(10.0),
            hearing_range: Some(10.0),
            smell_range: Some(10.0),
            echolocation: Some(false),
            electroreception: Some(false),
            thermal_sensing: Some(false),
        },
    }
}

fn finalize(overrides: TraitOverrides) -> ResolvedTraits {
    let defaults = class_default_overrides();
    let merged = overrides.merge_over(&defaults);
    ResolvedTraits {
        intelligence: merged.intelligence.unwrap(),
        size: merged.size.unwrap(),
        strength: merged.strength.unwrap(),
        speed: merged.speed.unwrap(),
        lifespan_ticks: merged.lifespan_ticks.unwrap(),
        maturity_ticks: merged.maturity_ticks.unwrap(),
        gestation_ticks: merged.gestation_ticks.unwrap(),
        reproduction_rate: merged.reproduction_rate.unwrap(),
        diet: merged.diet.unwrap(),
        social_structure: merged.social_structure.unwrap(),
        nocturnal: merged.nocturnal.unwrap(),
        aquatic: merged.aquatic.unwrap(),
        can_fly: merged.can_fly.unwrap(),
        habitat: merged.habitat.unwrap(),
        perception: PerceptionTraits {
            visual_range: merged.perception.visual_range.unwrap(),
            hearing_range: merged.perception.hearing_range.unwrap(),
            smell_range: merged.perception.smell_range.unwrap(),
            echolocation: merged.perception.echolocation.unwrap(),
            electroreception: merged.perception.electroreception.unwrap(),
            thermal_sensing: merged.perception.thermal_sensing.unwrap(),
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaxonomyNode {
    rank: Rank,
    name: String,
    parent: Option<(Rank, String)>,
    traits: TraitOverrides,
}

/// A path from class down to species, used to resolve a full trait set.
#[derive(Debug, Clone)]
pub struct TaxonomyPath {
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
}

#[derive(Debug, Clone, Default, Resource, Serialize, Deserialize)]
pub struct TaxonomyEngine {
    nodes: HashMap<(Rank, String), TaxonomyNode>,
}

impl TaxonomyEngine {
    pub fn register(
        &mut self,
        rank: Rank,
        name: &str,
        parent: Option<(Rank, &str)>,
        traits: TraitOverrides,
    ) -> EngineResult<()> {
        let key = (rank, name.to_string());
        if self.nodes.contains_key(&key) {
            return Err(EngineError::DuplicateTaxonomyNode {
                rank: rank.label().to_string(),
                name: name.to_string(),
            });
        }
        match (&rank, &parent) {
            (Rank::Class, None) => {}
            (Rank::Class, Some(_)) => {
                return Err(EngineError::UnknownTaxonomyParent {
                    rank: rank.label().to_string(),
                    name: "class nodes must not have a parent".to_string(),
                });
            }
            (_, None) => {
                return Err(EngineError::UnknownTaxonomyParent {
                    rank: rank.label().to_string(),
                    name: name.to_string(),
                });
            }
            (_, Some((parent_rank, parent_name))) => {
                let parent_key = (*parent_rank, parent_name.to_string());
                if !self.nodes.contains_key(&parent_key) {
                    return Err(EngineError::UnknownTaxonomyParent {
                        rank: parent_rank.label().to_string(),
                        name: parent_name.to_string(),
                    });
                }
            }
        }
        let parent_owned = parent.map(|(r, n)| (r, n.to_string()));
        self.nodes.insert(
            key,
            TaxonomyNode {
                rank,
                name: name.to_string(),
                parent: parent_owned,
                traits,
            },
        );
        Ok(())
    }

    pub fn get(&self, rank: Rank, name: &str) -> Option<&TraitOverrides> {
        self.nodes.get(&(rank, name.to_string())).map(|n| &n.traits)
    }

    /// Walks from the species node to the root, folding trait maps
    /// root-to-leaf so the most specific rank wins.
    pub fn resolve_traits(&self, path: &TaxonomyPath) -> EngineResult<ResolvedTraits> {
        let ranked = [
            (Rank::Class, &path.class),
            (Rank::Order, &path.order),
            (Rank::Family, &path.family),
            (Rank::Genus, &path.genus),
            (Rank::Species, &path.species),
        ];
        let mut accumulated = TraitOverrides::default();
        for (rank, name) in ranked {
            let node = self
                .nodes
                .get(&(rank, name.clone()))
                .ok_or_else(|| EngineError::UnknownTaxonomyParent {
                    rank: rank.label().to_string(),
                    name: name.clone(),
                })?;
            // Later (more specific) layers override earlier ones: merge the
            // running accumulation as the "base" beneath this node's traits.
            accumulated = node.traits.merge_over(&accumulated);
        }
        Ok(finalize(accumulated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(intelligence: Option<f32>, size: Option<f32>) -> TraitOverrides {
        TraitOverrides {
            intelligence,
            size,
            ..Default::default()
        }
    }

    #[test]
    fn resolve_traits_layers_root_to_leaf() {
        let mut engine = TaxonomyEngine::default();
        engine
            .register(Rank::Class, "Mammalia", None, overrides(Some(30.0), Some(50.0)))
            .unwrap();
        engine
            .register(
                Rank::Order,
                "Primates",
                Some((Rank::Class, "Mammalia")),
                overrides(Some(60.0), None),
            )
            .unwrap();
        engine
            .register(
                Rank::Family,
                "Hominidae",
                Some((Rank::Order, "Primates")),
                overrides(Some(70.0), None),
            )
            .unwrap();
        engine
            .register(
                Rank::Genus,
                "Homo",
                Some((Rank::Family, "Hominidae")),
                overrides(Some(80.0), None),
            )
            .unwrap();
        engine
            .register(
                Rank::Species,
                "sapiens",
                Some((Rank::Genus, "Homo")),
                TraitOverrides::default(),
            )
            .unwrap();

        let path = TaxonomyPath {
            class: "Mammalia".into(),
            order: "Primates".into(),
            family: "Hominidae".into(),
            genus: "Homo".into(),
            species: "sapiens".into(),
        };
        let resolved = engine.resolve_traits(&path).unwrap();
        assert_eq!(resolved.intelligence, 80.0);
        assert_eq!(resolved.size, 50.0);
    }

    #[test]
    fn unknown_parent_is_hard_error() {
        let mut engine = TaxonomyEngine::default();
        let result = engine.register(
            Rank::Order,
            "Carnivora",
            Some((Rank::Class, "Ghostia")),
            TraitOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn resolution_independent_of_unrelated_registration_order() {
        let build = |register_other_first: bool| {
            let mut engine = TaxonomyEngine::default();
            let register_target = |engine: &mut TaxonomyEngine| {
                engine
                    .register(Rank::Class, "Aves", None, overrides(Some(40.0), Some(15.0)))
                    .unwrap();
                engine
                    .register(
                        Rank::Order,
                        "Falconiformes",
                        Some((Rank::Class, "Aves")),
                        overrides(Some(65.0), None),
                    )
                    .unwrap();
                engine
                    .register(
                        Rank::Family,
                        "Falconidae",
                        Some((Rank::Order, "Falconiformes")),
                        TraitOverrides::default(),
                    )
                    .unwrap();
                engine
                    .register(
                        Rank::Genus,
                        "Falco",
                        Some((Rank::Family, "Falconidae")),
                        TraitOverrides::default(),
                    )
                    .unwrap();
                engine
                    .register(
                        Rank::Species,
                        "peregrinus",
                        Some((Rank::Genus, "Falco")),
                        TraitOverrides::default(),
                    )
                    .unwrap();
            };
            let register_unrelated = |engine: &mut TaxonomyEngine| {
                engine
                    .register(Rank::Class, "Mammalia", None, overrides(Some(30.0), Some(50.0)))
                    .unwrap();
            };
            if register_other_first {
                register_unrelated(&mut engine);
                register_target(&mut engine);
            } else {
                register_target(&mut engine);
                register_unrelated(&mut engine);
            }
            engine
        };

        let path = TaxonomyPath {
            class: "Aves".into(),
            order: "Falconiformes".into(),
            family: "Falconidae".into(),
            genus: "Falco".into(),
            species: "peregrinus".into(),
        };
        let a = build(true).resolve_traits(&path).unwrap();
        let b = build(false).resolve_traits(&path).unwrap();
        assert_eq!(a.intelligence, b.intelligence);
        assert_eq!(a.size, b.size);
    }
}
