//! Species registry: resolved species with tier, status, and running
//! population totals.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::simulation::ids::{IdCounter, SpeciesId};
use crate::simulation::taxonomy::{ResolvedTraits, TaxonomyPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Flagship,
    Notable,
    /// Declared for completeness; no seed data in this crate produces it.
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesStatus {
    Stable,
    Vulnerable,
    Endangered,
    CriticallyEndangered,
    Extinct,
}

impl SpeciesStatus {
    fn rank(self) -> u8 {
        match self {
            SpeciesStatus::Stable => 0,
            SpeciesStatus::Vulnerable => 1,
            SpeciesStatus::Endangered => 2,
            SpeciesStatus::CriticallyEndangered => 3,
            SpeciesStatus::Extinct => 4,
        }
    }

    /// Status transitions monotonically down the track; extinction is final.
    fn for_population(total: i64) -> SpeciesStatus {
        match total {
            t if t <= 0 => SpeciesStatus::Extinct,
            t if t < 20 => SpeciesStatus::CriticallyEndangered,
            t if t < 100 => SpeciesStatus::Endangered,
            t if t < 500 => SpeciesStatus::Vulnerable,
            _ => SpeciesStatus::Stable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    pub path: NamedTaxonomyPath,
    pub traits: ResolvedTraits,
    pub tier: Tier,
    pub status: SpeciesStatus,
    pub total_population: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedTaxonomyPath {
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
}

impl From<&NamedTaxonomyPath> for TaxonomyPath {
    fn from(p: &NamedTaxonomyPath) -> Self {
        TaxonomyPath {
            class: p.class.clone(),
            order: p.order.clone(),
            family: p.family.clone(),
            genus: p.genus.clone(),
            species: p.species.clone(),
        }
    }
}

pub struct SpeciesDescriptor {
    pub name: String,
    pub path: NamedTaxonomyPath,
    pub traits: ResolvedTraits,
    pub tier: Tier,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    counter: IdCounter,
}

impl SpeciesRegistry {
    pub fn register(&mut self, descriptor: SpeciesDescriptor) -> SpeciesId {
        let id = SpeciesId(self.counter.next_raw());
        self.species.push(Species {
            id,
            name: descriptor.name,
            path: descriptor.path,
            traits: descriptor.traits,
            tier: descriptor.tier,
            status: SpeciesStatus::Stable,
            total_population: 0,
        });
        id
    }

    pub fn get(&self, id: SpeciesId) -> EngineResult<&Species> {
        self.species
            .get(id.index())
            .ok_or(EngineError::UnknownSpecies(id))
    }

    pub fn get_mut(&mut self, id: SpeciesId) -> EngineResult<&mut Species> {
        self.species
            .get_mut(id.index())
            .ok_or(EngineError::UnknownSpecies(id))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    pub fn get_all(&self) -> &[Species] {
        &self.species
    }

    /// Updates a species' running population total and rolls its status
    /// monotonically down the stable -> ... -> extinct track. Extinction is
    /// final: once extinct, further deltas never resurrect the status.
    pub fn update_population(&mut self, id: SpeciesId, delta: i64) -> EngineResult<()> {
        let species = self.get_mut(id)?;
        if species.status == SpeciesStatus::Extinct {
            species.total_population = (species.total_population + delta).max(0);
            return Ok(());
        }
        species.total_population = (species.total_population + delta).max(0);
        let candidate = SpeciesStatus::for_population(species.total_population);
        if candidate.rank() > species.status.rank() {
            species.status = candidate;
        }
        Ok(())
    }
}
