//! World & regions : hierarchy of regions with biome, layer, climate
//! state, resources, connections, populations, and hidden locations.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::simulation::arena::Arena;
use crate::simulation::ids::{CharacterId, IdCounter, RegionId, SpeciesId};
use crate::simulation::taxonomy::{Diet, Layer};

/// Closed biome enumeration referenced throughout region seeding and climate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    TropicalRainforest,
    TemperateForest,
    BorealForest,
    Savanna,
    Grassland,
    Desert,
    Tundra,
    Mountain,
    Wetland,
    Coastal,
    CoralReef,
    OpenOcean,
    DeepOcean,
    HydrothermalVent,
    KelpForest,
    CaveSystem,
    UndergroundRiver,
    SubterraneanEcosystem,
}

impl Biome {
    /// Carrying-capacity multiplier used by the ecosystem initializer.
    pub fn capacity_multiplier(self) -> f32 {
        match self {
            Biome::TropicalRainforest => 3.0,
            Biome::TemperateForest => 2.0,
            Biome::BorealForest => 1.5,
            Biome::Savanna => 1.8,
            Biome::Grassland => 1.6,
            Biome::Desert => 0.5,
            Biome::Tundra => 0.6,
            Biome::Mountain => 0.7,
            Biome::Wetland => 1.9,
            Biome::Coastal => 1.4,
            Biome::CoralReef => 2.2,
            Biome::OpenOcean => 1.0,
            Biome::DeepOcean => 0.3,
            Biome::HydrothermalVent => 0.4,
            Biome::KelpForest => 1.7,
            Biome::CaveSystem => 0.5,
            Biome::UndergroundRiver => 0.8,
            Biome::SubterraneanEcosystem => 0.6,
        }
    }

    /// Biomes where the aquatic habitat check succeeds.
    pub fn is_aquatic_habitat(self) -> bool {
        matches!(
            self,
            Biome::CoralReef
                | Biome::OpenOcean
                | Biome::DeepOcean
                | Biome::HydrothermalVent
                | Biome::KelpForest
                | Biome::Wetland
                | Biome::Coastal
                | Biome::UndergroundRiver
        )
    }

    /// Forest-like biomes absorb pollution faster than desert-like ones.
    pub fn pollution_absorption(self) -> f32 {
        match self {
            Biome::TropicalRainforest => 0.12,
            Biome::TemperateForest => 0.09,
            Biome::BorealForest => 0.07,
            Biome::KelpForest => 0.08,
            Biome::Wetland => 0.06,
            Biome::Savanna | Biome::Grassland => 0.04,
            Biome::Desert | Biome::Tundra | Biome::Mountain => 0.015,
            _ => 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f32,
    pub longitude: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClimateState {
    pub temperature: f32,
    pub humidity: f32,
    pub wind_speed: f32,
    pub precipitation: f32,
    pub pollution: f32,
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            temperature: 15.0,
            humidity: 0.5,
            wind_speed: 5.0,
            precipitation: 0.2,
            pollution: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStock {
    pub kind: String,
    pub quantity: f32,
    pub max_quantity: f32,
    pub renew_rate: f32,
    /// Undisturbed renew rate; climate's tidal effect recomputes
    /// `renew_rate` from this each tick so repeated application never
    /// compounds.
    pub base_renew_rate: f32,
}

impl ResourceStock {
    pub fn new(kind: impl Into<String>, quantity: f32, max_quantity: f32, renew_rate: f32) -> Self {
        Self {
            kind: kind.into(),
            quantity,
            max_quantity,
            renew_rate,
            base_renew_rate: renew_rate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    pub count: i64,
    pub characters: Vec<CharacterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenLocation {
    pub name: String,
    pub discovered_by: HashSet<crate::simulation::ids::FamilyTreeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub layer: Layer,
    pub biome: Biome,
    pub coordinates: Coordinates,
    pub elevation: f32,
    pub climate: ClimateState,
    pub resources: Vec<ResourceStock>,
    pub connections: Vec<RegionId>,
    pub populations: HashMap<SpeciesId, Population>,
    pub hidden_locations: Vec<HiddenLocation>,
}

pub struct RegionSpec {
    pub name: String,
    pub layer: Layer,
    pub biome: Biome,
    pub coordinates: Coordinates,
    pub elevation: f32,
    pub resources: Vec<ResourceStock>,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct RegionRegistry {
    regions: Arena<Region>,
    counter: IdCounter,
}

impl RegionRegistry {
    pub fn create_region(&mut self, spec: RegionSpec) -> RegionId {
        let id = RegionId(self.counter.next_raw());
        let region = Region {
            id,
            name: spec.name,
            layer: spec.layer,
            biome: spec.biome,
            coordinates: spec.coordinates,
            elevation: spec.elevation,
            climate: ClimateState::default(),
            resources: spec.resources,
            connections: Vec::new(),
            populations: HashMap::new(),
            hidden_locations: Vec::new(),
        };
        self.regions.push(region);
        id
    }

    /// Registers a bidirectional connection between two regions.
    pub fn connect(&mut self, a: RegionId, b: RegionId) -> EngineResult<()> {
        {
            let ra = self.get_mut(a)?;
            if !ra.connections.contains(&b) {
                ra.connections.push(b);
            }
        }
        let rb = self.get_mut(b)?;
        if !rb.connections.contains(&a) {
            rb.connections.push(a);
        }
        Ok(())
    }

    pub fn get(&self, id: RegionId) -> EngineResult<&Region> {
        self.regions.get(id.index()).ok_or(EngineError::UnknownRegion(id))
    }

    pub fn get_mut(&mut self, id: RegionId) -> EngineResult<&mut Region> {
        self.regions
            .get_mut(id.index())
            .ok_or(EngineError::UnknownRegion(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.regions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// `isBiomeSuitable`.
pub fn is_biome_suitable(
    aquatic: bool,
    can_fly: bool,
    size: f32,
    habitat: &HashSet<Layer>,
    region: &Region,
) -> bool {
    if aquatic {
        return region.biome.is_aquatic_habitat();
    }
    if can_fly && region.layer == Layer::Surface {
        return true;
    }
    if region.layer == Layer::Underground {
        return size < 30.0;
    }
    habitat.contains(&region.layer)
}

/// Herbivore/filter_feeder/detritivore are never predators (food-web
/// soundness invariant enforced at the ecosystem layer, exposed here for
/// reuse by the action kernel's hunt refusal).
pub fn can_hunt(diet: Diet) -> bool {
    matches!(diet, Diet::Carnivore | Diet::Omnivore)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_are_bidirectional() {
        let mut registry = RegionRegistry::default();
        let a = registry.create_region(RegionSpec {
            name: "A".into(),
            layer: Layer::Surface,
            biome: Biome::Grassland,
            coordinates: Coordinates { latitude: 0.0, longitude: 0.0 },
            elevation: 0.1,
            resources: vec![],
        });
        let b = registry.create_region(RegionSpec {
            name: "B".into(),
            layer: Layer::Surface,
            biome: Biome::Grassland,
            coordinates: Coordinates { latitude: 0.0, longitude: 1.0 },
            elevation: 0.1,
            resources: vec![],
        });
        registry.connect(a, b).unwrap();
        assert!(registry.get(a).unwrap().connections.contains(&b));
        assert!(registry.get(b).unwrap().connections.contains(&a));
    }

    #[test]
    fn underground_requires_small_size() {
        let region = Region {
            id: RegionId(0),
            name: "Cave".into(),
            layer: Layer::Underground,
            biome: Biome::CaveSystem,
            coordinates: Coordinates { latitude: 0.0, longitude: 0.0 },
            elevation: 0.0,
            climate: ClimateState::default(),
            resources: vec![],
            connections: vec![],
            populations: HashMap::new(),
            hidden_locations: vec![],
        };
        let habitat = HashSet::from([Layer::Underground]);
        assert!(is_biome_suitable(false, false, 20.0, &habitat, &region));
        assert!(!is_biome_suitable(false, false, 40.0, &habitat, &region));
    }

    #[test]
    fn flying_surface_always_suitable() {
        let region = Region {
            id: RegionId(0),
            name: "Sky".into(),
            layer: Layer::Surface,
            biome: Biome::Desert,
            coordinates: Coordinates { latitude: 0.0, longitude: 0.0 },
            elevation: 0.0,
            climate: ClimateState::default(),
            resources: vec![],
            connections: vec![],
            populations: HashMap::new(),
            hidden_locations: vec![],
        };
        let habitat = HashSet::new();
        assert!(is_biome_suitable(false, true, 90.0, &habitat, &region));
    }
}
