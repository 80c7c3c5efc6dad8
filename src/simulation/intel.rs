//! Intelligence map: per-family observations of regions with
//! reliability decay, sharing, and misinformation blending.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::ids::{FamilyTreeId, RegionId, SpeciesId};
use crate::simulation::region::Region;

const RELIABILITY_DECAY_PER_TICK: f32 = 0.001;
const SHARE_RELIABILITY_FACTOR: f32 = 0.8;
const MISINFORMATION_OVERWRITE_THRESHOLD: f32 = 0.6;
const MISINFORMATION_BLEND_PENALTY: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntelSource {
    Exploration,
    Shared,
    Rumor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelRecord {
    pub last_updated_tick: u64,
    pub reliability: f32,
    pub source: IntelSource,
    pub known_resources: Vec<String>,
    pub known_species: Vec<SpeciesId>,
    pub known_threats: Vec<String>,
    pub known_pop_estimate: i64,
    pub is_misinformation: bool,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct IntelligenceMap {
    records: HashMap<(FamilyTreeId, RegionId), IntelRecord>,
}

impl IntelligenceMap {
    pub fn get_or_create(&mut self, family_tree_id: FamilyTreeId, region_id: RegionId) -> &mut IntelRecord {
        self.records
            .entry((family_tree_id, region_id))
            .or_insert_with(|| IntelRecord {
                last_updated_tick: 0,
                reliability: 0.0,
                source: IntelSource::Rumor,
                known_resources: Vec::new(),
                known_species: Vec::new(),
                known_threats: Vec::new(),
                known_pop_estimate: 0,
                is_misinformation: false,
            })
    }

    pub fn get(&self, family_tree_id: FamilyTreeId, region_id: RegionId) -> Option<&IntelRecord> {
        self.records.get(&(family_tree_id, region_id))
    }

    /// `recordExploration`: a first-hand scouting pass always produces
    /// a fully reliable record.
    pub fn record_exploration(
        &mut self,
        family_tree_id: FamilyTreeId,
        region_id: RegionId,
        region: &Region,
        tick: u64,
    ) {
        let known_pop_estimate: i64 = region.populations.values().map(|p| p.count).sum();
        let known_species: Vec<SpeciesId> = region.populations.keys().copied().collect();
        let known_resources: Vec<String> = region.resources.iter().map(|r| r.kind.clone()).collect();
        let record = self.get_or_create(family_tree_id, region_id);
        record.last_updated_tick = tick;
        record.reliability = 1.0;
        record.source = IntelSource::Exploration;
        record.known_resources = known_resources;
        record.known_species = known_species;
        record.known_threats = Vec::new();
        record.known_pop_estimate = known_pop_estimate;
        record.is_misinformation = false;
    }

    /// `shareIntel`: the target only adopts the source's record when it
    /// is more reliable (after the 0.8 sharing discount) than what it
    /// already has.
    pub fn share_intel(
        &mut self,
        from_family: FamilyTreeId,
        to_family: FamilyTreeId,
        region_id: RegionId,
        tick: u64,
    ) {
        let Some(source_record) = self.records.get(&(from_family, region_id)).cloned() else {
            return;
        };
        let shared_reliability = source_record.reliability * SHARE_RELIABILITY_FACTOR;
        let target_reliability = self
            .records
            .get(&(to_family, region_id))
            .map(|r| r.reliability)
            .unwrap_or(0.0);
        if shared_reliability <= target_reliability {
            return;
        }
        self.records.insert(
            (to_family, region_id),
            IntelRecord {
                last_updated_tick: tick,
                reliability: shared_reliability,
                source: IntelSource::Shared,
                known_resources: source_record.known_resources,
                known_species: source_record.known_species,
                known_threats: source_record.known_threats,
                known_pop_estimate: source_record.known_pop_estimate,
                is_misinformation: source_record.is_misinformation,
            },
        );
    }

    /// `plantMisinformation`: wholesale overwrite below the trust
    /// threshold, otherwise a blend that preserves real knowledge and only
    /// appends false threats.
    pub fn plant_misinformation(
        &mut self,
        family_tree_id: FamilyTreeId,
        region_id: RegionId,
        falsified_threats: Vec<String>,
        tick: u64,
    ) {
        let existing = self.records.get(&(family_tree_id, region_id)).cloned();
        match existing {
            None => {
                self.records.insert(
                    (family_tree_id, region_id),
                    IntelRecord {
                        last_updated_tick: tick,
                        reliability: 0.5,
                        source: IntelSource::Rumor,
                        known_resources: Vec::new(),
                        known_species: Vec::new(),
                        known_threats: falsified_threats,
                        known_pop_estimate: 0,
                        is_misinformation: true,
                    },
                );
            }
            Some(record) if record.reliability < MISINFORMATION_OVERWRITE_THRESHOLD => {
                self.records.insert(
                    (family_tree_id, region_id),
                    IntelRecord {
                        last_updated_tick: tick,
                        reliability: 0.5,
                        source: IntelSource::Rumor,
                        known_resources: Vec::new(),
                        known_species: Vec::new(),
                        known_threats: falsified_threats,
                        known_pop_estimate: 0,
                        is_misinformation: true,
                    },
                );
            }
            Some(mut record) => {
                record.reliability = (record.reliability - MISINFORMATION_BLEND_PENALTY).max(0.0);
                record.known_threats.extend(falsified_threats);
                record.last_updated_tick = tick;
                record.is_misinformation = true;
                self.records.insert((family_tree_id, region_id), record);
            }
        }
    }

    /// `decayIntelReliability`: age-proportional decay, records at or
    /// below zero reliability are dropped.
    pub fn decay_intel_reliability(&mut self, tick: u64) {
        self.records.retain(|_, record| {
            let ticks_since_update = tick.saturating_sub(record.last_updated_tick) as f32;
            record.reliability -= RELIABILITY_DECAY_PER_TICK * ticks_since_update;
            record.last_updated_tick = tick;
            record.reliability > 0.0
        });
    }

    pub fn decay_all(&mut self, tick: u64) {
        self.decay_intel_reliability(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region {
            id: RegionId(0),
            name: "Test".into(),
            layer: crate::simulation::taxonomy::Layer::Surface,
            biome: crate::simulation::region::Biome::Grassland,
            coordinates: crate::simulation::region::Coordinates { latitude: 0.0, longitude: 0.0 },
            elevation: 0.0,
            climate: crate::simulation::region::ClimateState::default(),
            resources: vec![],
            connections: vec![],
            populations: HashMap::new(),
            hidden_locations: vec![],
        }
    }

    #[test]
    fn share_intel_only_overwrites_when_more_reliable() {
        let mut map = IntelligenceMap::default();
        let family_a = FamilyTreeId(0);
        let family_b = FamilyTreeId(1);
        let r = RegionId(0);
        map.record_exploration(family_a, r, &region(), 0);
        map.get_or_create(family_b, r).reliability = 0.95;
        map.share_intel(family_a, family_b, r, 10);
        // shared reliability (1.0 * 0.8 = 0.8) is less than target's 0.95: no overwrite.
        assert_eq!(map.get(family_b, r).unwrap().reliability, 0.95);

        map.get_or_create(family_b, r).reliability = 0.5;
        map.share_intel(family_a, family_b, r, 10);
        assert!((map.get(family_b, r).unwrap().reliability - 0.8).abs() < 1e-6);
    }

    #[test]
    fn misinformation_blends_above_threshold_and_overwrites_below() {
        let mut map = IntelligenceMap::default();
        let family = FamilyTreeId(0);
        let r = RegionId(0);
        map.record_exploration(family, r, &region(), 0);
        map.plant_misinformation(family, r, vec!["fake threat".into()], 5);
        let record = map.get(family, r).unwrap();
        assert!(record.known_threats.contains(&"fake threat".to_string()));
        assert!(record.is_misinformation);
        assert!((record.reliability - 0.8).abs() < 1e-6);
    }

    #[test]
    fn decay_removes_exhausted_records() {
        let mut map = IntelligenceMap::default();
        let family = FamilyTreeId(0);
        let r = RegionId(0);
        map.get_or_create(family, r).reliability = 0.0005;
        map.decay_intel_reliability(2000);
        assert!(map.get(family, r).is_none());
    }
}
