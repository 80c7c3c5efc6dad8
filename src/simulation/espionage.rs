//! Espionage missions: pack scheduling, probabilistic
//! detection, cooldowns.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::simulation::arena::Arena;
use crate::simulation::character::CharacterRegistry;
use crate::simulation::ids::{CharacterId, FamilyTreeId, IdCounter, MissionId, RegionId};
use crate::simulation::intel::IntelligenceMap;

const COOLDOWN_TICKS: u64 = 30;
const PRUNE_AGE_TICKS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    Spy,
    Infiltrate,
    SpreadRumors,
}

impl MissionType {
    fn base_duration(self) -> f32 {
        match self {
            MissionType::Spy => 5.0,
            MissionType::Infiltrate => 15.0,
            MissionType::SpreadRumors => 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub mission_type: MissionType,
    pub agent_character_id: CharacterId,
    pub support_character_ids: Vec<CharacterId>,
    pub target_region_id: RegionId,
    pub target_family_id: Option<FamilyTreeId>,
    pub agent_family_id: FamilyTreeId,
    pub start_tick: u64,
    pub duration_ticks: u64,
    pub detected: bool,
    pub completed: bool,
    pub casualty_character_ids: Vec<CharacterId>,
    pub resolved_at_tick: Option<u64>,
}

pub struct StartMissionParams {
    pub mission_type: MissionType,
    pub agent_character_id: CharacterId,
    pub support_character_ids: Vec<CharacterId>,
    pub target_region_id: RegionId,
    pub target_family_id: Option<FamilyTreeId>,
    pub agent_family_id: FamilyTreeId,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentificationLevel {
    SizeClass,
    TaxonomyClass,
    Species,
    Family,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct MissionRegistry {
    missions: Arena<Mission>,
    counter: IdCounter,
    on_mission: HashMap<CharacterId, MissionId>,
    cooldown_until: HashMap<CharacterId, u64>,
}

impl MissionRegistry {
    /// `startMission`. Fails (returns `Err`) when the agent or any
    /// support character is already on a mission or still cooling down.
    pub fn start_mission(
        &mut self,
        params: StartMissionParams,
        agent_speed: f32,
    ) -> Result<MissionId, &'static str> {
        let mut participants = vec![params.agent_character_id];
        participants.extend(&params.support_character_ids);
        for &participant in &participants {
            if self.on_mission.contains_key(&participant) {
                return Err("already on a mission");
            }
            if let Some(&cooldown_end) = self.cooldown_until.get(&participant) {
                if params.tick < cooldown_end {
                    return Err("on cooldown");
                }
            }
        }

        let duration_ticks =
            (params.mission_type.base_duration() * (50.0 / agent_speed.max(10.0))).round() as u64;
        let id = MissionId(self.counter.next_raw());
        let mission = Mission {
            id,
            mission_type: params.mission_type,
            agent_character_id: params.agent_character_id,
            support_character_ids: params.support_character_ids,
            target_region_id: params.target_region_id,
            target_family_id: params.target_family_id,
            agent_family_id: params.agent_family_id,
            start_tick: params.tick,
            duration_ticks,
            detected: false,
            completed: false,
            casualty_character_ids: Vec::new(),
            resolved_at_tick: None,
        };
        for &participant in &participants {
            self.on_mission.insert(participant, id);
        }
        self.missions.push(mission);
        Ok(id)
    }

    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.iter()
    }

    /// `attemptDetection`: rolls the detection chance for one active,
    /// not-yet-detected mission against every sentinel present in its
    /// target region. `agent_intelligence` is the spy's own, since a
    /// sharper agent is harder to spot regardless of who's watching.
    /// Returns `true` when this roll detects the mission.
    pub fn attempt_detection(
        &mut self,
        mission_id: MissionId,
        agent_size: f32,
        agent_intelligence: f32,
        sentinel_sizes: &[f32],
        rng: &mut impl Rng,
    ) -> bool {
        let Some(mission) = self.missions.get_mut(mission_id.index()) else { return false };
        if mission.completed || mission.detected || sentinel_sizes.is_empty() {
            return false;
        }
        let chance = calculate_detection_chance(agent_size, sentinel_sizes, agent_intelligence);
        if rng.gen_bool(chance as f64) {
            mission.detected = true;
            true
        } else {
            false
        }
    }

    /// `tickMissions`: resolves every mission whose duration has
    /// elapsed, applying resolution effects and pack casualty absorption.
    pub fn tick_missions(
        &mut self,
        tick: u64,
        characters: &mut CharacterRegistry,
        intel: &mut IntelligenceMap,
        heartlands: &mut HeartlandTracker,
        rng: &mut impl Rng,
    ) {
        let ready: Vec<MissionId> = self
            .missions
            .iter()
            .filter(|m| !m.completed && tick >= m.start_tick + m.duration_ticks)
            .map(|m| m.id)
            .collect();

        for id in ready {
            let Some(mission) = self.missions.get_mut(id.index()) else { continue };
            mission.completed = true;
            mission.resolved_at_tick = Some(tick);

            if !mission.support_character_ids.is_empty() && rng.gen_bool(0.3) {
                if let Some(&casualty) = mission.support_character_ids.first() {
                    mission.casualty_character_ids.push(casualty);
                    if let Some(character) = characters.get_mut(casualty) {
                        character.is_alive = false;
                    }
                }
            } else if rng.gen_bool(0.1) {
                mission.casualty_character_ids.push(mission.agent_character_id);
                if let Some(character) = characters.get_mut(mission.agent_character_id) {
                    character.is_alive = false;
                }
            }

            if !mission.detected {
                match mission.mission_type {
                    MissionType::Spy => {
                        // Resolution effect applied by the caller, which owns
                        // the target `Region` reference; see `resolve_spy`.
                    }
                    MissionType::Infiltrate => {
                        if let Some(target_family) = mission.target_family_id {
                            heartlands.mark_known(mission.agent_family_id, target_family);
                        }
                    }
                    MissionType::SpreadRumors => {
                        if let Some(target_family) = mission.target_family_id {
                            intel.plant_misinformation(
                                target_family,
                                mission.target_region_id,
                                vec!["false threat reported by rumor".to_string()],
                                tick,
                            );
                        }
                    }
                }
            }

            let mut participants = vec![mission.agent_character_id];
            participants.extend(mission.support_character_ids.iter().copied());
            for participant in participants {
                self.on_mission.remove(&participant);
                self.cooldown_until.insert(participant, tick + COOLDOWN_TICKS);
            }
        }
    }

    /// Applies the `spy` resolution effect; requires the region by value
    /// since `intel.record_exploration` only reads it.
    pub fn resolve_spy(
        &self,
        mission_id: MissionId,
        intel: &mut IntelligenceMap,
        region: &crate::simulation::region::Region,
        tick: u64,
    ) {
        let Some(mission) = self.get(mission_id) else { return };
        if mission.mission_type != MissionType::Spy || mission.detected || !mission.completed {
            return;
        }
        intel.record_exploration(mission.agent_family_id, mission.target_region_id, region, tick);
        let _ = tick;
    }

    /// pruning: missions resolved more than 500 ticks ago are dropped.
    pub fn prune(&mut self, tick: u64) {
        self.missions.retain(|mission| {
            mission
                .resolved_at_tick
                .map(|resolved| tick.saturating_sub(resolved) <= PRUNE_AGE_TICKS)
                .unwrap_or(true)
        });
    }
}

/// `calculateDetectionChance`. Sentinel contributions diminish
/// logarithmically so a crowd of sentinels never trivially guarantees
/// detection.
pub fn calculate_detection_chance(spy_size: f32, sentinel_sizes: &[f32], spy_intelligence: f32) -> f32 {
    let base = (0.05 * (spy_size / 40.0)).max(0.01);
    let intelligence_discount = (spy_intelligence / 1000.0).min(0.03);
    let mut total = (base - intelligence_discount).max(0.0);
    for (index, &sentinel_size) in sentinel_sizes.iter().enumerate() {
        let contribution = 0.1 * (sentinel_size / spy_size.max(1.0));
        let diminishing = 1.0 / (1.0 + index as f32);
        total += contribution * diminishing;
    }
    total.clamp(0.01, 0.8)
}

/// `generateDetectionReport`: identification level is monotonic in
/// the detector's observation skill (approximated here by intelligence).
pub fn generate_detection_report(detector_intelligence: f32) -> (IdentificationLevel, String) {
    let level = if detector_intelligence >= 80.0 {
        IdentificationLevel::Family
    } else if detector_intelligence >= 60.0 {
        IdentificationLevel::Species
    } else if detector_intelligence >= 35.0 {
        IdentificationLevel::TaxonomyClass
    } else {
        IdentificationLevel::SizeClass
    };
    let description = match level {
        IdentificationLevel::SizeClass => "a creature of roughly matching size".to_string(),
        IdentificationLevel::TaxonomyClass => "a creature of a recognizable class".to_string(),
        IdentificationLevel::Species => "an individual of a known species".to_string(),
        IdentificationLevel::Family => "a specific, identifiable intruder".to_string(),
    };
    (level, description)
}

/// Infiltrate resolution side-registry (): tracks which family has
/// learned which other family's heartland region.
#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct HeartlandTracker {
    known: HashMap<FamilyTreeId, Vec<FamilyTreeId>>,
}

impl HeartlandTracker {
    pub fn mark_known(&mut self, observer_family: FamilyTreeId, target_family: FamilyTreeId) {
        let entry = self.known.entry(observer_family).or_default();
        if !entry.contains(&target_family) {
            entry.push(target_family);
        }
    }

    pub fn knows(&self, observer_family: FamilyTreeId, target_family: FamilyTreeId) -> bool {
        self.known
            .get(&observer_family)
            .map(|families| families.contains(&target_family))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_contributions_diminish_across_sentinels() {
        let one = calculate_detection_chance(40.0, &[40.0], 10.0);
        let two = calculate_detection_chance(40.0, &[40.0, 40.0], 10.0);
        let three = calculate_detection_chance(40.0, &[40.0, 40.0, 40.0], 10.0);
        assert!(two > one);
        assert!((three - two) < (two - one));
    }

    #[test]
    fn cannot_start_mission_while_already_on_one() {
        let mut registry = MissionRegistry::default();
        let agent = CharacterId(0);
        registry
            .start_mission(
                StartMissionParams {
                    mission_type: MissionType::Spy,
                    agent_character_id: agent,
                    support_character_ids: vec![],
                    target_region_id: RegionId(0),
                    target_family_id: None,
                    agent_family_id: FamilyTreeId(0),
                    tick: 0,
                },
                50.0,
            )
            .unwrap();
        let second = registry.start_mission(
            StartMissionParams {
                mission_type: MissionType::Spy,
                agent_character_id: agent,
                support_character_ids: vec![],
                target_region_id: RegionId(1),
                target_family_id: None,
                agent_family_id: FamilyTreeId(0),
                tick: 1,
            },
            50.0,
        );
        assert_eq!(second, Err("already on a mission"));
    }
}
