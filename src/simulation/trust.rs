//! Trust ledger: directed per-family trust with cooperation,
//! betrayal, witness reputation spread, and decay.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::simulation::ids::FamilyTreeId;

const COOPERATION_DELTA: f32 = 0.02;
const BETRAYAL_DELTA: f32 = -0.3;
const WITNESS_REPUTATION_SET: f32 = -0.15;
const DECAY_FRACTION: f32 = 0.01;
const DECAY_DROP_THRESHOLD: f32 = 0.001;
const ACCURACY_WINDOW: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub trust: f32,
    pub betrayal_count: u32,
    pub cooperation_count: u32,
    pub intel_shared_count: u32,
    pub intel_accuracy_score: f32,
    pub last_update_tick: u64,
    accuracy_samples: Vec<bool>,
}

impl Default for TrustRecord {
    fn default() -> Self {
        Self {
            trust: 0.0,
            betrayal_count: 0,
            cooperation_count: 0,
            intel_shared_count: 0,
            intel_accuracy_score: 0.0,
            last_update_tick: 0,
            accuracy_samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub willing: bool,
    pub label: &'static str,
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct TrustLedger {
    records: HashMap<(FamilyTreeId, FamilyTreeId), TrustRecord>,
}

impl TrustLedger {
    /// `getTrust`: default 0 for an unknown directed pair.
    pub fn get_trust(&self, observer: FamilyTreeId, subject: FamilyTreeId) -> f32 {
        self.records.get(&(observer, subject)).map(|r| r.trust).unwrap_or(0.0)
    }

    fn entry(&mut self, observer: FamilyTreeId, subject: FamilyTreeId) -> &mut TrustRecord {
        self.records.entry((observer, subject)).or_default()
    }

    pub fn record_cooperation(&mut self, a: FamilyTreeId, b: FamilyTreeId, tick: u64) {
        for (observer, subject) in [(a, b), (b, a)] {
            let record = self.entry(observer, subject);
            record.trust = (record.trust + COOPERATION_DELTA).min(1.0);
            record.cooperation_count += 1;
            record.last_update_tick = tick;
        }
    }

    /// `recordBetrayal`: only the victim-to-perpetrator direction
    /// moves, and it moves sharply negative.
    pub fn record_betrayal(&mut self, victim: FamilyTreeId, perpetrator: FamilyTreeId, tick: u64) {
        let record = self.entry(victim, perpetrator);
        record.trust = (record.trust + BETRAYAL_DELTA).max(-1.0);
        record.betrayal_count += 1;
        record.last_update_tick = tick;
    }

    /// `spreadBetrayalReputation`: witnesses get a direct set, not an
    /// additive nudge.
    pub fn spread_betrayal_reputation(
        &mut self,
        perpetrator: FamilyTreeId,
        witness_families: &[FamilyTreeId],
        tick: u64,
    ) {
        for &witness in witness_families {
            if witness == perpetrator {
                continue;
            }
            let record = self.entry(witness, perpetrator);
            record.trust = WITNESS_REPUTATION_SET;
            record.last_update_tick = tick;
        }
    }

    /// `tickTrustDecay`: every directed trust relaxes toward zero;
    /// negligible records drop out entirely.
    pub fn tick_trust_decay(&mut self, tick: u64) {
        self.records.retain(|_, record| {
            record.trust -= record.trust * DECAY_FRACTION;
            record.last_update_tick = tick;
            record.trust.abs() > DECAY_DROP_THRESHOLD || record.betrayal_count > 0 || record.cooperation_count > 0
        });
    }

    /// `recordIntelAccuracy`: rolling mean over at most 20 samples.
    pub fn record_intel_accuracy(&mut self, observer: FamilyTreeId, subject: FamilyTreeId, was_accurate: bool) {
        let record = self.entry(observer, subject);
        record.accuracy_samples.push(was_accurate);
        if record.accuracy_samples.len() > ACCURACY_WINDOW {
            record.accuracy_samples.remove(0);
        }
        let accurate_count = record.accuracy_samples.iter().filter(|&&v| v).count();
        record.intel_accuracy_score = accurate_count as f32 / record.accuracy_samples.len() as f32;
        record.intel_shared_count += 1;
    }

    /// `evaluateIntelSharingWillingness`.
    pub fn evaluate_intel_sharing_willingness(
        &self,
        source: FamilyTreeId,
        target: FamilyTreeId,
        utility: f32,
    ) -> RiskAssessment {
        let record = self.records.get(&(source, target));
        if let Some(record) = record {
            if record.betrayal_count > 0 {
                return RiskAssessment { willing: false, label: "known betrayer" };
            }
            if record.trust > 0.3 {
                return RiskAssessment { willing: true, label: "trusted ally" };
            }
        } else if utility < 0.7 {
            return RiskAssessment { willing: false, label: "unknown target" };
        }
        RiskAssessment { willing: utility >= 0.7, label: "insufficient rapport" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn betrayal_only_moves_victim_to_perpetrator_direction() {
        let mut ledger = TrustLedger::default();
        let a = FamilyTreeId(0);
        let b = FamilyTreeId(1);
        ledger.record_betrayal(a, b, 10);
        assert!(ledger.get_trust(a, b) < 0.0);
        assert_eq!(ledger.get_trust(b, a), 0.0);
    }

    #[test]
    fn witnesses_get_direct_set_not_additive() {
        let mut ledger = TrustLedger::default();
        let perpetrator = FamilyTreeId(0);
        let witness = FamilyTreeId(1);
        ledger.entry(witness, perpetrator).trust = 0.9;
        ledger.spread_betrayal_reputation(perpetrator, &[witness], 5);
        assert_eq!(ledger.get_trust(witness, perpetrator), WITNESS_REPUTATION_SET);
    }

    #[test]
    fn willingness_refuses_betrayers_outright() {
        let mut ledger = TrustLedger::default();
        let source = FamilyTreeId(0);
        let target = FamilyTreeId(1);
        ledger.record_betrayal(source, target, 0);
        let assessment = ledger.evaluate_intel_sharing_willingness(source, target, 0.95);
        assert!(!assessment.willing);
    }
}
