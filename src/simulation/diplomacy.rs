//! Diplomacy & pacts: proposal evaluation and the pact
//! registry.

use bevy_ecs::prelude::Resource;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::simulation::arena::Arena;
use crate::simulation::ids::{CharacterId, IdCounter, PactId};
use crate::simulation::trust::TrustLedger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pact {
    pub id: PactId,
    pub proposer: CharacterId,
    pub target: CharacterId,
    pub offer: String,
    pub demand: String,
    pub accepted_at_tick: u64,
    pub expires_at_tick: Option<u64>,
    pub broken: bool,
    pub broken_by: Option<CharacterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalOutcome {
    pub accepted: bool,
    pub narrative: String,
    pub pact: Option<Pact>,
}

const BASE_ACCEPTANCE: f32 = 0.5;
const ENEMY_PENALTY: f32 = 0.4;
const TRUST_BONUS: f32 = 0.3;
const CROSS_SPECIES_PENALTY: f32 = 0.2;

/// `evaluateProposal`. Probability is a base rate adjusted by enemy
/// relationship, prior trust, and a cross-species penalty, then rolled.
pub fn evaluate_proposal(
    proposer_family: crate::simulation::ids::FamilyTreeId,
    target_family: crate::simulation::ids::FamilyTreeId,
    proposer: CharacterId,
    target: CharacterId,
    proposer_species: crate::simulation::ids::SpeciesId,
    target_species: crate::simulation::ids::SpeciesId,
    offer: impl Into<String>,
    demand: impl Into<String>,
    trust: &TrustLedger,
    enemy_relationship_strength: f32,
    tick: u64,
    rng: &mut impl Rng,
) -> ProposalOutcome {
    let prior_trust = trust.get_trust(proposer_family, target_family);
    let mut probability = BASE_ACCEPTANCE - enemy_relationship_strength * ENEMY_PENALTY + prior_trust * TRUST_BONUS;
    if proposer_species != target_species {
        probability -= CROSS_SPECIES_PENALTY;
    }
    let probability = probability.clamp(0.02, 0.95);
    let offer = offer.into();
    let demand = demand.into();

    if rng.gen_bool(probability as f64) {
        ProposalOutcome {
            accepted: true,
            narrative: "proposal accepted".to_string(),
            pact: Some(Pact {
                id: PactId(0),
                proposer,
                target,
                offer,
                demand,
                accepted_at_tick: tick,
                expires_at_tick: None,
                broken: false,
                broken_by: None,
            }),
        }
    } else {
        ProposalOutcome {
            accepted: false,
            narrative: "proposal rejected".to_string(),
            pact: None,
        }
    }
}

#[derive(Debug, Default, Resource, Serialize, Deserialize)]
pub struct PactRegistry {
    pacts: Arena<Pact>,
    counter: IdCounter,
}

impl PactRegistry {
    pub fn add(&mut self, mut pact: Pact) -> PactId {
        let id = PactId(self.counter.next_raw());
        pact.id = id;
        self.pacts.push(pact);
        id
    }

    pub fn get(&self, id: PactId) -> Option<&Pact> {
        self.pacts.get(id.index())
    }

    pub fn get_for_character(&self, character_id: CharacterId) -> Vec<&Pact> {
        self.pacts
            .iter()
            .filter(|p| !p.broken && (p.proposer == character_id || p.target == character_id))
            .collect()
    }

    /// Natural expiration, distinct from `break_pact`: a pact past its
    /// `expires_at_tick` lapses quietly, with no betrayal recorded.
    pub fn expire_pacts(&mut self, tick: u64) {
        for pact in self.pacts.iter_mut() {
            if pact.broken {
                continue;
            }
            if let Some(expires_at) = pact.expires_at_tick {
                if tick >= expires_at {
                    pact.broken = true;
                }
            }
        }
    }

    /// `breakPact`: marks the pact broken and records betrayal plus
    /// witness reputation spread.
    pub fn break_pact(
        &mut self,
        id: PactId,
        breaker_family: crate::simulation::ids::FamilyTreeId,
        victim_family: crate::simulation::ids::FamilyTreeId,
        witness_families: &[crate::simulation::ids::FamilyTreeId],
        breaker: CharacterId,
        trust: &mut TrustLedger,
        tick: u64,
    ) {
        if let Some(pact) = self.pacts.get_mut(id.index()) {
            pact.broken = true;
            pact.broken_by = Some(breaker);
        } else {
            return;
        }
        trust.record_betrayal(victim_family, breaker_family, tick);
        trust.spread_betrayal_reputation(breaker_family, witness_families, tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ids::{FamilyTreeId, SpeciesId};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn cross_species_pacts_are_harder_to_land() {
        let trust = TrustLedger::default();
        let mut accepted_same = 0;
        let mut accepted_cross = 0;
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let outcome = evaluate_proposal(
                FamilyTreeId(0),
                FamilyTreeId(1),
                CharacterId(0),
                CharacterId(1),
                SpeciesId(0),
                SpeciesId(0),
                "peace",
                "territory",
                &trust,
                0.0,
                0,
                &mut rng,
            );
            if outcome.accepted {
                accepted_same += 1;
            }
            let mut rng = SmallRng::seed_from_u64(seed);
            let outcome = evaluate_proposal(
                FamilyTreeId(0),
                FamilyTreeId(1),
                CharacterId(0),
                CharacterId(1),
                SpeciesId(0),
                SpeciesId(1),
                "peace",
                "territory",
                &trust,
                0.0,
                0,
                &mut rng,
            );
            if outcome.accepted {
                accepted_cross += 1;
            }
        }
        assert!(accepted_cross <= accepted_same);
    }

    #[test]
    fn breaking_pact_records_betrayal_and_witness_reputation() {
        let mut registry = PactRegistry::default();
        let mut trust = TrustLedger::default();
        let id = registry.add(Pact {
            id: PactId(0),
            proposer: CharacterId(0),
            target: CharacterId(1),
            offer: "o".into(),
            demand: "d".into(),
            accepted_at_tick: 0,
            expires_at_tick: None,
            broken: false,
            broken_by: None,
        });
        registry.break_pact(
            id,
            FamilyTreeId(0),
            FamilyTreeId(1),
            &[FamilyTreeId(2)],
            CharacterId(0),
            &mut trust,
            10,
        );
        assert!(registry.get(id).unwrap().broken);
        assert!(trust.get_trust(FamilyTreeId(1), FamilyTreeId(0)) < 0.0);
        assert!(trust.get_trust(FamilyTreeId(2), FamilyTreeId(0)) < 0.0);
    }
}
