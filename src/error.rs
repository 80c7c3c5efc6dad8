//! Crate-wide error taxonomy.
//!
//! Only contract violations and I/O-shaped failures surface as
//! `Result`s here. Gameplay refusals (not_alive, wrong_region, ...) and
//! detection/roll outcomes stay as plain data returned from the perception
//! and action kernel, never as an `EngineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("taxonomy parent not found: rank={rank} name={name}")]
    UnknownTaxonomyParent { rank: String, name: String },

    #[error("duplicate taxonomy node: rank={rank} name={name}")]
    DuplicateTaxonomyNode { rank: String, name: String },

    #[error("species not found: {0:?}")]
    UnknownSpecies(crate::simulation::ids::SpeciesId),

    #[error("region not found: {0:?}")]
    UnknownRegion(crate::simulation::ids::RegionId),

    #[error("duplicate id inserted into {registry}")]
    DuplicateId { registry: &'static str },

    #[error("snapshot write failed after retries: {0}")]
    SnapshotWrite(#[source] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    SnapshotSerialize(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
