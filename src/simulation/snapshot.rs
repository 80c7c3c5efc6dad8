//! Snapshot serializer: versioned world document, file I/O with
//! retry, and checkpoint naming.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::simulation::character::FamilyTree;
use crate::simulation::legacy::MemorialCard;
use crate::simulation::region::Region;
use crate::simulation::species::Species;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetadataDoc {
    pub name: String,
    pub tick: u64,
    pub era: String,
    pub started_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub regions: usize,
    pub species: usize,
    pub family_trees: usize,
    pub cards: usize,
}

/// `serialize` output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: u32,
    pub created_at: String,
    pub tick: u64,
    pub world: WorldMetadataDoc,
    pub species: Vec<Species>,
    pub cards: Vec<MemorialCard>,
    pub family_trees: Vec<FamilyTree>,
    pub regions: Vec<Region>,
    pub hall_of_fame: Vec<MemorialCard>,
    pub metadata: SnapshotCounts,
}

pub fn serialize(
    world_name: &str,
    tick: u64,
    era: &str,
    started_at: &str,
    regions: &[Region],
    species: &[Species],
    family_trees: &[FamilyTree],
    cards: &[MemorialCard],
) -> SnapshotDocument {
    let mut hall_of_fame: Vec<MemorialCard> = cards.to_vec();
    hall_of_fame.sort_by(|a, b| b.fame.partial_cmp(&a.fame).unwrap_or(std::cmp::Ordering::Equal));

    SnapshotDocument {
        version: SNAPSHOT_VERSION,
        created_at: chrono::Utc::now().to_rfc3339(),
        tick,
        world: WorldMetadataDoc {
            name: world_name.to_string(),
            tick,
            era: era.to_string(),
            started_at: started_at.to_string(),
        },
        species: species.to_vec(),
        cards: cards.to_vec(),
        family_trees: family_trees.to_vec(),
        regions: regions.to_vec(),
        metadata: SnapshotCounts {
            regions: regions.len(),
            species: species.len(),
            family_trees: family_trees.len(),
            cards: cards.len(),
        },
        hall_of_fame,
    }
}

pub fn load_snapshot(bytes: &[u8]) -> EngineResult<SnapshotDocument> {
    serde_json::from_slice(bytes).map_err(EngineError::SnapshotSerialize)
}

/// checkpoint filenames: `checkpoint-<tick>[-<label>]-<iso-timestamp>.json`.
pub fn checkpoint_filename(tick: u64, label: Option<&str>, timestamp: &str) -> String {
    match label {
        Some(label) => format!("checkpoint-{tick}-{label}-{timestamp}.json"),
        None => format!("checkpoint-{tick}-{timestamp}.json"),
    }
}

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Writes a checkpoint to `dir`, retrying transient I/O failures a few times
/// before giving up (hands snapshot writes off to a background worker;
/// this is that worker's write path).
pub async fn write_checkpoint(
    dir: &Path,
    document: &SnapshotDocument,
    label: Option<&str>,
    timestamp: &str,
) -> EngineResult<PathBuf> {
    let bytes = serde_json::to_vec_pretty(document).map_err(EngineError::SnapshotSerialize)?;
    let path = dir.join(checkpoint_filename(document.tick, label, timestamp));

    let mut attempt = 0;
    loop {
        attempt += 1;
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => return Ok(path),
            Err(err) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "checkpoint write failed, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
            }
            Err(err) => return Err(EngineError::SnapshotWrite(err)),
        }
    }
}
