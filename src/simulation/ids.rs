//! Typed opaque identifiers, one per entity kind.
//!
//! Each ID wraps a dense `u64` index into its owning arena or registry. IDs
//! are handed out monotonically and are never reused within a world, so an
//! ID is a stable reference even after the entity it names has died.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        $(#[$meta])*
        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

id_type!(SpeciesId);
id_type!(RegionId);
id_type!(CharacterId);
id_type!(FamilyTreeId);
id_type!(OwnerId);
// Reserved identifier: colonies are named in the entity-kind list but no
// colony registry exists yet to mint or hold these.
id_type!(#[allow(dead_code)] ColonyId);
id_type!(CardId);
id_type!(MissionId);
id_type!(PactId);

/// Monotonic ID allocator shared by a single arena/registry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn next_raw(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}
