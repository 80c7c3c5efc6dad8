//! Seed data layer: content-only population of the
//! taxonomy engine and species registry from static descriptors. No
//! narrative flavor text lives here, only the trait data the rest of the
//! engine needs to run.

use std::collections::HashSet;

use crate::simulation::region::{Biome, Coordinates, RegionRegistry, RegionSpec, ResourceStock};
use crate::simulation::species::{NamedTaxonomyPath, SpeciesDescriptor, SpeciesRegistry, Tier};
use crate::simulation::taxonomy::{
    Diet, Layer, PerceptionOverride, Rank, TaxonomyEngine, TraitOverrides,
};

struct SeedSpecies {
    name: &'static str,
    class: &'static str,
    order: &'static str,
    family: &'static str,
    genus: &'static str,
    tier: Tier,
    overrides: TraitOverrides,
}

fn overrides(
    size: f32,
    speed: f32,
    strength: f32,
    diet: Diet,
    habitat: &[Layer],
    aquatic: bool,
    can_fly: bool,
) -> TraitOverrides {
    TraitOverrides {
        size: Some(size),
        speed: Some(speed),
        strength: Some(strength),
        diet: Some(diet),
        habitat: Some(habitat.iter().copied().collect::<HashSet<_>>()),
        aquatic: Some(aquatic),
        can_fly: Some(can_fly),
        ..Default::default()
    }
}

/// Registers the taxonomy classes, orders, families, genera, and species
/// this crate ships with, then resolves and registers each species.
pub fn seed_taxonomy_and_species(taxonomy: &mut TaxonomyEngine, species: &mut SpeciesRegistry) {
    seed_taxonomy_ranks(taxonomy);

    let seeds = [
        SeedSpecies {
            name: "sapiens",
            class: "Mammalia",
            order: "Primates",
            family: "Hominidae",
            genus: "Homo",
            tier: Tier::Flagship,
            overrides: TraitOverrides {
                intelligence: Some(85.0),
                lifespan_ticks: Some(29200),
                maturity_ticks: Some(4745),
                gestation_ticks: Some(274),
                reproduction_rate: Some(1.0),
                social_structure: Some("tribal".to_string()),
                ..overrides(55.0, 30.0, 35.0, Diet::Omnivore, &[Layer::Surface], false, false)
            },
        },
        SeedSpecies {
            name: "lupus",
            class: "Mammalia",
            order: "Carnivora",
            family: "Canidae",
            genus: "Canis",
            tier: Tier::Flagship,
            overrides: TraitOverrides {
                social_structure: Some("pack".to_string()),
                reproduction_rate: Some(5.0),
                ..overrides(60.0, 65.0, 55.0, Diet::Carnivore, &[Layer::Surface], false, false)
            },
        },
        SeedSpecies {
            name: "leo",
            class: "Mammalia",
            order: "Carnivora",
            family: "Felidae",
            genus: "Panthera",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("pride".to_string()),
                reproduction_rate: Some(3.0),
                ..overrides(75.0, 70.0, 80.0, Diet::Carnivore, &[Layer::Surface], false, false)
            },
        },
        SeedSpecies {
            name: "elaphus",
            class: "Mammalia",
            order: "Artiodactyla",
            family: "Cervidae",
            genus: "Cervus",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("herd".to_string()),
                reproduction_rate: Some(1.0),
                ..overrides(60.0, 60.0, 35.0, Diet::Herbivore, &[Layer::Surface], false, false)
            },
        },
        SeedSpecies {
            name: "carcharias",
            class: "Chondrichthyes",
            order: "Lamniformes",
            family: "Lamnidae",
            genus: "Carcharodon",
            tier: Tier::Flagship,
            overrides: TraitOverrides {
                social_structure: Some("solitary".to_string()),
                reproduction_rate: Some(0.3),
                ..overrides(70.0, 55.0, 60.0, Diet::Carnivore, &[Layer::Underwater], true, false)
            },
        },
        SeedSpecies {
            name: "salar",
            class: "Actinopterygii",
            order: "Salmoniformes",
            family: "Salmonidae",
            genus: "Salmo",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("school".to_string()),
                reproduction_rate: Some(400.0),
                ..overrides(25.0, 40.0, 15.0, Diet::Omnivore, &[Layer::Underwater], true, false)
            },
        },
        SeedSpecies {
            name: "aquila",
            class: "Aves",
            order: "Accipitriformes",
            family: "Accipitridae",
            genus: "Aquila",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("solitary".to_string()),
                reproduction_rate: Some(2.0),
                perception: PerceptionOverride {
                    visual_range: Some(80.0),
                    ..Default::default()
                },
                ..overrides(20.0, 85.0, 20.0, Diet::Carnivore, &[Layer::Surface], false, true)
            },
        },
        SeedSpecies {
            name: "jubatus",
            class: "Mammalia",
            order: "Carnivora",
            family: "Felidae",
            genus: "Acinonyx",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("solitary".to_string()),
                reproduction_rate: Some(3.0),
                ..overrides(55.0, 100.0, 50.0, Diet::Carnivore, &[Layer::Surface], false, false)
            },
        },
        SeedSpecies {
            name: "typus",
            class: "Chondrichthyes",
            order: "Orectolobiformes",
            family: "Rhincodontidae",
            genus: "Rhincodon",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("solitary".to_string()),
                reproduction_rate: Some(0.2),
                ..overrides(95.0, 20.0, 40.0, Diet::FilterFeeder, &[Layer::Underwater], true, false)
            },
        },
        SeedSpecies {
            name: "troglodytes",
            class: "Arachnida",
            order: "Araneae",
            family: "Nemesiidae",
            genus: "Troglodytes",
            tier: Tier::Notable,
            overrides: TraitOverrides {
                social_structure: Some("solitary".to_string()),
                reproduction_rate: Some(50.0),
                perception: PerceptionOverride {
                    thermal_sensing: Some(true),
                    ..Default::default()
                },
                ..overrides(8.0, 30.0, 10.0, Diet::Carnivore, &[Layer::Underground], false, false)
            },
        },
    ];

    for seed in seeds {
        let path = NamedTaxonomyPath {
            class: seed.class.to_string(),
            order: seed.order.to_string(),
            family: seed.family.to_string(),
            genus: seed.genus.to_string(),
            species: seed.name.to_string(),
        };
        taxonomy
            .register(
                Rank::Species,
                seed.name,
                Some((Rank::Genus, seed.genus)),
                seed.overrides,
            )
            .expect("seed species registers cleanly");
        let resolved = taxonomy
            .resolve_traits(&(&path).into())
            .expect("seed species path resolves");
        species.register(SpeciesDescriptor {
            name: seed.name.to_string(),
            path,
            traits: resolved,
            tier: seed.tier,
        });
    }
}

struct SeedRegion {
    name: &'static str,
    layer: Layer,
    biome: Biome,
    coordinates: (f32, f32),
    elevation: f32,
    resources: &'static [(&'static str, f32, f32, f32)],
}

/// Populates the region registry with one region per biome (), grouped
/// by layer and ring-connected within each layer, with a handful of named
/// cross-layer links standing in for caves, vents, and river mouths.
pub fn seed_regions(regions: &mut RegionRegistry) {
    let seeds = [
        SeedRegion {
            name: "Amazon Basin",
            layer: Layer::Surface,
            biome: Biome::TropicalRainforest,
            coordinates: (-3.0, -60.0),
            elevation: 0.1,
            resources: &[("fruit", 800.0, 1000.0, 12.0), ("fresh_water", 900.0, 1000.0, 15.0)],
        },
        SeedRegion {
            name: "Appalachian Woods",
            layer: Layer::Surface,
            biome: Biome::TemperateForest,
            coordinates: (38.0, -80.0),
            elevation: 0.4,
            resources: &[("browse", 600.0, 800.0, 8.0), ("fresh_water", 700.0, 900.0, 10.0)],
        },
        SeedRegion {
            name: "Taiga Expanse",
            layer: Layer::Surface,
            biome: Biome::BorealForest,
            coordinates: (60.0, 90.0),
            elevation: 0.3,
            resources: &[("browse", 400.0, 600.0, 5.0), ("fresh_water", 500.0, 700.0, 6.0)],
        },
        SeedRegion {
            name: "Serengeti Plain",
            layer: Layer::Surface,
            biome: Biome::Savanna,
            coordinates: (-2.0, 35.0),
            elevation: 0.2,
            resources: &[("grass", 900.0, 1200.0, 14.0), ("fresh_water", 400.0, 600.0, 5.0)],
        },
        SeedRegion {
            name: "Great Steppe",
            layer: Layer::Surface,
            biome: Biome::Grassland,
            coordinates: (48.0, 65.0),
            elevation: 0.3,
            resources: &[("grass", 700.0, 1000.0, 11.0), ("fresh_water", 300.0, 500.0, 4.0)],
        },
        SeedRegion {
            name: "Sahara Flats",
            layer: Layer::Surface,
            biome: Biome::Desert,
            coordinates: (23.0, 13.0),
            elevation: 0.35,
            resources: &[("fresh_water", 100.0, 300.0, 1.0)],
        },
        SeedRegion {
            name: "Arctic Tundra",
            layer: Layer::Surface,
            biome: Biome::Tundra,
            coordinates: (70.0, -45.0),
            elevation: 0.2,
            resources: &[("browse", 150.0, 300.0, 2.0), ("fresh_water", 400.0, 600.0, 4.0)],
        },
        SeedRegion {
            name: "Rocky Highlands",
            layer: Layer::Surface,
            biome: Biome::Mountain,
            coordinates: (39.0, -106.0),
            elevation: 0.85,
            resources: &[("browse", 200.0, 400.0, 3.0), ("fresh_water", 500.0, 700.0, 6.0)],
        },
        SeedRegion {
            name: "Pantanal Wetland",
            layer: Layer::Surface,
            biome: Biome::Wetland,
            coordinates: (-16.0, -57.0),
            elevation: 0.05,
            resources: &[("fish", 600.0, 900.0, 9.0), ("fresh_water", 900.0, 1100.0, 14.0)],
        },
        SeedRegion {
            name: "Coral Shoals",
            layer: Layer::Surface,
            biome: Biome::Coastal,
            coordinates: (25.0, -80.0),
            elevation: 0.02,
            resources: &[("fish", 700.0, 900.0, 10.0), ("fresh_water", 200.0, 400.0, 3.0)],
        },
        SeedRegion {
            name: "Tropical Reef",
            layer: Layer::Underwater,
            biome: Biome::CoralReef,
            coordinates: (-18.0, 147.0),
            elevation: -0.1,
            resources: &[("fish", 900.0, 1200.0, 15.0), ("plankton", 800.0, 1000.0, 13.0)],
        },
        SeedRegion {
            name: "Pelagic Expanse",
            layer: Layer::Underwater,
            biome: Biome::OpenOcean,
            coordinates: (0.0, -140.0),
            elevation: -0.5,
            resources: &[("fish", 1000.0, 1400.0, 16.0), ("plankton", 1000.0, 1300.0, 16.0)],
        },
        SeedRegion {
            name: "Midnight Trench",
            layer: Layer::Underwater,
            biome: Biome::DeepOcean,
            coordinates: (11.0, 142.0),
            elevation: -8.0,
            resources: &[("detritus", 300.0, 500.0, 3.0)],
        },
        SeedRegion {
            name: "Abyssal Vent Field",
            layer: Layer::Underwater,
            biome: Biome::HydrothermalVent,
            coordinates: (9.0, -104.0),
            elevation: -2.5,
            resources: &[("chemosynthetic_mat", 200.0, 350.0, 2.0)],
        },
        SeedRegion {
            name: "Kelp Canopy",
            layer: Layer::Underwater,
            biome: Biome::KelpForest,
            coordinates: (36.0, -122.0),
            elevation: -0.2,
            resources: &[("kelp", 700.0, 900.0, 10.0), ("fish", 500.0, 700.0, 7.0)],
        },
        SeedRegion {
            name: "Limestone Caverns",
            layer: Layer::Underground,
            biome: Biome::CaveSystem,
            coordinates: (44.0, 18.0),
            elevation: -0.3,
            resources: &[("detritus", 200.0, 350.0, 2.0), ("fresh_water", 300.0, 450.0, 3.0)],
        },
        SeedRegion {
            name: "Hidden Aquifer",
            layer: Layer::Underground,
            biome: Biome::UndergroundRiver,
            coordinates: (44.5, 18.5),
            elevation: -0.4,
            resources: &[("fresh_water", 600.0, 800.0, 8.0), ("fish", 150.0, 250.0, 2.0)],
        },
        SeedRegion {
            name: "Deep Grotto Biome",
            layer: Layer::Underground,
            biome: Biome::SubterraneanEcosystem,
            coordinates: (45.0, 19.0),
            elevation: -0.5,
            resources: &[("detritus", 250.0, 400.0, 2.5)],
        },
    ];

    let mut ids = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        let resources = seed
            .resources
            .iter()
            .map(|&(kind, quantity, max_quantity, renew_rate)| {
                ResourceStock::new(kind, quantity, max_quantity, renew_rate)
            })
            .collect();
        let id = regions.create_region(RegionSpec {
            name: seed.name.to_string(),
            layer: seed.layer,
            biome: seed.biome,
            coordinates: Coordinates { latitude: seed.coordinates.0, longitude: seed.coordinates.1 },
            elevation: seed.elevation,
            resources,
        });
        ids.push((id, seed.layer));
    }

    for layer in [Layer::Surface, Layer::Underwater, Layer::Underground] {
        let ring: Vec<_> = ids.iter().filter(|(_, l)| *l == layer).map(|(id, _)| *id).collect();
        for window in ring.windows(2) {
            regions.connect(window[0], window[1]).expect("seeded regions exist");
        }
        if ring.len() > 2 {
            regions
                .connect(*ring.first().unwrap(), *ring.last().unwrap())
                .expect("seeded regions exist");
        }
    }

    let cross_layer_links = [
        ("Coral Shoals", "Pelagic Expanse"),
        ("Coral Shoals", "Kelp Canopy"),
        ("Rocky Highlands", "Limestone Caverns"),
        ("Pantanal Wetland", "Hidden Aquifer"),
        ("Hidden Aquifer", "Deep Grotto Biome"),
    ];
    for (a_name, b_name) in cross_layer_links {
        let a = ids
            .iter()
            .zip(seeds.iter())
            .find(|(_, seed)| seed.name == a_name)
            .map(|((id, _), _)| *id);
        let b = ids
            .iter()
            .zip(seeds.iter())
            .find(|(_, seed)| seed.name == b_name)
            .map(|((id, _), _)| *id);
        if let (Some(a), Some(b)) = (a, b) {
            regions.connect(a, b).expect("seeded regions exist");
        }
    }
}

fn seed_taxonomy_ranks(taxonomy: &mut TaxonomyEngine) {
    let classes = [
        ("Mammalia", 40.0, 50.0, 15.0),
        ("Aves", 20.0, 60.0, 10.0),
        ("Actinopterygii", 15.0, 45.0, 5.0),
        ("Chondrichthyes", 25.0, 50.0, 8.0),
        ("Arachnida", 5.0, 35.0, 2.0),
    ];
    for (name, intelligence, speed, strength) in classes {
        taxonomy
            .register(
                Rank::Class,
                name,
                None,
                TraitOverrides {
                    intelligence: Some(intelligence),
                    speed: Some(speed),
                    strength: Some(strength),
                    lifespan_ticks: Some(3000),
                    maturity_ticks: Some(200),
                    gestation_ticks: Some(60),
                    reproduction_rate: Some(2.0),
                    diet: Some(Diet::Omnivore),
                    social_structure: Some("solitary".to_string()),
                    nocturnal: Some(false),
                    aquatic: Some(false),
                    can_fly: Some(false),
                    habitat: Some(HashSet::from([Layer::Surface])),
                    perception: PerceptionOverride {
                        visual_range: Some(15.0),
                        hearing_range: Some(15.0),
                        smell_range: Some(15.0),
                        echolocation: Some(false),
                        electroreception: Some(false),
                        thermal_sensing: Some(false),
                    },
                    size: None,
                },
            )
            .expect("seed classes register cleanly");
    }

    let orders = [
        ("Primates", "Mammalia"),
        ("Carnivora", "Mammalia"),
        ("Artiodactyla", "Mammalia"),
        ("Accipitriformes", "Aves"),
        ("Salmoniformes", "Actinopterygii"),
        ("Lamniformes", "Chondrichthyes"),
        ("Orectolobiformes", "Chondrichthyes"),
        ("Araneae", "Arachnida"),
    ];
    for (name, parent_class) in orders {
        taxonomy
            .register(
                Rank::Order,
                name,
                Some((Rank::Class, parent_class)),
                TraitOverrides::default(),
            )
            .expect("seed orders register cleanly");
    }

    let families = [
        ("Hominidae", "Primates"),
        ("Canidae", "Carnivora"),
        ("Felidae", "Carnivora"),
        ("Cervidae", "Artiodactyla"),
        ("Accipitridae", "Accipitriformes"),
        ("Salmonidae", "Salmoniformes"),
        ("Lamnidae", "Lamniformes"),
        ("Rhincodontidae", "Orectolobiformes"),
        ("Nemesiidae", "Araneae"),
    ];
    for (name, parent_order) in families {
        taxonomy
            .register(
                Rank::Family,
                name,
                Some((Rank::Order, parent_order)),
                TraitOverrides::default(),
            )
            .expect("seed families register cleanly");
    }

    let genera = [
        ("Homo", "Hominidae"),
        ("Canis", "Canidae"),
        ("Panthera", "Felidae"),
        ("Acinonyx", "Felidae"),
        ("Cervus", "Cervidae"),
        ("Aquila", "Accipitridae"),
        ("Salmo", "Salmonidae"),
        ("Carcharodon", "Lamnidae"),
        ("Rhincodon", "Rhincodontidae"),
        ("Troglodytes", "Nemesiidae"),
    ];
    for (name, parent_family) in genera {
        taxonomy
            .register(
                Rank::Genus,
                name,
                Some((Rank::Family, parent_family)),
                TraitOverrides::default(),
            )
            .expect("seed genera register cleanly");
    }
}
