//! Climate engine : celestial model, per-region weather, tidal effects,
//! eclipses, and pollution diffusion.

use std::f32::consts::PI;

use crate::simulation::region::{Biome, Region, RegionRegistry};
use crate::simulation::taxonomy::Layer;

const LUNAR_PERIOD_TICKS: f32 = 30.0;
const HOURS_PER_DAY: f32 = 24.0;
const DAYS_PER_YEAR: f32 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EclipseType {
    Solar,
    Lunar,
}

// solar_elevation and eclipse_type round out the celestial model; nothing
// downstream consumes them yet (weather only checks is_eclipse/tidal_force).
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct CelestialState {
    pub solar_elevation: f32,
    pub lunar_illumination: f32,
    pub tidal_force: f32,
    pub is_eclipse: bool,
    pub eclipse_type: Option<EclipseType>,
}

fn hour_of(tick: u64) -> f32 {
    (tick % HOURS_PER_DAY as u64) as f32
}

fn day_of(tick: u64) -> f32 {
    (tick / HOURS_PER_DAY as u64) as f32
}

/// celestial state at (tick, latitude).
pub fn celestial_state(tick: u64, latitude: f32) -> CelestialState {
    let hour_angle = (hour_of(tick) / HOURS_PER_DAY) * 2.0 * PI - PI;
    let day = day_of(tick);
    let declination = 23.5_f32.to_radians() * (2.0 * PI * day / DAYS_PER_YEAR).sin();
    let lat_rad = latitude.to_radians();
    let raw_elevation = hour_angle.cos() * (lat_rad - declination).cos();
    let solar_elevation = raw_elevation.clamp(0.0, 1.0);

    let lunar_phase = (tick as f32 % LUNAR_PERIOD_TICKS) / LUNAR_PERIOD_TICKS;
    let lunar_illumination = (1.0 - (2.0 * PI * lunar_phase).cos()) / 2.0;
    let tidal_force = (0.5 + 0.5 * (4.0 * PI * lunar_phase).cos()).clamp(0.0, 1.0);

    // Deterministic, rare eclipse windows keyed off the lunar phase extremes.
    let phase_ticks = tick % LUNAR_PERIOD_TICKS as u64;
    let is_new_moon_window = phase_ticks == 0 && tick % (LUNAR_PERIOD_TICKS as u64 * 9) == 0;
    let is_full_moon_window = phase_ticks == (LUNAR_PERIOD_TICKS as u64 / 2)
        && tick % (LUNAR_PERIOD_TICKS as u64 * 9) == (LUNAR_PERIOD_TICKS as u64 / 2);
    let (is_eclipse, eclipse_type) = if is_new_moon_window {
        (true, Some(EclipseType::Solar))
    } else if is_full_moon_window {
        (true, Some(EclipseType::Lunar))
    } else {
        (false, None)
    };

    CelestialState {
        solar_elevation,
        lunar_illumination,
        tidal_force,
        is_eclipse,
        eclipse_type,
    }
}

const ECLIPSE_TEMPERATURE_DROP: f32 = 2.0;
const CONVERGENCE_RATE: f32 = 0.05;

fn seasonal_target_temperature(region: &Region, tick: u64) -> f32 {
    let day = day_of(tick);
    let season_phase = 2.0 * PI * day / DAYS_PER_YEAR;
    if region.layer == Layer::Underground {
        // Thermally buffered: bounded within 10 degrees of the 14C baseline.
        return 14.0 + 6.0 * season_phase.sin();
    }
    let lat = region.coordinates.latitude.abs().clamp(0.0, 90.0);
    let amplitude = 5.0 + (lat / 90.0) * 20.0;
    let base = 30.0 - (lat / 90.0) * 40.0;
    base + amplitude * season_phase.sin()
}

/// per-region weather update, tidal effects, and eclipse cooling.
pub fn update_region_weather(region: &mut Region, celestial: &CelestialState, tick: u64) {
    let target_temperature = seasonal_target_temperature(region, tick);
    region.climate.temperature += (target_temperature - region.climate.temperature) * CONVERGENCE_RATE;
    if celestial.is_eclipse {
        region.climate.temperature -= ECLIPSE_TEMPERATURE_DROP;
    }
    if !region.climate.temperature.is_finite() {
        region.climate.temperature = target_temperature;
    }

    let humidity_drift = 0.01 * (celestial.lunar_illumination - 0.5);
    region.climate.humidity = (region.climate.humidity + humidity_drift).clamp(0.0, 1.0);
    region.climate.precipitation = region.climate.precipitation.clamp(0.0, 1.0);
    if !region.climate.humidity.is_finite() {
        region.climate.humidity = 0.5;
    }

    let applies_tidal = region.layer == Layer::Underwater || region.biome == Biome::Coastal;
    for resource in &mut region.resources {
        if applies_tidal {
            resource.renew_rate = resource.base_renew_rate * (1.0 + celestial.tidal_force * 0.3);
        } else {
            resource.renew_rate = resource.base_renew_rate;
        }
        resource.quantity = (resource.quantity + resource.renew_rate).min(resource.max_quantity);
    }
}

/// pollution diffusion: a fraction of each region's pollution flows to
/// connected neighbors proportional to the gradient; forest-like biomes
/// absorb more. No region goes negative.
pub fn diffuse_pollution(regions: &mut RegionRegistry) {
    let snapshot: Vec<(crate::simulation::ids::RegionId, f32, Vec<crate::simulation::ids::RegionId>, f32)> =
        regions
            .iter()
            .map(|r| (r.id, r.climate.pollution, r.connections.clone(), r.biome.pollution_absorption()))
            .collect();
    let pollution_by_id: std::collections::HashMap<_, _> =
        snapshot.iter().map(|(id, pollution, _, _)| (*id, *pollution)).collect();

    let mut deltas: std::collections::HashMap<crate::simulation::ids::RegionId, f32> =
        std::collections::HashMap::new();
    for (id, pollution, connections, _) in &snapshot {
        for &neighbor in connections {
            let neighbor_pollution = pollution_by_id.get(&neighbor).copied().unwrap_or(0.0);
            let gradient = (pollution - neighbor_pollution).max(0.0);
            if gradient <= 0.0 {
                continue;
            }
            let flow = gradient * 0.05;
            *deltas.entry(*id).or_insert(0.0) -= flow;
            *deltas.entry(neighbor).or_insert(0.0) += flow;
        }
    }

    for (id, absorption) in snapshot.iter().map(|(id, _, _, absorption)| (*id, *absorption)) {
        if let Ok(region) = regions.get_mut(id) {
            let delta = deltas.get(&id).copied().unwrap_or(0.0);
            let absorbed = region.climate.pollution * absorption;
            region.climate.pollution = (region.climate.pollution + delta - absorbed).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::region::{ClimateState, Coordinates};
    use std::collections::HashMap;

    fn test_region(layer: Layer, biome: Biome, latitude: f32) -> Region {
        Region {
            id: crate::simulation::ids::RegionId(0),
            name: "Test".into(),
            layer,
            biome,
            coordinates: Coordinates { latitude, longitude: 0.0 },
            elevation: 0.0,
            climate: ClimateState::default(),
            resources: vec![crate::simulation::region::ResourceStock::new("water", 50.0, 100.0, 5.0)],
            connections: vec![],
            populations: HashMap::new(),
            hidden_locations: vec![],
        }
    }

    #[test]
    fn weather_fields_stay_finite() {
        let mut region = test_region(Layer::Surface, Biome::Grassland, 45.0);
        for tick in 0..2000 {
            let celestial = celestial_state(tick, region.coordinates.latitude);
            update_region_weather(&mut region, &celestial, tick);
            assert!(region.climate.temperature.is_finite());
            assert!(region.climate.humidity.is_finite());
            assert!(region.climate.humidity >= 0.0 && region.climate.humidity <= 1.0);
        }
    }

    #[test]
    fn underground_temperature_stays_buffered() {
        let mut region = test_region(Layer::Underground, Biome::CaveSystem, 60.0);
        for tick in 0..500 {
            let celestial = celestial_state(tick, region.coordinates.latitude);
            update_region_weather(&mut region, &celestial, tick);
            assert!((region.climate.temperature - 14.0).abs() < 10.0);
        }
    }

    #[test]
    fn tidal_effect_only_applies_to_underwater_and_coastal() {
        let mut coastal = test_region(Layer::Surface, Biome::Coastal, 10.0);
        let mut inland = test_region(Layer::Surface, Biome::Grassland, 10.0);
        let celestial = CelestialState {
            solar_elevation: 0.5,
            lunar_illumination: 0.5,
            tidal_force: 1.0,
            is_eclipse: false,
            eclipse_type: None,
        };
        update_region_weather(&mut coastal, &celestial, 0);
        update_region_weather(&mut inland, &celestial, 0);
        assert!(coastal.resources[0].renew_rate > inland.resources[0].renew_rate);
    }
}
