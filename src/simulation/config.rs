//! Simulation configuration: tick pacing, checkpoint cadence, seed sizing,
//! and the handful of environment variables the process recognizes.

use std::time::Duration;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub tick_duration: Duration,
    /// How many ticks elapse between `politics.tick` passes.
    pub politics_interval_ticks: u64,
    /// How many ticks elapse between `evolution.tick` passes.
    pub evolution_interval_ticks: u64,
    /// How many ticks elapse between snapshot checkpoints.
    pub checkpoint_interval_ticks: u64,
    pub checkpoint_dir: String,
    pub host: String,
    pub port: u16,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_secs(1),
            politics_interval_ticks: 10,
            evolution_interval_ticks: 500,
            checkpoint_interval_ticks: 100,
            checkpoint_dir: "snapshots".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl SimulationConfig {
    /// Overlays recognized environment variables onto the defaults. Unset or
    /// unparsable variables are left at their default value.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse() {
                config.port = parsed;
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.politics_interval_ticks, 10);
        assert_eq!(config.evolution_interval_ticks, 500);
    }
}
