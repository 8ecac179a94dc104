//! Simulation settings loaded from JSON, overridable from the command line.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sf_machines::FactoryOptions;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock spacing between scheduler ticks.
    pub tick_interval_ms: u64,
    /// Base seed for every machine; absent means entropy.
    pub seed: Option<u64>,
    pub broadcast_capacity: usize,
    /// Mark every Nth update for persistence, tick 0 included.
    pub persist_every_ticks: u64,
    /// Upper bound on the measured dt fed to the machines.
    pub max_tick_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            seed: None,
            broadcast_capacity: 64,
            persist_every_ticks: 5,
            max_tick_secs: 5.0,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        ensure!(self.broadcast_capacity > 0, "broadcast_capacity must be positive");
        ensure!(self.persist_every_ticks > 0, "persist_every_ticks must be positive");
        ensure!(
            self.max_tick_secs.is_finite() && self.max_tick_secs > 0.0,
            "max_tick_secs must be a positive number"
        );
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn factory_options(&self) -> FactoryOptions {
        FactoryOptions {
            seed: self.seed,
            started_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"seed": 42, "persist_every_ticks": 10}}"#).unwrap();
        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.persist_every_ticks, 10);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.broadcast_capacity, 64);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tick_interval_ms": 0}}"#).unwrap();
        let err = SimulationConfig::from_json_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));

        let config = SimulationConfig {
            max_tick_secs: f64::NAN,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = SimulationConfig::from_json_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }
}
