use crate::{Error, SEED_LENGTH};
use commonware_utils::from_hex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fleet behavior. Every field is optional in YAML.
///
/// Changes only apply on the next `prepare`/`start_playing` cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub enabled: bool,
    #[serde(alias = "populationSize")]
    pub population_size: usize,
    #[serde(alias = "intervalMs")]
    pub interval_ms: u64,
    #[serde(alias = "randomizeInterval")]
    pub randomize_interval: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            population_size: 10,
            interval_ms: 5_000,
            randomize_interval: true,
        }
    }
}

impl FleetConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.interval_ms == 0 {
            return Err(Error::Config("interval_ms must be positive".into()));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_worker_threads() -> usize {
    4
}

fn default_creation_delay_ms() -> u64 {
    50
}

fn default_status_interval_secs() -> u64 {
    10
}

/// Configuration for a randotron deployment (from config file)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Hex-encoded 32-byte seed for keys and profiles.
    pub seed: String,
    #[serde(default)]
    pub tournament_id: Option<u64>,
    /// Stop after this many seconds (runs until interrupted if unset).
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default = "default_creation_delay_ms")]
    pub creation_delay_ms: u64,
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    #[serde(default)]
    pub fleet: FleetConfig,
}

impl Config {
    pub fn seed(&self) -> Result<[u8; SEED_LENGTH], Error> {
        let bytes = from_hex(&self.seed)
            .ok_or_else(|| Error::Config("seed must be hex encoded".into()))?;
        bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                Error::Config(format!(
                    "seed must be {SEED_LENGTH} bytes, got {}",
                    bytes.len()
                ))
            })
    }

    pub fn creation_delay(&self) -> Duration {
        Duration::from_millis(self.creation_delay_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.fleet.validate()?;
        self.seed()?;
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be positive".into()));
        }
        if self.status_interval_secs == 0 {
            return Err(Error::Config("status_interval_secs must be positive".into()));
        }
        Ok(())
    }
}
