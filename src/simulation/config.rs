use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub file_name: String,
    pub file_size: u64,
    pub piece_size: u32,

    // Swarm
    pub peers: usize,
    /// `None` gives every peer room for two copies of the file
    pub peer_storage: Option<u64>,

    // Timings
    pub cycles: usize,
    pub cycle_delay_ms: u64,
    pub pieces_per_cycle: usize,

    /// chance that a request which passed every check goes through
    pub success_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            file_name: "sample.data".to_string(),
            file_size: 10_485_760,
            piece_size: crate::DEFAULT_PIECE_SIZE,
            peers: 3,
            peer_storage: None,
            cycles: 20,
            cycle_delay_ms: 1_000,
            pieces_per_cycle: 3,
            success_rate: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.piece_size == 0 {
            return Err(ConfigError::Invalid("piece_size must be positive".to_string()));
        }
        if self.peers == 0 {
            return Err(ConfigError::Invalid("at least one peer is needed".to_string()));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(ConfigError::Invalid(format!(
                "success_rate must be within [0, 1], got {}",
                self.success_rate
            )));
        }
        Ok(())
    }

    pub fn peer_storage(&self) -> u64 {
        self.peer_storage
            .unwrap_or_else(|| self.file_size.saturating_mul(2))
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }
}
