//! Simulation configuration.
//!
//! Loaded from an optional TOML file, then overridden from the command line.
//!
//! ```toml
//! participants = 8
//! steps = 400
//! drop_rate = 0.1
//!
//! [board]
//! capacity = 20
//! page_size = 5
//! ```

use anyhow::{bail, Context, Result};
use queue_board_core::BoardConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Board settings shared by every participant
    pub board: BoardConfig,
    /// Participants connected at any time
    pub participants: u32,
    /// Workload steps, one tick period each
    pub steps: u32,
    /// Seed for the workload and the network faults
    pub seed: u64,
    /// Probability that a message is lost
    pub drop_rate: f64,
    /// Hand the writer role on every N steps; 0 disables handoffs
    pub handoff_every: u32,
    /// Probability per step that a random participant disconnects and is
    /// replaced by a newcomer
    pub departure_rate: f64,
    /// Scheduling period in milliseconds
    pub tick_ms: u64,
    /// Budget for draining traffic after the workload
    pub settle_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            participants: 6,
            steps: 200,
            seed: 42,
            drop_rate: 0.0,
            handoff_every: 0,
            departure_rate: 0.02,
            tick_ms: 50,
            settle_ms: 10_000,
        }
    }
}

impl SimConfig {
    /// Read a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.board.validate()?;
        if self.participants == 0 {
            bail!("participants must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.drop_rate) {
            bail!("drop_rate must be within [0, 1], got {}", self.drop_rate);
        }
        if !(0.0..=1.0).contains(&self.departure_rate) {
            bail!(
                "departure_rate must be within [0, 1], got {}",
                self.departure_rate
            );
        }
        if self.tick_ms == 0 {
            bail!("tick_ms must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "participants = 3\ndrop_rate = 0.25\n\n[board]\ncapacity = 12\npage_size = 4"
        )
        .unwrap();

        let config = SimConfig::load(file.path()).unwrap();

        assert_eq!(config.participants, 3);
        assert_eq!(config.drop_rate, 0.25);
        assert_eq!(config.board.capacity, 12);
        assert_eq!(config.board.page_size, 4);
        assert_eq!(config.board.debounce_ms, 250);
        assert_eq!(config.steps, SimConfig::default().steps);
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SimConfig::load(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        let config = SimConfig {
            drop_rate: 1.5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimConfig {
            participants: 0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
