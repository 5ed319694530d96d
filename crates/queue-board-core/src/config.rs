//! Board runtime configuration.

use crate::errors::{BoardError, Result};
use crate::pager::DEFAULT_PAGE_SIZE;
use crate::pending::DEFAULT_PENDING_TIMEOUT;
use crate::replicator::DEFAULT_DEBOUNCE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted slot count.
pub const MAX_CAPACITY: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of queue slots
    pub capacity: usize,
    /// Rows per page
    pub page_size: usize,
    /// Debounce window for batched broadcasts
    pub debounce_ms: u64,
    /// Pending join/leave release timeout; 0 disables the fallback
    pub pending_timeout_ms: u64,
    /// Jump to the last page once the local join shows up
    pub auto_page_on_join: bool,
    /// Label rendered for left markers
    pub left_label: String,
    /// Maximum UTF-8 bytes of a rendered participant label
    pub max_label_bytes: usize,
    /// Appended to labels that were cut short
    pub label_suffix: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            pending_timeout_ms: DEFAULT_PENDING_TIMEOUT.as_millis() as u64,
            auto_page_on_join: true,
            left_label: "[left the queue]".to_string(),
            max_label_bytes: 32,
            label_suffix: "…".to_string(),
        }
    }
}

impl BoardConfig {
    /// Configuration with a different slot count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn pending_timeout(&self) -> Option<Duration> {
        (self.pending_timeout_ms > 0).then(|| Duration::from_millis(self.pending_timeout_ms))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(BoardError::invalid_config(
                "capacity must be greater than 0",
            ));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(BoardError::invalid_config(format!(
                "capacity must be at most {MAX_CAPACITY}"
            )));
        }
        if self.page_size == 0 {
            return Err(BoardError::invalid_config(
                "page_size must be greater than 0",
            ));
        }
        if self.page_size > MAX_CAPACITY {
            return Err(BoardError::invalid_config(format!(
                "page_size must be at most {MAX_CAPACITY}"
            )));
        }
        if self.left_label.is_empty() {
            return Err(BoardError::invalid_config("left_label must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = BoardConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.pending_timeout(), Some(Duration::from_secs(5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_disables_fallback() {
        let config = BoardConfig {
            pending_timeout_ms: 0,
            ..BoardConfig::default()
        };
        assert_eq!(config.pending_timeout(), None);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(BoardConfig::with_capacity(0).validate().is_err());
        assert!(BoardConfig::with_capacity(MAX_CAPACITY + 1).validate().is_err());
        let config = BoardConfig {
            page_size: 0,
            ..BoardConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BoardError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn page_size_is_bounded() {
        let larger_than_capacity = BoardConfig {
            page_size: 10,
            ..BoardConfig::with_capacity(3)
        };
        assert!(larger_than_capacity.validate().is_ok());

        let huge = BoardConfig {
            page_size: usize::MAX,
            ..BoardConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(BoardError::InvalidConfig { .. })
        ));
    }
}
