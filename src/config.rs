//! Runtime configuration for the ledger services.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Bounds on how long a single operation may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound for acquiring every lock one operation needs.
    pub lock_timeout: Duration,
    /// Upper bound for each individual store call.
    pub store_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    pub fn new(lock_timeout: Duration, store_timeout: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            lock_timeout,
            store_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_millis(lock_timeout_ms: u64, store_timeout_ms: u64) -> Result<Self, ConfigError> {
        Self::new(
            Duration::from_millis(lock_timeout_ms),
            Duration::from_millis(store_timeout_ms),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("lock timeout"));
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("store timeout"));
        }
        Ok(())
    }
}
