//! Engine / worker configuration.
//!
//! Defaults follow the production deployment: 30 s leases, one automatic
//! retry, a janitor tick every 30 s and a 60 s backoff after a failed sweep.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Lease / retry / janitor settings shared by every process using a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// A PROCESSING task is abandoned once `now - lease_start > lease_timeout`.
    pub lease_timeout: Duration,
    /// Automatic (janitor) requeue budget per task.
    pub max_retries: u32,
    pub sweep_interval: Duration,
    /// Janitor wait after a sweep failed on the store.
    pub error_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lease_timeout: Duration::from_secs(30),
            max_retries: 1,
            sweep_interval: Duration::from_secs(30),
            error_backoff: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    pub fn with_lease_timeout(mut self, lease_timeout: Duration) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    /// `max_retries = 0` is valid (every expiry is terminal).
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("lease_timeout", self.lease_timeout)?;
        non_zero("sweep_interval", self.sweep_interval)?;
        non_zero("error_backoff", self.error_backoff)?;
        Ok(())
    }
}

/// Polling worker cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Sleep after an empty acquire.
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Sleep after StoreUnavailable.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("poll_interval", self.poll_interval)?;
        non_zero("heartbeat_interval", self.heartbeat_interval)?;
        non_zero("error_backoff", self.error_backoff)?;
        Ok(())
    }
}

fn non_zero(name: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        Err(ConfigError::ZeroDuration(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_settings() {
        let config = EngineConfig::default();
        assert_eq!(config.lease_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.error_backoff, Duration::from_secs(60));
        assert!(config.validate().is_ok());

        let worker = WorkerConfig::default();
        assert_eq!(worker.poll_interval, Duration::from_secs(5));
        assert_eq!(worker.heartbeat_interval, Duration::from_secs(60));
    }

    #[test]
    fn zero_lease_timeout_is_rejected() {
        let config = EngineConfig::default().with_lease_timeout(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("lease_timeout"))
        );
    }

    #[test]
    fn zero_retries_is_allowed() {
        assert!(EngineConfig::default().with_max_retries(0).validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = WorkerConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("poll_interval"))
        );
    }
}
