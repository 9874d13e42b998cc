//! Manager Policy
//!
//! Rules for the ingestion manager's health checks and automatic restarts.

use crate::error::SentinelError;
use serde::{Deserialize, Serialize};
use sluice_bus::topics;
use std::time::Duration;

/// Ingestion manager operational policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerPolicy {
    /// Seconds between health checks
    ///
    /// **Default:** 60
    pub health_check_interval_s: u64,

    /// Pause between stopping and starting a connector during a restart
    ///
    /// **Default:** 2000 ms
    pub restart_pause_ms: u64,

    /// Restart connectors found UNHEALTHY by a health check
    ///
    /// **Default:** true
    pub auto_restart: bool,

    /// Topic health snapshots are published to
    ///
    /// **Default:** `system.health`
    pub health_topic: String,
}

impl Default for ManagerPolicy {
    fn default() -> Self {
        Self {
            health_check_interval_s: 60,
            restart_pause_ms: 2000,
            auto_restart: true,
            health_topic: topics::SYSTEM_HEALTH.to_string(),
        }
    }
}

impl ManagerPolicy {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_s)
    }

    pub fn restart_pause(&self) -> Duration {
        Duration::from_millis(self.restart_pause_ms)
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.health_check_interval_s == 0 {
            return Err(SentinelError::InvalidPolicy(
                "health_check_interval_s must be greater than 0".to_string(),
            ));
        }

        if self.health_topic.trim().is_empty() {
            return Err(SentinelError::InvalidPolicy(
                "health_topic must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ManagerPolicy::default();

        assert_eq!(policy.health_check_interval(), Duration::from_secs(60));
        assert_eq!(policy.restart_pause(), Duration::from_secs(2));
        assert!(policy.auto_restart);
        assert_eq!(policy.health_topic, "system.health");
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_partial_policy_uses_defaults() {
        let policy: ManagerPolicy =
            serde_json::from_str(r#"{"auto_restart": false}"#).unwrap();

        assert!(!policy.auto_restart);
        assert_eq!(policy.health_check_interval_s, 60);
        assert_eq!(policy.restart_pause_ms, 2000);
    }

    #[test]
    fn test_validation_failures() {
        let mut policy = ManagerPolicy::default();

        policy.health_check_interval_s = 0;
        assert!(policy.validate().is_err());
        policy.health_check_interval_s = 60;

        policy.health_topic = String::new();
        assert!(policy.validate().is_err());
    }
}
