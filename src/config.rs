// Copyright 2025 Cowboy AI, LLC.

//! Configuration for the message fabric connection and workflow policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the message fabric connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Fabric server URL (e.g., "nats://localhost:4222")
    pub url: String,

    /// Optional username for authentication
    pub user: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            user: None,
            password: None,
            connection_timeout_secs: 10,
        }
    }
}

/// Policy knobs for the approval workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// How long to wait for an approver-lookup response, in seconds
    pub lookup_timeout_secs: u64,

    /// How long to wait for an allowance-adjustment response, in seconds
    pub adjustment_timeout_secs: u64,

    /// Minimum number of days between submission and the event date
    pub minimum_notice_days: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 30,
            adjustment_timeout_secs: 30,
            minimum_notice_days: 7,
        }
    }
}

impl WorkflowConfig {
    /// Lookup timeout as a `Duration`
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Adjustment timeout as a `Duration`
    pub fn adjustment_timeout(&self) -> Duration {
        Duration::from_secs(self.adjustment_timeout_secs)
    }
}

/// Top-level configuration for the reimbursement domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Message fabric connection settings
    pub fabric: FabricConfig,
    /// Workflow policy settings
    pub workflow: WorkflowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DomainConfig::default();
        assert_eq!(config.fabric.url, "nats://localhost:4222");
        assert_eq!(config.workflow.lookup_timeout_secs, 30);
        assert_eq!(config.workflow.minimum_notice_days, 7);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = WorkflowConfig {
            lookup_timeout_secs: 5,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WorkflowConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.lookup_timeout_secs, 5);
        assert_eq!(parsed.lookup_timeout(), Duration::from_secs(5));
    }
}
