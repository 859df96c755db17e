//! Application configuration, loaded from a YAML file.
//!
//! Raw settings structs mirror the file schema (durations as integer
//! seconds or milliseconds); accessors convert them into the typed configs
//! the subsystems take.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::chaos::ChaosConfig;
use crate::network::{AdminConfig, NetworkConfig};
use crate::routing::BreakerConfig;
use crate::workflow::{RetryPolicy, WorkflowConfig};

/// Top-level configuration file schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub router: RouterSettings,
    pub health: HealthSettings,
    pub workflow: WorkflowSettings,
    pub chaos: ChaosConfig,
    pub network: NetworkSettings,
    pub admin: AdminSettings,
}

impl AppConfig {
    /// Loads and parses the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}

/// Routing section: BIN routes, regions, and failovers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterSettings {
    /// Prefix-or-range key → region name.
    pub bin_routes: BTreeMap<String, String>,
    pub default_region: String,
    pub regions: BTreeMap<String, RegionSettings>,
    /// Primary region → failover region.
    pub failover_map: BTreeMap<String, String>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            bin_routes: BTreeMap::new(),
            default_region: "us_east".to_string(),
            regions: BTreeMap::new(),
            failover_map: BTreeMap::new(),
        }
    }
}

/// One regional processor endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSettings {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl RegionSettings {
    /// Processor deadline for this region.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Circuit breaker and probe tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSettings {
    pub interval_secs: u64,
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
    pub error_window_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            failure_threshold: 5,
            reset_timeout_secs: 30,
            error_window_secs: 60,
        }
    }
}

impl HealthSettings {
    /// Probe interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Breaker configuration shared by every region.
    #[must_use]
    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
            error_window: Duration::from_secs(self.error_window_secs),
        }
    }
}

/// Workflow deadlines and retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowSettings {
    pub max_retries: u32,
    pub retry_interval_ms: u64,
    pub screen_timeout_ms: u64,
    pub dispatch_timeout_ms: u64,
    pub execution_timeout_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_interval_ms: 500,
            screen_timeout_ms: 2_000,
            dispatch_timeout_ms: 10_000,
            execution_timeout_ms: 300_000,
        }
    }
}

impl WorkflowSettings {
    /// Typed workflow configuration.
    #[must_use]
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            retry: RetryPolicy {
                initial_interval: Duration::from_millis(self.retry_interval_ms),
                max_attempts: self.max_retries,
                ..RetryPolicy::default()
            },
            screen_timeout: Duration::from_millis(self.screen_timeout_ms),
            dispatch_timeout: Duration::from_millis(self.dispatch_timeout_ms),
            execution_timeout: Duration::from_millis(self.execution_timeout_ms),
            ..WorkflowConfig::default()
        }
    }
}

/// Legacy-link listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    pub listen_addr: String,
    pub idle_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8583".to_string(),
            idle_timeout_secs: 30,
            drain_timeout_secs: 10,
        }
    }
}

impl NetworkSettings {
    /// Typed network configuration.
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            listen_addr: self.listen_addr.clone(),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
            ..NetworkConfig::default()
        }
    }
}

/// Admin surface settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminSettings {
    pub listen_addr: String,
    pub request_timeout_secs: u64,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9090".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl AdminSettings {
    /// Typed admin configuration.
    #[must_use]
    pub fn admin_config(&self) -> AdminConfig {
        AdminConfig {
            listen_addr: self.listen_addr.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
