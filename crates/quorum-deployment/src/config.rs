//! Deployer configuration.
//!
//! Everything the strategies need is passed in explicitly; nothing is read
//! from the environment at deploy time. [`DeployerConfig::load`] is the one
//! place that layers defaults, a config file and `QUORUM_*` variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main deployer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployerConfig {
    /// Stateful role settings
    #[serde(default)]
    pub stateful: StatefulRoleConfig,

    /// Wait bounds
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl DeployerConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Nested keys are separated by a double underscore, e.g.
    /// `QUORUM_TIMEOUTS__STOP_TIMEOUT_SECS=45`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DeployerConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with QUORUM_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("QUORUM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

/// Identifies the stateful role within the application's formation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatefulRoleConfig {
    /// Process type running the replicated service
    #[serde(default = "default_process_type")]
    pub process_type: String,

    /// Instance metadata flag set to `"true"` once the service has joined
    /// the replica set
    #[serde(default = "default_readiness_key")]
    pub readiness_key: String,
}

impl Default for StatefulRoleConfig {
    fn default() -> Self {
        Self {
            process_type: default_process_type(),
            readiness_key: default_readiness_key(),
        }
    }
}

/// Bounds on every wait a deployment performs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Wait for a stopped instance to leave the registry
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Wait for a new instance to report ready
    #[serde(default = "default_start_timeout")]
    pub start_timeout_secs: u64,

    /// Wait for all old stateful jobs to exit
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,

    /// Wait for a single job event in one-by-one deployments
    #[serde(default = "default_job_event_timeout")]
    pub job_event_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout(),
            start_timeout_secs: default_start_timeout(),
            drain_timeout_secs: default_drain_timeout(),
            job_event_timeout_secs: default_job_event_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn job_event_timeout(&self) -> Duration {
        Duration::from_secs(self.job_event_timeout_secs)
    }
}

fn default_process_type() -> String {
    "postgres".to_string()
}

fn default_readiness_key() -> String {
    "SERVICE_ONLINE".to_string()
}

fn default_stop_timeout() -> u64 {
    30
}

fn default_start_timeout() -> u64 {
    30
}

fn default_drain_timeout() -> u64 {
    60
}

fn default_job_event_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DeployerConfig::default();
        assert_eq!(config.stateful.process_type, "postgres");
        assert_eq!(config.stateful.readiness_key, "SERVICE_ONLINE");
        assert_eq!(config.timeouts.stop_timeout(), Duration::from_secs(30));
        assert_eq!(config.timeouts.start_timeout(), Duration::from_secs(30));
        assert_eq!(config.timeouts.drain_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DeployerConfig::load(None).unwrap();
        assert_eq!(config.timeouts.drain_timeout_secs, 60);
    }

    #[test]
    fn test_load_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[stateful]\nprocess_type = \"mysql\"\n\n[timeouts]\nstart_timeout_secs = 90\n"
        )
        .unwrap();

        let config = DeployerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.stateful.process_type, "mysql");
        assert_eq!(config.stateful.readiness_key, "SERVICE_ONLINE");
        assert_eq!(config.timeouts.start_timeout(), Duration::from_secs(90));
        assert_eq!(config.timeouts.stop_timeout(), Duration::from_secs(30));
    }
}
