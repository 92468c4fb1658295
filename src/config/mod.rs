mod schema;

pub use schema::*;

use crate::sampler::Instance;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use sysinfo::System;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("interval must be greater than 0")]
    ZeroInterval,
    #[error("no usable [[instance]] block in configuration")]
    NoInstances,
}

/// Read, parse and validate a configuration file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if no
/// valid instance remains after validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// # Errors
///
/// See [`load_config`].
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()
}

impl Config {
    /// Drop instance blocks that cannot be used (empty or duplicate name) with
    /// a warning. A bad block does not stop the others from loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroInterval`] or [`ConfigError::NoInstances`].
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let mut seen = HashSet::new();
        self.instances.retain_mut(|instance| {
            if instance.name.trim().is_empty() {
                warn!("skipping [[instance]] block without a name");
                return false;
            }
            if !seen.insert(instance.name.clone()) {
                warn!(instance = %instance.name, "skipping duplicate [[instance]] block");
                return false;
            }
            if instance.interval == Some(0) {
                warn!(instance = %instance.name, "interval = 0 ignored, using the global interval");
                instance.interval = None;
            }
            true
        });

        if self.instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }

        Ok(self)
    }

    #[must_use]
    pub const fn default_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Build one runtime instance per block.
    #[must_use]
    pub fn into_instances(self, hostname: &str) -> Vec<Instance> {
        self.instances
            .into_iter()
            .map(|instance| instance.into_instance(hostname))
            .collect()
    }
}

/// Local host name, used as host tag for instances on loopback addresses.
#[must_use]
pub fn local_hostname() -> String {
    System::host_name()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
