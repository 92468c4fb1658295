use crate::sampler::{ConnectParams, Features, Instance, TlsParams, host_tag};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top level of the configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default polling interval (seconds)
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// One `[[instance]]` block per database target
    #[serde(default, rename = "instance")]
    pub instances: Vec<InstanceConfig>,
}

pub const fn default_interval() -> u64 {
    10
}

/// One monitored server.
///
/// ```toml
/// [[instance]]
/// name = "primary"
/// host = "db1.example.com"
/// user = "monitor"
/// password = "secret"
/// primary_stats = true
///
/// [instance.tls]
/// ca = "/etc/mysql/ca.pem"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstanceConfig {
    /// Instance tag, must be unique
    pub name: String,
    /// Host tag override
    pub alias: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub database: Option<String>,
    /// 0 means the client default
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
    /// Seconds, 0 disables the timeout
    #[serde(default)]
    pub connect_timeout: u64,
    /// Seconds, overrides the global interval
    pub interval: Option<u64>,
    #[serde(default)]
    pub tls: TlsParams,

    #[serde(default)]
    pub primary_stats: bool,
    #[serde(default)]
    pub replica_stats: bool,
    #[serde(default)]
    pub innodb_stats: bool,
    #[serde(default)]
    pub wsrep_stats: bool,
    #[serde(default)]
    pub replica_notifications: bool,
}

impl InstanceConfig {
    #[must_use]
    pub const fn features(&self) -> Features {
        Features {
            primary_stats: self.primary_stats,
            replica_stats: self.replica_stats,
            innodb_stats: self.innodb_stats,
            wsrep_stats: self.wsrep_stats,
            replica_notifications: self.replica_notifications,
        }
    }

    /// Build the runtime instance. `hostname` is the local host name used as
    /// host tag for loopback targets.
    #[must_use]
    pub fn into_instance(self, hostname: &str) -> Instance {
        let features = self.features();
        let tag = host_tag(self.alias.as_deref(), self.host.as_deref(), hostname);
        let interval = self.interval.map(Duration::from_secs);

        let params = ConnectParams {
            host: self.host,
            user: self.user,
            password: self.password,
            database: self.database,
            port: self.port.filter(|p| *p != 0),
            socket: self.socket,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            tls: self.tls,
        };

        Instance::new(self.name, tag, features, params).with_interval(interval)
    }
}
