use super::client::ConnectParams;
use super::connection::ConnectionManager;
use super::replication::ReplicationWatcher;
use crate::sink::Tags;
use std::time::Duration;

/// Per-instance switches for the optional sub-queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Features {
    /// `SHOW MASTER STATUS`
    pub primary_stats: bool,
    /// `SHOW SLAVE STATUS` emissions
    pub replica_stats: bool,
    /// `Innodb_*` status keys and `information_schema.innodb_metrics`
    pub innodb_stats: bool,
    /// Galera `wsrep_*` status
    pub wsrep_stats: bool,
    pub replica_notifications: bool,
}

impl Features {
    #[must_use]
    pub const fn replication(&self) -> bool {
        self.replica_stats || self.replica_notifications
    }
}

/// One configured database target and everything it owns across cycles.
pub struct Instance {
    name: String,
    pub(crate) tags: Tags,
    pub(crate) features: Features,
    interval: Option<Duration>,
    pub(crate) connection: ConnectionManager,
    pub(crate) replication: ReplicationWatcher,
}

impl Instance {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host_tag: impl Into<String>,
        features: Features,
        params: ConnectParams,
    ) -> Self {
        let name = name.into();
        Self {
            tags: Tags {
                host: host_tag.into(),
                instance: name.clone(),
            },
            name,
            features,
            interval: None,
            connection: ConnectionManager::new(params),
            replication: ReplicationWatcher::new(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Own polling interval, if one was configured.
    #[must_use]
    pub const fn interval(&self) -> Option<Duration> {
        self.interval
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    #[must_use]
    pub const fn server_version(&self) -> u64 {
        self.connection.server_version()
    }

    #[must_use]
    pub const fn replication(&self) -> &ReplicationWatcher {
        &self.replication
    }

    /// Close the connection; the instance reconnects on its next cycle.
    pub async fn close(&mut self) {
        self.connection.close().await;
    }
}

/// Host tag attached to everything an instance emits: the alias if set, the
/// local hostname for loopback targets, otherwise the configured host.
#[must_use]
pub fn host_tag(alias: Option<&str>, host: Option<&str>, hostname: &str) -> String {
    if let Some(alias) = alias {
        return alias.to_string();
    }
    match host {
        None | Some("" | "localhost" | "127.0.0.1") => hostname.to_string(),
        Some(host) => host.to_string(),
    }
}
