use crate::sampler::{CycleError, CycleReport, format_version};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last known state of one instance, as served by `/health`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InstanceHealth {
    pub connected: bool,
    pub last_cycle: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub server_version: Option<String>,
    pub failed_sub_queries: Vec<String>,
}

impl InstanceHealth {
    /// The last attempted cycle got past the status query.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.last_cycle.is_some() && self.last_cycle == self.last_success
    }
}

/// Lock-free board of per-instance health; writers replace the whole map.
#[derive(Clone, Default)]
pub struct HealthBoard {
    inner: Arc<ArcSwap<BTreeMap<String, InstanceHealth>>>,
}

impl HealthBoard {
    #[must_use]
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let map = names
            .into_iter()
            .map(|name| (name.to_string(), InstanceHealth::default()))
            .collect();
        Self {
            inner: Arc::new(ArcSwap::from_pointee(map)),
        }
    }

    pub fn update(
        &self,
        instance: &str,
        connected: bool,
        outcome: &Result<CycleReport, CycleError>,
    ) {
        let now = Utc::now();
        self.inner.rcu(|current| {
            let mut map = BTreeMap::clone(current);
            let entry = map.entry(instance.to_string()).or_default();
            entry.connected = connected;
            entry.last_cycle = Some(now);
            match outcome {
                Ok(report) => {
                    entry.last_success = Some(now);
                    entry.last_error = None;
                    entry.server_version = Some(format_version(report.server_version));
                    entry.failed_sub_queries = report
                        .failures()
                        .map(|(sub_query, e)| format!("{sub_query}: {e}"))
                        .collect();
                }
                Err(e) => {
                    entry.last_error = Some(e.to_string());
                    entry.failed_sub_queries.clear();
                }
            }
            map
        });
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<BTreeMap<String, InstanceHealth>> {
        self.inner.load_full()
    }

    /// Down only when every instance has run and every last cycle failed.
    #[must_use]
    pub fn is_down(&self) -> bool {
        let map = self.inner.load();
        !map.is_empty()
            && map
                .values()
                .all(|h| h.last_cycle.is_some() && !h.is_healthy())
    }
}
