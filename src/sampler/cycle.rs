//! One polling pass over one instance.
//!
//! `connect → status → {innodb, primary, replication, cluster}`. A failed
//! connect or status query ends the cycle; every later sub-query is attempted
//! regardless of how its siblings fared.

use super::classify::{StatusScan, classify_innodb_metric, classify_wsrep};
use super::client::{DatabaseClient, Session};
use super::error::{CycleError, SampleError, SchemaError};
use super::instance::{Features, Instance};
use super::query::{
    SHOW_MASTER_STATUS, SHOW_SLAVE_STATUS, SHOW_WSREP_STATUS, execute, innodb_metrics_query,
    innodb_metrics_supported, status_query,
};
use super::replication::{Observation, ReplicationWatcher, primary_position};
use crate::sink::{Emission, MetricSink, Notifier, Tags};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{Span, debug, instrument, warn};
use ulid::Ulid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubQuery {
    Innodb,
    Primary,
    Replication,
    Cluster,
}

impl SubQuery {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Innodb => "innodb",
            Self::Primary => "primary",
            Self::Replication => "replication",
            Self::Cluster => "cluster",
        }
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempted sub-query: number of emissions on success.
#[derive(Debug)]
pub struct SubQueryOutcome {
    pub sub_query: SubQuery,
    pub result: Result<usize, SampleError>,
}

/// Summary of a cycle that got past the status query.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Ulid,
    pub server_version: u64,
    /// Emissions handed to the sink, status query included.
    pub emitted: usize,
    pub notified: usize,
    pub sub_queries: Vec<SubQueryOutcome>,
}

impl CycleReport {
    fn new(cycle_id: Ulid, server_version: u64) -> Self {
        Self {
            cycle_id,
            server_version,
            emitted: 0,
            notified: 0,
            sub_queries: Vec::new(),
        }
    }

    #[must_use]
    pub fn outcome(&self, sub_query: SubQuery) -> Option<&Result<usize, SampleError>> {
        self.sub_queries
            .iter()
            .find(|o| o.sub_query == sub_query)
            .map(|o| &o.result)
    }

    /// Sub-queries that were attempted, in order.
    #[must_use]
    pub fn attempted(&self) -> Vec<SubQuery> {
        self.sub_queries.iter().map(|o| o.sub_query).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (SubQuery, &SampleError)> {
        self.sub_queries
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.sub_query, e)))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Drives cycles: owns the shared collaborators, never any instance state.
#[derive(Clone)]
pub struct Sampler {
    client: Arc<dyn DatabaseClient>,
    sink: Arc<dyn MetricSink>,
    notifier: Arc<dyn Notifier>,
}

impl Sampler {
    #[must_use]
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        sink: Arc<dyn MetricSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            sink,
            notifier,
        }
    }

    /// Run one cycle against `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Connection`] if no session could be obtained and
    /// [`CycleError::Status`] if the status query failed. Sub-query failures
    /// are reported in the returned [`CycleReport`] instead.
    #[instrument(
        skip(self, instance),
        level = "info",
        err,
        fields(instance = %instance.name(), cycle_id = tracing::field::Empty)
    )]
    pub async fn run_cycle(&self, instance: &mut Instance) -> Result<CycleReport, CycleError> {
        let cycle_id = Ulid::new();
        Span::current().record("cycle_id", tracing::field::display(cycle_id));

        let Instance {
            tags,
            features,
            connection,
            replication,
            ..
        } = instance;
        let (tags, features): (&Tags, &Features) = (tags, features);

        let session = connection.acquire(self.client.as_ref()).await?;
        let version = session.server_version();
        let mut report = CycleReport::new(cycle_id, version);

        let status = execute(session, status_query(version))
            .await
            .map_err(CycleError::Status)?;

        let mut scan = StatusScan::new(features.innodb_stats);
        for (key, value) in status.pairs() {
            scan.observe(key, value);
        }
        report.emitted += self.emit(tags, &scan.finish());

        if features.innodb_stats {
            if innodb_metrics_supported(version) {
                let result = innodb_metrics(session, version).await;
                self.record(&mut report, tags, SubQuery::Innodb, result);
            } else {
                debug!(server_version = version, "innodb_metrics not available, skipping");
            }
        }

        if features.primary_stats {
            let result = primary_stats(session).await;
            self.record(&mut report, tags, SubQuery::Primary, result);
        }

        if features.replication() {
            let result = replica_stats(session, replication, features).await;
            let result = result.map(|observation| {
                for notification in &observation.notifications {
                    self.notifier.notify(tags, notification);
                }
                report.notified += observation.notifications.len();
                observation.emissions
            });
            self.record(&mut report, tags, SubQuery::Replication, result);
        }

        if features.wsrep_stats {
            let result = wsrep_stats(session).await;
            self.record(&mut report, tags, SubQuery::Cluster, result);
        }

        debug!(
            emitted = report.emitted,
            notified = report.notified,
            failed = report.failures().count(),
            "cycle finished"
        );

        Ok(report)
    }

    fn emit(&self, tags: &Tags, emissions: &[Emission]) -> usize {
        self.sink.emit_all(tags, emissions);
        emissions.len()
    }

    fn record(
        &self,
        report: &mut CycleReport,
        tags: &Tags,
        sub_query: SubQuery,
        result: Result<Vec<Emission>, SampleError>,
    ) {
        let result = match result {
            Ok(emissions) => {
                let n = self.emit(tags, &emissions);
                report.emitted += n;
                Ok(n)
            }
            Err(e) => {
                warn!(
                    instance = %tags.instance,
                    sub_query = %sub_query,
                    error = %e,
                    "sub-query failed"
                );
                Err(e)
            }
        };
        report.sub_queries.push(SubQueryOutcome { sub_query, result });
    }
}

async fn innodb_metrics(
    session: &mut dyn Session,
    version: u64,
) -> Result<Vec<Emission>, SampleError> {
    let result = execute(session, innodb_metrics_query(version)).await?;
    Ok(result
        .pairs()
        .filter_map(|(name, count)| classify_innodb_metric(name, count))
        .collect())
}

async fn primary_stats(session: &mut dyn Session) -> Result<Vec<Emission>, SampleError> {
    let result = execute(session, SHOW_MASTER_STATUS).await?;
    Ok(vec![primary_position(&result)?])
}

async fn replica_stats(
    session: &mut dyn Session,
    watcher: &mut ReplicationWatcher,
    features: &Features,
) -> Result<Observation, SampleError> {
    let result = execute(session, SHOW_SLAVE_STATUS).await?;
    Ok(watcher.observe(&result, features)?)
}

async fn wsrep_stats(session: &mut dyn Session) -> Result<Vec<Emission>, SampleError> {
    let result = execute(session, SHOW_WSREP_STATUS).await?;
    if result.is_empty() {
        return Err(SchemaError::NoRows {
            query: SHOW_WSREP_STATUS,
        }
        .into());
    }
    Ok(result
        .pairs()
        .filter_map(|(key, value)| classify_wsrep(key, value))
        .collect())
}
