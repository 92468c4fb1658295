use crate::sampler::{CycleError, CycleReport};
use anyhow::Result;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Self-monitoring of the sampling loop, one series per instance.
#[derive(Clone)]
pub struct CycleStats {
    cycle_duration_seconds: HistogramVec,
    cycle_errors_total: CounterVec,
    last_cycle_timestamp: GaugeVec,
    last_cycle_success: GaugeVec,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let cycle_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "mysql_sampler_cycle_duration_seconds",
                "Time spent in one sampling cycle in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["instance"],
        )
        .expect("mysql_sampler_cycle_duration_seconds");

        let cycle_errors_total = CounterVec::new(
            Opts::new(
                "mysql_sampler_cycle_errors_total",
                "Failed cycles and sub-queries per instance and phase",
            ),
            &["instance", "phase"],
        )
        .expect("mysql_sampler_cycle_errors_total");

        let last_cycle_timestamp = GaugeVec::new(
            Opts::new(
                "mysql_sampler_last_cycle_timestamp_seconds",
                "Unix timestamp of the last cycle attempt per instance",
            ),
            &["instance"],
        )
        .expect("mysql_sampler_last_cycle_timestamp_seconds");

        let last_cycle_success = GaugeVec::new(
            Opts::new(
                "mysql_sampler_last_cycle_success",
                "Whether the last cycle got past the status query (1=success, 0=failure)",
            ),
            &["instance"],
        )
        .expect("mysql_sampler_last_cycle_success");

        Self {
            cycle_duration_seconds,
            cycle_errors_total,
            last_cycle_timestamp,
            last_cycle_success,
        }
    }

    #[must_use]
    pub fn start_cycle(&self, instance: &str) -> CycleTimer {
        CycleTimer {
            instance: instance.to_string(),
            start: Instant::now(),
            stats: self.clone(),
        }
    }

    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.cycle_duration_seconds.clone()))?;
        registry.register(Box::new(self.cycle_errors_total.clone()))?;
        registry.register(Box::new(self.last_cycle_timestamp.clone()))?;
        registry.register(Box::new(self.last_cycle_success.clone()))?;
        Ok(())
    }

    fn record(&self, instance: &str, duration: f64, success: bool) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        self.cycle_duration_seconds
            .with_label_values(&[instance])
            .observe(duration);

        self.last_cycle_timestamp
            .with_label_values(&[instance])
            .set(timestamp);

        self.last_cycle_success
            .with_label_values(&[instance])
            .set(if success { 1.0 } else { 0.0 });
    }

    fn count_error(&self, instance: &str, phase: &str) {
        self.cycle_errors_total
            .with_label_values(&[instance, phase])
            .inc();
    }
}

/// Measures one cycle; finish it with [`CycleTimer::finish`].
#[must_use]
pub struct CycleTimer {
    instance: String,
    start: Instant,
    stats: CycleStats,
}

impl CycleTimer {
    /// Record the outcome. Sub-query failures count as errors in their own
    /// phase without failing the cycle.
    pub fn finish(self, outcome: &Result<CycleReport, CycleError>) {
        let duration = self.start.elapsed().as_secs_f64();

        match outcome {
            Ok(report) => {
                for (sub_query, _) in report.failures() {
                    self.stats.count_error(&self.instance, sub_query.as_str());
                }
                self.stats.record(&self.instance, duration, true);
            }
            Err(e) => {
                self.stats.count_error(&self.instance, e.phase());
                self.stats.record(&self.instance, duration, false);
            }
        }
    }
}
