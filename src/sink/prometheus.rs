use super::{Emission, MetricKind, MetricSink, Tags, Value};
use anyhow::Result;
use prometheus::{GaugeVec, IntCounter, IntCounterVec, Opts, Registry};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

const LABELS: &[&str] = &["host", "instance", "type_instance"];

#[derive(Clone)]
enum Family {
    Gauge(GaugeVec),
    Counter(IntCounterVec),
}

/// Sink that exposes emissions as Prometheus metric families.
///
/// Families are created lazily, one per (series, kind). Gauges map onto
/// `GaugeVec`; derive values onto `IntCounterVec` with a `_total` suffix, the
/// counter following the server-side value (a decrease resets it).
pub struct PrometheusSink {
    registry: Registry,
    families: RwLock<HashMap<String, Family>>,
}

impl PrometheusSink {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            families: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    fn family(&self, series: &str, kind: MetricKind) -> Result<Family> {
        let name = family_name(series, kind);

        {
            let families = match self.families.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(family) = families.get(&name) {
                return Ok(family.clone());
            }
        }

        let mut families = match self.families.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("metric family map lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if let Some(family) = families.get(&name) {
            return Ok(family.clone());
        }

        let help = format!("MySQL {series} ({})", kind_str(kind));
        let family = match kind {
            MetricKind::Gauge => {
                let vec = GaugeVec::new(Opts::new(name.as_str(), help), LABELS)?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Gauge(vec)
            }
            MetricKind::Derive => {
                let vec = IntCounterVec::new(Opts::new(name.as_str(), help), LABELS)?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Counter(vec)
            }
        };

        debug!(family = %name, "registered metric family");
        families.insert(name, family.clone());
        Ok(family)
    }
}

impl MetricSink for PrometheusSink {
    fn emit(&self, tags: &Tags, emission: &Emission) {
        let family = match self.family(emission.series, emission.kind()) {
            Ok(family) => family,
            Err(e) => {
                warn!(series = emission.series, error = %e, "failed to register metric family");
                return;
            }
        };

        let labels = [
            tags.host.as_str(),
            tags.instance.as_str(),
            emission.label.as_deref().unwrap_or(""),
        ];

        match (family, emission.value) {
            (Family::Gauge(vec), Value::Gauge(v)) => vec.with_label_values(&labels).set(v),
            (Family::Counter(vec), Value::Derive(v)) => {
                if let Ok(v) = u64::try_from(v) {
                    set_counter(&vec.with_label_values(&labels), v);
                }
            }
            _ => debug!(series = emission.series, "kind mismatch between family and value"),
        }
    }
}

/// Move the counter to `value`, resetting it when the server-side value went
/// backwards (server restart or `FLUSH STATUS`).
fn set_counter(counter: &IntCounter, value: u64) {
    let current = counter.get();
    if value >= current {
        counter.inc_by(value - current);
    } else {
        counter.reset();
        counter.inc_by(value);
    }
}

const fn kind_str(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Gauge => "gauge",
        MetricKind::Derive => "counter",
    }
}

/// `mysql_commands` + derive → `mysql_commands_total`; `uptime` + gauge →
/// `mysql_uptime`.
#[must_use]
pub fn family_name(series: &str, kind: MetricKind) -> String {
    let base = series.strip_prefix("mysql_").unwrap_or(series);
    match kind {
        MetricKind::Gauge => format!("mysql_{base}"),
        MetricKind::Derive => format!("mysql_{base}_total"),
    }
}
