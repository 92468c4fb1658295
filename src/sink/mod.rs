//! Emission boundary: what the sampler hands to the outside world.
//!
//! The sampler never knows where data ends up. It produces [`Emission`]s and
//! [`Notification`]s and passes them, together with the instance [`Tags`], to
//! a [`MetricSink`] or [`Notifier`]. Submission is fire-and-forget: sinks do
//! not report failures back to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub mod memory;
pub mod notify;
pub mod prometheus;

pub use memory::{MemoryNotifier, MemorySink};
pub use notify::LogNotifier;
pub use prometheus::PrometheusSink;

/// Value carried by an emission.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Instantaneous level.
    Gauge(f64),
    /// Monotonically increasing counter; consumers derive a rate from it.
    Derive(i64),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Derive(_) => MetricKind::Derive,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Derive,
}

/// One data point: series, optional sub-label, value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Emission {
    pub series: &'static str,
    pub label: Option<String>,
    #[serde(flatten)]
    pub value: Value,
}

impl Emission {
    #[must_use]
    pub fn gauge(series: &'static str, label: Option<&str>, value: f64) -> Self {
        Self {
            series,
            label: label.map(str::to_string),
            value: Value::Gauge(value),
        }
    }

    #[must_use]
    pub fn derive(series: &'static str, label: Option<&str>, value: i64) -> Self {
        Self {
            series,
            label: label.map(str::to_string),
            value: Value::Derive(value),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

/// Host and instance tags attached to everything an instance emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tags {
    pub host: String,
    pub instance: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Okay,
    Warning,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Okay => "okay",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-shot alert.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: &'static str,
    pub time: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn new(severity: Severity, message: &'static str) -> Self {
        Self {
            severity,
            message,
            time: Utc::now(),
        }
    }
}

pub trait MetricSink: Send + Sync {
    fn emit(&self, tags: &Tags, emission: &Emission);

    fn emit_all(&self, tags: &Tags, emissions: &[Emission]) {
        for emission in emissions {
            self.emit(tags, emission);
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, tags: &Tags, notification: &Notification);
}
