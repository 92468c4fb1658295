//! Periodic MySQL/MariaDB health sampler.
//!
//! Every configured instance is polled on its own interval: global status,
//! InnoDB metrics, binlog position, replica state and Galera cluster status.
//! Results go to a [`sink::MetricSink`] (Prometheus by default) and
//! replication state changes to a [`sink::Notifier`].

pub mod cli;
pub mod config;
pub mod exporter;
pub mod sampler;
pub mod sink;

#[allow(clippy::pedantic)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
