//! The sampling engine.
//!
//! An [`Instance`] owns its connection and replication state; a [`Sampler`]
//! runs cycles against it and hands the results to the sinks.

pub mod classify;
pub mod client;
pub mod connection;
pub mod cycle;
pub mod error;
pub mod instance;
pub mod mysql;
pub mod query;
pub mod replication;
pub mod version;

pub use client::{ConnectParams, DatabaseClient, ResultSet, Session, TlsParams};
pub use connection::ConnectionManager;
pub use cycle::{CycleReport, Sampler, SubQuery, SubQueryOutcome};
pub use error::{ConnectionError, CycleError, QueryError, SampleError, SchemaError};
pub use instance::{Features, Instance, host_tag};
pub use mysql::SqlxClient;
pub use replication::ReplicationWatcher;
pub use version::{format_version, parse_version};
