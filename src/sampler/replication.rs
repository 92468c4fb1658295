//! Primary/replica status parsing and edge-triggered replication alerts.

use super::classify::{parse_counter, parse_gauge};
use super::client::{ResultSet, Row};
use super::error::SchemaError;
use super::instance::Features;
use super::query::{SHOW_MASTER_STATUS, SHOW_SLAVE_STATUS, single_row};
use crate::sink::{Emission, Notification, Severity};

pub const PRIMARY_STATUS_MIN_COLUMNS: usize = 2;
pub const REPLICA_STATUS_MIN_COLUMNS: usize = 33;

// Positional columns of SHOW SLAVE STATUS.
const READ_POSITION: usize = 6;
const IO_RUNNING: usize = 10;
const SQL_RUNNING: usize = 11;
const EXEC_POSITION: usize = 21;
const SECONDS_BEHIND: usize = 32;

pub const IO_STOPPED: &str = "replica I/O thread not started or not connected to primary";
pub const IO_STARTED: &str = "replica I/O thread started and connected to primary";
pub const SQL_STOPPED: &str = "replica SQL thread not started";
pub const SQL_STARTED: &str = "replica SQL thread started";

/// What one replica status row produced.
#[derive(Debug, Default)]
pub struct Observation {
    pub emissions: Vec<Emission>,
    pub notifications: Vec<Notification>,
}

/// Remembers the last observed state of the replica threads so that only
/// transitions raise notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationWatcher {
    io_running: bool,
    sql_running: bool,
}

impl Default for ReplicationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicationWatcher {
    /// Both threads start out as running, so a replica that is already broken
    /// on the first cycle still produces a warning.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            io_running: true,
            sql_running: true,
        }
    }

    #[must_use]
    pub const fn io_running(&self) -> bool {
        self.io_running
    }

    #[must_use]
    pub const fn sql_running(&self) -> bool {
        self.sql_running
    }

    /// Process the result of `SHOW SLAVE STATUS`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the result is empty or has fewer than
    /// [`REPLICA_STATUS_MIN_COLUMNS`] columns. Stored state is left untouched.
    pub fn observe(
        &mut self,
        result: &ResultSet,
        features: &Features,
    ) -> Result<Observation, SchemaError> {
        let row = single_row(result, SHOW_SLAVE_STATUS, REPLICA_STATUS_MIN_COLUMNS)?;
        let mut observation = Observation::default();

        let io = is_yes(column(row, IO_RUNNING));
        let sql = is_yes(column(row, SQL_RUNNING));

        if features.replica_stats {
            let out = &mut observation.emissions;
            out.push(Emission::gauge(
                "bool",
                Some("replica-sql-running"),
                if sql { 1.0 } else { 0.0 },
            ));
            out.push(Emission::gauge(
                "bool",
                Some("replica-io-running"),
                if io { 1.0 } else { 0.0 },
            ));
            out.push(Emission::derive(
                "mysql_log_position",
                Some("replica-read"),
                column(row, READ_POSITION).map_or(0, parse_counter),
            ));
            out.push(Emission::derive(
                "mysql_log_position",
                Some("replica-exec"),
                column(row, EXEC_POSITION).map_or(0, parse_counter),
            ));
            if let Some(lag) = column(row, SECONDS_BEHIND) {
                out.push(Emission::gauge("time_offset", None, parse_gauge(lag)));
            }
        }

        if features.replica_notifications {
            let notes = &mut observation.notifications;
            notes.extend(transition(&mut self.io_running, io, IO_STOPPED, IO_STARTED));
            notes.extend(transition(&mut self.sql_running, sql, SQL_STOPPED, SQL_STARTED));
        }

        Ok(observation)
    }
}

fn transition(
    stored: &mut bool,
    running: bool,
    stopped: &'static str,
    started: &'static str,
) -> Option<Notification> {
    match (*stored, running) {
        (true, false) => {
            *stored = false;
            Some(Notification::new(Severity::Warning, stopped))
        }
        (false, true) => {
            *stored = true;
            Some(Notification::new(Severity::Okay, started))
        }
        _ => None,
    }
}

/// Binlog position of a primary, from `SHOW MASTER STATUS`.
///
/// # Errors
///
/// Returns a [`SchemaError`] if the result is empty or narrower than two
/// columns.
pub fn primary_position(result: &ResultSet) -> Result<Emission, SchemaError> {
    let row = single_row(result, SHOW_MASTER_STATUS, PRIMARY_STATUS_MIN_COLUMNS)?;
    Ok(Emission::derive(
        "mysql_log_position",
        Some("primary-binlog"),
        column(row, 1).map_or(0, parse_counter),
    ))
}

fn column(row: &Row, index: usize) -> Option<&str> {
    row.get(index).and_then(Option::as_deref)
}

fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("yes"))
}
