use thiserror::Error;

/// Opening (or re-opening) a session failed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to database {database} at server {host}: {reason}")]
    Connect {
        host: String,
        database: String,
        reason: String,
    },

    #[error("timed out after {timeout_secs}s connecting to database {database} at server {host}")]
    Timeout {
        host: String,
        database: String,
        timeout_secs: u64,
    },

    #[error("connected to {host} but could not determine server version: {reason}")]
    Handshake { host: String, reason: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    /// The server refused the statement (syntax, privileges, unknown table).
    #[error("failed to execute query `{query}`: {reason}")]
    Rejected { query: String, reason: String },

    /// The statement ran but its result could not be fetched or decoded.
    #[error("failed to store result of query `{query}`: {reason}")]
    Materialize { query: String, reason: String },
}

/// The result does not have the shape the classifier relies on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("`{query}` did not return any rows")]
    NoRows { query: &'static str },

    #[error("`{query}` returned {actual} columns, at least {expected} are required")]
    TooFewColumns {
        query: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Failure of one sub-query within a cycle.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure that ends a cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("status query failed: {0}")]
    Status(#[source] QueryError),
}

impl CycleError {
    /// Phase label used in logs and self-monitoring metrics.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connect",
            Self::Status(_) => "status",
        }
    }
}
