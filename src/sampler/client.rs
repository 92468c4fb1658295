//! Database client capability consumed by the sampler.
//!
//! The sampler only needs five primitives: connect, ping, query, the
//! negotiated server version, and close. They are expressed as two object-safe
//! traits so the cycle logic can be driven by the `sqlx` adapter in
//! production and by a scripted fake in tests.

use super::error::{ConnectionError, QueryError};
use futures::future::BoxFuture;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// One raw row; `None` is SQL `NULL`.
pub type Row = Vec<Option<String>>;

/// A fully materialized query result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: usize,
    rows: Vec<Row>,
}

impl ResultSet {
    #[must_use]
    pub const fn new(columns: usize, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result from string literals, mostly useful in tests.
    #[must_use]
    pub fn from_rows<const N: usize>(rows: &[[&str; N]]) -> Self {
        Self {
            columns: N,
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Some((*v).to_string())).collect())
                .collect(),
        }
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Iterate `(key, value)` pairs from the first two columns. Rows with a
    /// `NULL` key are skipped, a `NULL` value reads as the empty string.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().filter_map(|row| {
            let key = row.first()?.as_deref()?;
            let value = row.get(1).and_then(Option::as_deref).unwrap_or("");
            Some((key, value))
        })
    }
}

/// TLS material as given in the configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TlsParams {
    pub key: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub ca: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    pub cipher: Option<String>,
}

impl TlsParams {
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.key.is_some()
            || self.cert.is_some()
            || self.ca.is_some()
            || self.ca_path.is_some()
            || self.cipher.is_some()
    }
}

/// Everything needed to open a session.
#[derive(Debug, Default)]
pub struct ConnectParams {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub database: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<PathBuf>,
    /// Zero disables the timeout.
    pub connect_timeout: Duration,
    pub tls: TlsParams,
}

impl ConnectParams {
    /// Host used in diagnostics.
    #[must_use]
    pub fn display_host(&self) -> &str {
        match self.host.as_deref() {
            Some(h) if !h.is_empty() => h,
            _ => "localhost",
        }
    }

    /// Database used in diagnostics.
    #[must_use]
    pub fn display_database(&self) -> &str {
        self.database.as_deref().unwrap_or("<none>")
    }
}

/// A live session with one server.
pub trait Session: Send {
    /// Liveness probe; `false` means the session must be discarded.
    fn ping(&mut self) -> BoxFuture<'_, bool>;

    fn query<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<ResultSet, QueryError>>;

    /// Server version as `major * 10000 + minor * 100 + patch`.
    fn server_version(&self) -> u64;

    /// Negotiated TLS cipher, if the session is encrypted.
    fn tls_cipher(&self) -> Option<&str> {
        None
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

pub trait DatabaseClient: Send + Sync {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectParams,
    ) -> BoxFuture<'a, Result<Box<dyn Session>, ConnectionError>>;
}
