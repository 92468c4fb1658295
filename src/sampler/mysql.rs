//! `sqlx`-backed implementation of [`DatabaseClient`].

use super::client::{ConnectParams, DatabaseClient, ResultSet, Row as RawRow, Session};
use super::error::{ConnectionError, QueryError};
use super::version::{format_version, parse_version};
use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{ConnectOptions as _, Connection as _, Executor, Row as _};
use tracing::{debug, info_span, warn};
use tracing_futures::Instrument as _;

/// Opens one dedicated `MySqlConnection` per session (no pool: every
/// instance owns exactly one connection).
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlxClient;

impl SqlxClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Translate connection parameters into `sqlx` options.
#[must_use]
pub fn connect_options(params: &ConnectParams) -> MySqlConnectOptions {
    let mut opts = MySqlConnectOptions::new();

    if let Some(host) = params.host.as_deref().filter(|h| !h.is_empty()) {
        opts = opts.host(host);
    }
    if let Some(port) = params.port {
        opts = opts.port(port);
    }
    if let Some(socket) = &params.socket {
        opts = opts.socket(socket);
    }
    if let Some(user) = &params.user {
        opts = opts.username(user);
    }
    if let Some(password) = &params.password {
        opts = opts.password(password.expose_secret());
    }
    if let Some(database) = &params.database {
        opts = opts.database(database);
    }

    let tls = &params.tls;
    opts = opts.ssl_mode(ssl_mode(params));
    if let Some(ca) = &tls.ca {
        opts = opts.ssl_ca(ca);
    }
    if let Some(cert) = &tls.cert {
        opts = opts.ssl_client_cert(cert);
    }
    if let Some(key) = &tls.key {
        opts = opts.ssl_client_key(key);
    }

    opts.disable_statement_logging()
}

/// CA given: verify it. Client key or cert only: require TLS. Otherwise let
/// the server decide.
#[must_use]
pub const fn ssl_mode(params: &ConnectParams) -> MySqlSslMode {
    let tls = &params.tls;
    if tls.ca.is_some() {
        MySqlSslMode::VerifyCa
    } else if tls.key.is_some() || tls.cert.is_some() {
        MySqlSslMode::Required
    } else {
        MySqlSslMode::Preferred
    }
}

impl DatabaseClient for SqlxClient {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectParams,
    ) -> BoxFuture<'a, Result<Box<dyn Session>, ConnectionError>> {
        Box::pin(async move {
            let host = params.display_host().to_string();
            let database = params.display_database().to_string();

            if params.tls.ca_path.is_some() {
                warn!(host = %host, "tls.ca_path is not supported by the rustls client, ignoring");
            }
            if params.tls.cipher.is_some() {
                warn!(host = %host, "tls.cipher is not supported by the rustls client, ignoring");
            }

            let opts = connect_options(params);
            let connecting = opts.connect();

            let result = if params.connect_timeout.is_zero() {
                connecting.await
            } else {
                match tokio::time::timeout(params.connect_timeout, connecting).await {
                    Ok(result) => result,
                    Err(_) => {
                        return Err(ConnectionError::Timeout {
                            host,
                            database,
                            timeout_secs: params.connect_timeout.as_secs(),
                        });
                    }
                }
            };

            let mut conn = result.map_err(|e| ConnectionError::Connect {
                host: host.clone(),
                database: database.clone(),
                reason: e.to_string(),
            })?;

            let version: String = sqlx::query_scalar("SELECT VERSION()")
                .fetch_one(&mut conn)
                .await
                .map_err(|e| ConnectionError::Handshake {
                    host: host.clone(),
                    reason: e.to_string(),
                })?;

            let cipher = fetch_cipher(&mut conn).await;
            let version = parse_version(&version);

            debug!(
                host = %host,
                server_version = %format_version(version),
                "session opened"
            );

            Ok(Box::new(SqlxSession {
                conn,
                version,
                cipher,
            }) as Box<dyn Session>)
        })
    }
}

/// Best effort: an unencrypted session reports an empty cipher.
async fn fetch_cipher(conn: &mut MySqlConnection) -> Option<String> {
    let query = sqlx::raw_sql("SHOW STATUS LIKE 'Ssl_cipher'");
    let rows = match Executor::fetch_all(&mut *conn, query).await {
        Ok(rows) => rows,
        Err(e) => {
            debug!(error = %e, "could not read Ssl_cipher");
            return None;
        }
    };

    rows.first()
        .and_then(|row| decode(row, 1))
        .filter(|c| !c.is_empty())
}

struct SqlxSession {
    conn: MySqlConnection,
    version: u64,
    cipher: Option<String>,
}

impl Session for SqlxSession {
    fn ping(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.conn.ping().await {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "ping failed");
                    false
                }
            }
        })
    }

    fn query<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<ResultSet, QueryError>> {
        Box::pin(async move {
            // Text protocol: SHOW statements are not preparable on every server.
            let rows = Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql))
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) => QueryError::Rejected {
                        query: sql.to_string(),
                        reason: db.to_string(),
                    },
                    other => QueryError::Materialize {
                        query: sql.to_string(),
                        reason: other.to_string(),
                    },
                })?;

            let columns = rows.first().map_or(0, |row| row.columns().len());
            let rows = rows
                .iter()
                .map(|row| (0..row.columns().len()).map(|i| decode(row, i)).collect::<RawRow>())
                .collect();

            Ok(ResultSet::new(columns, rows))
        })
    }

    fn server_version(&self) -> u64 {
        self.version
    }

    fn tls_cipher(&self) -> Option<&str> {
        self.cipher.as_deref()
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        let span = info_span!("db.close", db.system = "mysql");
        Box::pin(
            async move {
                if let Err(e) = self.conn.close().await {
                    debug!(error = %e, "error while closing connection");
                }
            }
            .instrument(span),
        )
    }
}

/// Every column is read as text. Values that are not valid UTF-8 (binary
/// columns) are converted lossily.
fn decode(row: &MySqlRow, index: usize) -> Option<String> {
    match row.try_get_unchecked::<Option<String>, _>(index) {
        Ok(value) => value,
        Err(_) => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    }
}
