use super::client::{ConnectParams, DatabaseClient, Session};
use super::error::ConnectionError;
use super::version::format_version;
use tracing::{info, instrument, warn};

/// Owns the single session of one instance.
///
/// The session is opened lazily on the first [`acquire`](Self::acquire),
/// probed before every later use, and rebuilt when the probe fails. There is
/// no retry here: a failed connect is reported and the next cycle tries
/// again.
pub struct ConnectionManager {
    params: ConnectParams,
    session: Option<Box<dyn Session>>,
    server_version: u64,
}

impl ConnectionManager {
    #[must_use]
    pub const fn new(params: ConnectParams) -> Self {
        Self {
            params,
            session: None,
            server_version: 0,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Version recorded at the last successful connect, 0 if never connected.
    #[must_use]
    pub const fn server_version(&self) -> u64 {
        self.server_version
    }

    /// Return a live session, reconnecting if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if a new session cannot be opened. The
    /// manager is left disconnected.
    #[instrument(skip(self, client), level = "debug", fields(host = %self.params.display_host()))]
    pub async fn acquire(
        &mut self,
        client: &dyn DatabaseClient,
    ) -> Result<&mut dyn Session, ConnectionError> {
        let alive = match self.session.as_mut() {
            Some(session) => session.ping().await,
            None => false,
        };

        if !alive {
            if let Some(stale) = self.session.take() {
                warn!(
                    host = %self.params.display_host(),
                    "lost connection to database, reconnecting"
                );
                stale.close().await;
            }

            let session = client.connect(&self.params).await?;
            self.server_version = session.server_version();
            info!(
                host = %self.params.display_host(),
                database = %self.params.display_database(),
                cipher = session.tls_cipher().unwrap_or("<none>"),
                server_version = %format_version(self.server_version),
                "connected to database"
            );
            self.session = Some(session);
        }

        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(ConnectionError::Connect {
                host: self.params.display_host().to_string(),
                database: self.params.display_database().to_string(),
                reason: "no session available".to_string(),
            }),
        }
    }

    /// Close the session, if any. Used at shutdown.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
