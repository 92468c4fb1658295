#![allow(dead_code)]

use futures::future::BoxFuture;
use mysql_sampler::config::{Config, parse_config};
use mysql_sampler::sampler::{
    ConnectParams, ConnectionError, DatabaseClient, Features, Instance, QueryError, ResultSet,
    Session,
};
use mysql_sampler::sampler::query::{
    SHOW_GLOBAL_STATUS, SHOW_MASTER_STATUS, SHOW_SLAVE_STATUS, SHOW_WSREP_STATUS,
};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Column count of `SHOW SLAVE STATUS` used by the scripted replica rows.
pub const REPLICA_COLUMNS: usize = 33;

#[derive(Clone)]
enum Response {
    Rows(ResultSet),
    Reject(String),
}

/// Shared, scriptable server state behind [`FakeClient`].
#[derive(Default)]
pub struct FakeServer {
    pub connects: AtomicUsize,
    pub pings: AtomicUsize,
    pub closes: AtomicUsize,
    refuse_connect: AtomicBool,
    ping_fails: AtomicBool,
    version: AtomicU64,
    responses: Mutex<HashMap<String, Response>>,
    queries: Mutex<Vec<String>>,
}

impl FakeServer {
    pub fn new(version: u64) -> Arc<Self> {
        let server = Self::default();
        server.version.store(version, Ordering::SeqCst);
        Arc::new(server)
    }

    pub fn respond(&self, query: &str, result: ResultSet) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Response::Rows(result));
    }

    pub fn reject(&self, query: &str, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Response::Reject(reason.to_string()));
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_ping(&self, fail: bool) {
        self.ping_fails.store(fail, Ordering::SeqCst);
    }

    pub fn set_version(&self, version: u64) {
        self.version.store(version, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn clear_queries(&self) {
        self.queries.lock().unwrap().clear();
    }

    fn answer(&self, sql: &str) -> Result<ResultSet, QueryError> {
        self.queries.lock().unwrap().push(sql.to_string());
        match self.responses.lock().unwrap().get(sql).cloned() {
            Some(Response::Rows(result)) => Ok(result),
            Some(Response::Reject(reason)) => Err(QueryError::Rejected {
                query: sql.to_string(),
                reason,
            }),
            None => Ok(ResultSet::default()),
        }
    }
}

pub struct FakeClient {
    pub server: Arc<FakeServer>,
}

impl FakeClient {
    pub fn new(server: &Arc<FakeServer>) -> Arc<Self> {
        Arc::new(Self {
            server: Arc::clone(server),
        })
    }
}

impl DatabaseClient for FakeClient {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectParams,
    ) -> BoxFuture<'a, Result<Box<dyn Session>, ConnectionError>> {
        Box::pin(async move {
            self.server.connects.fetch_add(1, Ordering::SeqCst);
            if self.server.refuse_connect.load(Ordering::SeqCst) {
                return Err(ConnectionError::Connect {
                    host: params.display_host().to_string(),
                    database: params.display_database().to_string(),
                    reason: "Connection refused".to_string(),
                });
            }
            let session: Box<dyn Session> = Box::new(FakeSession {
                server: Arc::clone(&self.server),
                version: self.server.version.load(Ordering::SeqCst),
            });
            Ok(session)
        })
    }
}

struct FakeSession {
    server: Arc<FakeServer>,
    version: u64,
}

impl Session for FakeSession {
    fn ping(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.server.pings.fetch_add(1, Ordering::SeqCst);
            !self.server.ping_fails.load(Ordering::SeqCst)
        })
    }

    fn query<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<ResultSet, QueryError>> {
        Box::pin(async move { self.server.answer(sql) })
    }

    fn server_version(&self) -> u64 {
        self.version
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.server.closes.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Status rows as `SHOW GLOBAL STATUS` returns them.
pub fn status(pairs: &[(&str, &str)]) -> ResultSet {
    ResultSet::new(
        2,
        pairs
            .iter()
            .map(|(k, v)| vec![Some((*k).to_string()), Some((*v).to_string())])
            .collect(),
    )
}

/// A `SHOW SLAVE STATUS` row with the given thread states and lag.
pub fn replica_status(io: &str, sql: &str, lag: Option<&str>) -> ResultSet {
    let mut row = vec![Some(String::new()); REPLICA_COLUMNS];
    for (index, value) in [
        (6, Some("1200")),
        (10, Some(io)),
        (11, Some(sql)),
        (21, Some("1100")),
        (32, lag),
    ] {
        if let Some(slot) = row.get_mut(index) {
            *slot = value.map(str::to_string);
        }
    }
    ResultSet::new(REPLICA_COLUMNS, vec![row])
}

/// Server answering every query a fully enabled instance sends.
pub fn healthy_server(version: u64) -> Arc<FakeServer> {
    let server = FakeServer::new(version);
    server.respond(
        SHOW_GLOBAL_STATUS,
        status(&[
            ("Uptime", "3600"),
            ("Com_select", "42"),
            ("Threads_connected", "5"),
            ("Threads_running", "2"),
            ("Bytes_received", "1000"),
            ("Bytes_sent", "2000"),
        ]),
    );
    server.respond(
        SHOW_MASTER_STATUS,
        ResultSet::from_rows(&[["log-bin.000123", "4096", "", ""]]),
    );
    server.respond(SHOW_SLAVE_STATUS, replica_status("Yes", "Yes", Some("0")));
    server.respond(
        SHOW_WSREP_STATUS,
        status(&[("wsrep_local_recv_queue", "3"), ("wsrep_apply_oooe", "0.5")]),
    );
    server
}

pub fn instance(features: Features) -> Instance {
    Instance::new(
        "db1",
        "db1.example.com",
        features,
        ConnectParams {
            host: Some("db1.example.com".to_string()),
            user: Some("monitor".to_string()),
            ..ConnectParams::default()
        },
    )
}

pub const ALL_FEATURES: Features = Features {
    primary_stats: true,
    replica_stats: true,
    innodb_stats: true,
    wsrep_stats: true,
    replica_notifications: true,
};

/// Single-instance configuration polling every second.
pub fn test_config() -> Config {
    parse_config(
        r#"
interval = 1

[[instance]]
name = "db1"
host = "db1.example.com"
user = "monitor"
primary_stats = true
"#,
    )
    .expect("test configuration should parse")
}

/// Get an available port for testing
pub fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Build test URL for HTTP requests
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Wait for server to be ready
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}
