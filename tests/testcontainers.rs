#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(unsafe_code)]

use mysql_sampler::sampler::{
    ConnectParams, Features, Instance, SampleError, Sampler, SchemaError, SqlxClient, SubQuery,
};
use mysql_sampler::sink::{MemoryNotifier, MemorySink};
use nix::unistd::geteuid;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use testcontainers_modules::mariadb::Mariadb;
use testcontainers_modules::testcontainers::{core::IntoContainerPort, runners::AsyncRunner};

fn socket_exists(host: &str) -> bool {
    if let Some(path) = host.strip_prefix("unix://") {
        Path::new(path).exists()
    } else {
        true
    }
}

fn find_container_runtime() -> Option<String> {
    if let Ok(existing) = env::var("DOCKER_HOST")
        && !existing.is_empty()
        && socket_exists(&existing)
    {
        return Some(existing);
    }

    // Podman first, then Docker.
    let uid = geteuid().as_raw();
    let candidates = [
        format!("unix:///run/user/{uid}/podman/podman.sock"),
        "unix:///run/podman/podman.sock".to_string(),
        "unix:///var/run/podman/podman.sock".to_string(),
        "unix:///var/run/docker.sock".to_string(),
    ];

    candidates.into_iter().find(|c| socket_exists(c))
}

#[tokio::test]
async fn sample_mariadb_container() -> anyhow::Result<()> {
    let Some(docker_host) = find_container_runtime() else {
        eprintln!(
            "No container runtime socket found (checked Podman + Docker), skipping container integration test"
        );
        return Ok(());
    };

    // Single-threaded test setup, nothing else reads the environment yet.
    unsafe { env::set_var("DOCKER_HOST", &docker_host) };

    let container = match Mariadb::default().start().await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("Skipping container integration test: {e}");
            return Ok(());
        }
    };

    let port = container.get_host_port_ipv4(3306.tcp()).await?;
    let host = container.get_host().await?;

    let mut instance = Instance::new(
        "container",
        "container",
        Features {
            primary_stats: false,
            replica_stats: true,
            innodb_stats: true,
            wsrep_stats: false,
            replica_notifications: false,
        },
        ConnectParams {
            host: Some(host.to_string()),
            user: Some("root".to_string()),
            database: Some("test".to_string()),
            port: Some(port),
            connect_timeout: Duration::from_secs(20),
            ..ConnectParams::default()
        },
    );

    let sink = Arc::new(MemorySink::new());
    let sampler = Sampler::new(
        Arc::new(SqlxClient::new()),
        sink.clone(),
        Arc::new(MemoryNotifier::new()),
    );

    let report = sampler.run_cycle(&mut instance).await?;

    assert!(
        report.server_version >= 100_000,
        "unexpected server version {}",
        report.server_version
    );
    assert!(instance.is_connected());

    let emissions = sink.emissions();
    assert!(
        emissions.iter().any(|e| e.series == "uptime"),
        "should include uptime"
    );
    assert!(
        emissions.iter().any(|e| e.series == "mysql_octets"),
        "should include traffic counters"
    );

    assert!(
        matches!(report.outcome(SubQuery::Innodb), Some(Ok(n)) if *n > 0),
        "innodb_metrics should produce values"
    );

    // not a replica
    assert!(matches!(
        report.outcome(SubQuery::Replication),
        Some(Err(SampleError::Schema(SchemaError::NoRows { .. })))
    ));

    // second cycle reuses the session
    let second = sampler.run_cycle(&mut instance).await?;
    assert_eq!(second.server_version, report.server_version);

    instance.close().await;
    assert!(!instance.is_connected());

    Ok(())
}
