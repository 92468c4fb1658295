//! HTTP exposition and the per-instance sampling tasks behind it.

pub mod health;
pub mod scheduler;
pub mod stats;

use crate::{
    built_info,
    config::{Config, local_hostname},
    sampler::{DatabaseClient, Instance, Sampler, SqlxClient},
    sink::{LogNotifier, PrometheusSink},
};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use health::HealthBoard;
use prometheus::{Encoder, Registry, TextEncoder};
use scheduler::Scheduler;
use serde_json::json;
use stats::CycleStats;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, info_span};
use ulid::Ulid;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct AppState {
    registry: Registry,
    health: HealthBoard,
}

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Start sampling every configured instance and serve `/metrics` and
/// `/health` until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, listen: Option<String>, config: Config) -> Result<()> {
    run(
        port,
        listen,
        config,
        Arc::new(SqlxClient::new()),
        shutdown_signal(),
    )
    .await
}

/// Same as [`new`] with an explicit database client and shutdown future.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run<F>(
    port: u16,
    listen: Option<String>,
    config: Config,
    client: Arc<dyn DatabaseClient>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = Registry::new();

    let notifier = LogNotifier::new();
    notifier.register(&registry)?;

    let stats = CycleStats::new();
    stats.register(&registry)?;

    let sink = PrometheusSink::new(registry.clone());
    let sampler = Sampler::new(client, Arc::new(sink), Arc::new(notifier));

    let default_interval = config.default_interval();
    let instances = config.into_instances(&local_hostname());
    let health = HealthBoard::new(instances.iter().map(Instance::name));

    let listener = bind(port, listen.as_deref()).await?;
    info!("listening on {}", listener.local_addr()?);

    let (stop, stopped) = watch::channel(false);
    let scheduler = Scheduler::new(sampler, stats, health.clone());
    let tasks = scheduler.spawn(instances, default_interval, &stopped);

    let app = router(AppState { registry, health });
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    // let in-flight cycles finish before closing connections
    let _ = stop.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            error!("sampling task failed: {e}");
        }
    }

    info!("shutdown complete");

    served.context("HTTP server error")
}

fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUlid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default();
                        info_span!(
                            "http.request",
                            http.method = %request.method(),
                            http.target = %request.uri(),
                            request_id,
                            otel.kind = "server",
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!("failed to encode metrics: {e}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }

    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buffer).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let instances = state.health.snapshot();
    let down = state.health.is_down();

    let body = json!({
        "status": if down { "down" } else { "ok" },
        "version": built_info::PKG_VERSION,
        "commit": built_info::GIT_COMMIT_HASH_SHORT,
        "instances": &*instances,
    });

    let status = if down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(body)).into_response()
}

/// Bind to `listen`, or to `[::]` falling back to `0.0.0.0` when IPv6 is
/// unavailable.
async fn bind(port: u16, listen: Option<&str>) -> Result<TcpListener> {
    if let Some(addr) = listen {
        let ip: IpAddr = addr
            .parse()
            .with_context(|| format!("invalid listen address: {addr}"))?;
        return TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .with_context(|| format!("failed to bind {addr}:{port}"));
    }

    match TcpListener::bind(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            debug!("IPv6 bind failed ({e}), falling back to IPv4");
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
                .await
                .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_ulid() {
        let request = Request::new(Body::empty());
        let id = MakeRequestUlid.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Ulid::from_string(value).is_ok());
    }

    #[tokio::test]
    async fn test_bind_explicit_address() {
        let listener = bind(0, Some("127.0.0.1")).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        assert!(bind(0, Some("not-an-ip")).await.is_err());
    }

    #[tokio::test]
    async fn test_metrics_handler_content_type() {
        let state = AppState {
            registry: Registry::new(),
            health: HealthBoard::default(),
        };
        let response = metrics_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            prometheus::TEXT_FORMAT
        );
    }
}
