// src/server/mod.rs

//! HTTP surface.
//!
//! | route | handler |
//! |---|---|
//! | `POST /generate` | submit a brief, returns `{"jobId"}` |
//! | `GET /stream/{job_id}` | attach to the job's event stream |
//! | `POST /stop` | stop a job by id |
//! | `GET /jobs/{job_id}` | read-only job status |
//! | `GET /health` | liveness |

pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::engine::Orchestrator;

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the application router.
pub fn router(orchestrator: Arc<Orchestrator>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/generate", post(routes::generate))
        .route("/stream/{job_id}", get(routes::stream))
        .route("/stop", post(routes::stop))
        .route("/jobs/{job_id}", get(routes::job_status))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                error!(origin = %origin, "invalid CORS origin; ignoring");
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}

/// Bind `listen` and serve until `shutdown` resolves.
pub async fn serve<F>(listen: SocketAddr, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    serve_on(listener, app, shutdown).await
}

/// Serve on an already bound listener. Once `shutdown` resolves the server
/// stops accepting and waits for open connections, including attached
/// event streams, to close.
pub async fn serve_on<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(listen = %addr, "contractgen listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server terminated with error")
}
