// src/server/routes.rs

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::engine::StopOutcome;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt must not be empty");
    }

    match state.orchestrator.submit(prompt) {
        Ok(job_id) => (
            [(header::CACHE_CONTROL, "no-cache")],
            Json(GenerateResponse { job_id }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to submit job");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn stream(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let frames = state
        .orchestrator
        .attach(&job_id)
        .map(Ok::<_, Infallible>);

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

pub async fn stop(State(state): State<AppState>, Json(request): Json<StopRequest>) -> Json<serde_json::Value> {
    match state.orchestrator.stop(&request.job_id) {
        StopOutcome::Stopped => Json(json!({"ok": true})),
        StopOutcome::NotRunning => Json(json!({
            "ok": true,
            "message": "job already finished or unknown",
        })),
    }
}

pub async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.orchestrator.status(&job_id) {
        Some(status) => Json(status).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("unknown job {job_id}")),
    }
}
