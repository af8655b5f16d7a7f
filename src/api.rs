//! HTTP surface: status JSON, dashboard page, static assets and workflow triggers.

use crate::error::LaunchError;
use crate::orchestrator::{Supervisor, Workflow};
use crate::status::StatusAggregator;
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const DASHBOARD_PAGE: &str = "dashboard.html";
const MISSING_DASHBOARD: &str = "<h1>Error: dashboard.html not found</h1>";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<StatusAggregator>,
    pub supervisor: Supervisor,
    pub web_dir: Arc<PathBuf>,
}

/// Body of every `/api/run/...` response.
#[derive(Debug, Serialize)]
struct RunResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RunResponse {
    fn accepted(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    fn rejected(error: String) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler).fallback(static_handler))
        .route("/", get(dashboard_handler).fallback(static_handler))
        .route("/dashboard", get(dashboard_handler).fallback(static_handler))
        .route("/api/run/", post(unknown_script).fallback(static_handler))
        .route("/api/run/{*name}", post(run_handler).fallback(static_handler))
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.aggregator.aggregate().await;
    let body = serde_json::to_string_pretty(&snapshot).unwrap_or_else(|e| {
        tracing::error!("failed to encode status snapshot: {e}");
        "{}".to_string()
    });
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}

async fn dashboard_handler(State(state): State<AppState>) -> Response {
    let path = state.web_dir.join(DASHBOARD_PAGE);
    match tokio::fs::read(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::warn!("cannot serve {}: {e}", path.display());
            Html(MISSING_DASHBOARD).into_response()
        }
    }
}

async fn run_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    // Options are accepted for forward compatibility but do not affect the launch.
    if !body.is_empty() {
        if let Err(e) = serde_json::from_slice::<serde_json::Value>(&body) {
            tracing::debug!("ignoring unreadable request body for {name}: {e}");
        }
    }

    let Some(workflow) = Workflow::from_route(&name) else {
        return unknown_script().await;
    };

    let (status, reply) = match state.supervisor.launch_workflow(workflow) {
        Ok(()) => (
            StatusCode::OK,
            RunResponse::accepted(format!(
                "Script {} started in background",
                workflow.script()
            )),
        ),
        Err(e) => {
            if let LaunchError::NotFound { path, .. } = &e {
                tracing::warn!("workflow {name} unavailable: {} missing", path.display());
            }
            (StatusCode::BAD_REQUEST, RunResponse::rejected(e.to_string()))
        }
    };
    (
        status,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(reply),
    )
        .into_response()
}

async fn unknown_script() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(RunResponse::rejected("Unknown script".into())),
    )
        .into_response()
}

/// Serve files from the web directory; anything but GET/HEAD is not found.
async fn static_handler(State(state): State<AppState>, request: Request) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match ServeDir::new(state.web_dir.as_path()).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
