use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use datagrid_core::GridError;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::metrics;
use crate::state::AppState;

pub mod grid;

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    uptime_secs: u64,
    grids: Vec<String>,
    cache_backend: &'static str,
}

async fn health() -> &'static str {
    "ok"
}

async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        grids: state.registry().ids().map(str::to_string).collect(),
        cache_backend: state.grid_context().cache.backend(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cache = &state.grid_context().cache;
    metrics::record_cache_stats(cache.backend(), cache.stats().snapshot());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}

pub fn router(state: AppState) -> Router {
    let prefix = state.route_prefix().to_string();
    let app = Router::new()
        .route("/health", get(health))
        .route("/readyz", get(ready))
        .route("/metrics", get(metrics_handler));
    let app = if prefix.is_empty() {
        app.merge(grid::grid_routes())
    } else {
        app.nest(&prefix, grid::grid_routes())
    };
    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ApiErrorBody<'a> {
    error: &'a str,
    message: Option<String>,
}

impl ApiError {
    /// Label used for the request outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) | ApiError::BadRequest(_) => "client_error",
            ApiError::Internal(_) => "error",
        }
    }
}

impl From<GridError> for ApiError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::UnknownGrid(id) => ApiError::NotFound(format!("no grid registered under id {id}")),
            GridError::MalformedGridId(_) | GridError::InvalidOrdering(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => {
                error!(error = %other, "grid request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };
        (
            status,
            Json(ApiErrorBody {
                error,
                message: Some(message),
            }),
        )
            .into_response()
    }
}
