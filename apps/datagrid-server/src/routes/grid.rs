use std::time::Instant;

use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use datagrid_core::{GridRequest, WirePage};
use tracing::debug;

use crate::metrics;
use crate::routes::ApiError;
use crate::state::AppState;

const SCRIPT: &str = include_str!("../../assets/datagrid.js");

pub fn grid_routes() -> Router<AppState> {
    Router::new()
        .route("/ajax/:grid_id", get(ajax_query).post(ajax_form))
        .route("/assets/datagrid.js", get(script))
        .route("/:grid_id", get(page_query).post(page_form))
}

async fn ajax_query(
    State(state): State<AppState>,
    Path(grid_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<WirePage>, ApiError> {
    let request = GridRequest::from_query(query.as_deref().unwrap_or_default());
    serve_ajax(&state, &grid_id, request).await
}

async fn ajax_form(
    State(state): State<AppState>,
    Path(grid_id): Path<String>,
    body: String,
) -> Result<Json<WirePage>, ApiError> {
    serve_ajax(&state, &grid_id, GridRequest::from_query(&body)).await
}

async fn serve_ajax(
    state: &AppState,
    grid_id: &str,
    request: GridRequest,
) -> Result<Json<WirePage>, ApiError> {
    let started = Instant::now();
    let grid = state
        .registry()
        .resolve(grid_id)
        .map_err(|err| unresolved("ajax", err))?;
    let result = grid
        .ajax(&request, state.grid_context())
        .await
        .map_err(ApiError::from);
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::GRID_REQUESTS
        .with_label_values(&[grid_id, "ajax", outcome])
        .inc();
    metrics::GRID_LATENCY_MS
        .with_label_values(&[grid_id])
        .observe(started.elapsed().as_secs_f64() * 1000.0);
    debug!(grid = %grid_id, outcome, elapsed_ms = started.elapsed().as_millis() as u64, "ajax request");
    result.map(Json)
}

/// Unknown or malformed ids are counted under one label.
fn unresolved(endpoint: &str, err: datagrid_core::GridError) -> ApiError {
    let err = ApiError::from(err);
    metrics::GRID_REQUESTS
        .with_label_values(&["unresolved", endpoint, err.outcome()])
        .inc();
    err
}

async fn page_query(
    State(state): State<AppState>,
    Path(grid_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, ApiError> {
    let request = GridRequest::from_query(query.as_deref().unwrap_or_default());
    serve_page(&state, &grid_id, request).await
}

/// Form posts that arrive without the script re-render the whole page.
async fn page_form(
    State(state): State<AppState>,
    Path(grid_id): Path<String>,
    body: String,
) -> Result<Html<String>, ApiError> {
    serve_page(&state, &grid_id, GridRequest::from_query(&body)).await
}

async fn serve_page(state: &AppState, grid_id: &str, request: GridRequest) -> Result<Html<String>, ApiError> {
    let grid = state
        .registry()
        .resolve(grid_id)
        .map_err(|err| unresolved("page", err))?;
    let result = grid
        .render(&request, state.grid_context())
        .await
        .map_err(ApiError::from);
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.outcome(),
    };
    metrics::GRID_REQUESTS
        .with_label_values(&[grid_id, "page", outcome])
        .inc();
    let fragment = result?;
    Ok(Html(document(grid_id, &fragment)))
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title>\
         <style>.datagrid-table-holder.loading{{opacity:.5;pointer-events:none}}\
         .page-item.disabled{{opacity:.4}}.page-item.active{{font-weight:bold}}\
         .datagrid-errors{{color:#b00}}</style>\
         </head><body>{body}</body></html>",
        datagrid_core::view::escape_html(title)
    )
}

async fn script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        SCRIPT,
    )
}
