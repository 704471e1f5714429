use axum::body;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::util::ServiceExt;

use datagrid_core::{GridContext, GridRegistry, LinkContext, ResultCache};
use datagrid_server::demo;
use datagrid_server::routes;
use datagrid_server::state::AppState;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn build_app() -> Router {
    let mut registry = GridRegistry::new();
    demo::register(&mut registry).unwrap();
    let links = demo::link_routes(LinkContext::new(""));
    let context = GridContext::new(ResultCache::in_memory(), links, "/datagrid");
    routes::router(AppState::new(registry, context))
}

async fn json_body(response: axum::response::Response) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let bytes = body::to_bytes(response.into_body(), 1024 * 256).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn ajax_get_returns_the_requested_page() -> TestResult {
    let uri = format!("/datagrid/ajax/{}?_page=2", demo::station_grid_id());
    let response = build_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["nbPages"], 3);
    assert_eq!(json["currentPage"], 2);
    assert_eq!(json["totalCount"], 45);
    let items = json["items"].as_array().ok_or("items is not an array")?;
    assert_eq!(items.len(), 20);
    assert_eq!(items[0]["data"][0], "Station 21");
    assert_eq!(items[0]["actions"][0]["url"], "/stations/21");
    assert_eq!(items[0]["actions"][0]["label"], "Show");
    assert!(json.get("errors").is_none());
    Ok(())
}

#[tokio::test]
async fn ajax_post_reads_the_form_body() -> TestResult {
    let uri = format!("/datagrid/ajax/{}", demo::station_grid_id());
    let response = build_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "name=station%204&_page=1&_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=desc",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["totalCount"], 6);
    assert_eq!(json["nbPages"], 1);
    assert_eq!(json["items"][0]["data"][0], "Station 45");
    Ok(())
}

#[tokio::test]
async fn no_matches_yields_empty_items_and_one_page() -> TestResult {
    let uri = format!("/datagrid/ajax/{}?name=nowhere", demo::station_grid_id());
    let response = build_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["items"], serde_json::json!([]));
    assert_eq!(json["nbPages"], 1);
    assert_eq!(json["currentPage"], 1);
    Ok(())
}

#[tokio::test]
async fn invalid_filter_value_reports_errors_with_first_page() -> TestResult {
    let uri = format!(
        "/datagrid/ajax/{}?openedAfter=yesterday&_page=3",
        demo::station_grid_id()
    );
    let response = build_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["totalCount"], 45);
    assert_eq!(json["errors"][0]["field"], "openedAfter");
    Ok(())
}

#[tokio::test]
async fn unknown_grid_is_not_found() -> TestResult {
    let response = build_app()
        .oneshot(
            Request::builder()
                .uri("/datagrid/ajax/App_Grid_Missing")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await?;
    assert_eq!(json["error"], "not_found");
    Ok(())
}

#[tokio::test]
async fn malformed_grid_id_is_a_bad_request() -> TestResult {
    let response = build_app()
        .oneshot(
            Request::builder()
                .uri("/datagrid/ajax/App%5CGrid%5CStations")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await?;
    assert_eq!(json["error"], "bad_request");
    Ok(())
}

#[tokio::test]
async fn unsortable_field_is_a_bad_request() -> TestResult {
    let uri = format!(
        "/datagrid/ajax/{}?_datagrid_ordering%5B0%5D%5Bfield%5D=accessible",
        demo::station_grid_id()
    );
    let response = build_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn page_renders_form_and_script() -> TestResult {
    let id = demo::station_grid_id();
    let response = build_app()
        .oneshot(
            Request::builder()
                .uri(format!("/datagrid/{id}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), 1024 * 256).await?;
    let html = String::from_utf8(bytes.to_vec())?;
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains(&format!("id=\"{id}-datagrid-filter-form\"")));
    assert!(html.contains(&format!("id=\"{id}-datagrid-pagination\"")));
    assert!(html.contains(&format!("action=\"/datagrid/{id}\"")));
    assert!(html.contains("/datagrid/assets/datagrid.js"));
    Ok(())
}

#[tokio::test]
async fn serves_script_and_probes() -> TestResult {
    let app = build_app();
    let script = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/datagrid/assets/datagrid.js")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(script.status(), StatusCode::OK);
    assert_eq!(
        script.headers()["content-type"],
        "text/javascript; charset=utf-8"
    );

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(health.status(), StatusCode::OK);

    let ready = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty())?)
        .await?;
    assert_eq!(ready.status(), StatusCode::OK);
    let json = json_body(ready).await?;
    assert_eq!(json["grids"][0], demo::station_grid_id());
    assert_eq!(json["cache_backend"], "memory");
    Ok(())
}

#[tokio::test]
async fn last_representable_page_renders_empty() -> TestResult {
    let id = demo::station_grid_id();
    let app = build_app();
    let page = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/datagrid/{id}?_page=4294967295"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(page.status(), StatusCode::OK);

    let ajax = app
        .oneshot(
            Request::builder()
                .uri(format!("/datagrid/ajax/{id}?_page=4294967295"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(ajax.status(), StatusCode::OK);
    let json = json_body(ajax).await?;
    assert_eq!(json["items"], serde_json::json!([]));
    assert_eq!(json["currentPage"], 4294967295u64);
    assert_eq!(json["nbPages"], 3);
    Ok(())
}

#[tokio::test]
async fn form_post_without_script_renders_the_page() -> TestResult {
    let id = demo::station_grid_id();
    let response = build_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/datagrid/{id}"))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("name=station%2045&_page=1"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), 1024 * 256).await?;
    let html = String::from_utf8(bytes.to_vec())?;
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("value=\"station 45\""));
    assert!(html.contains("Station 45"));
    assert!(!html.contains("Station 44"));
    Ok(())
}
