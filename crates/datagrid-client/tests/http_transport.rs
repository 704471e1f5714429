use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use datagrid_client::{ClientError, FilterForm, HttpTransport, Refresher, RefresherConfig};
use datagrid_core::source::{MemoryPlan, MemorySource};
use datagrid_core::{
    CellValue, DataGrid, GridContext, GridDefinition, GridHandler, GridRequest, GridRow, LinkContext, Method,
    OrderClause, ResultCache, WirePage, Widget, WidgetOptions,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Line {
    id: u32,
    name: String,
}

impl GridRow for Line {
    fn field(&self, name: &str) -> Option<CellValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }
}

struct Fixture {
    grid: DataGrid<MemorySource<Line>>,
    context: GridContext,
}

fn fixture() -> Arc<Fixture> {
    let definition = GridDefinition::<MemoryPlan<Line>, Line>::builder("lines")
        .filter("name", Widget::Text, WidgetOptions::default(), |plan, value| {
            match value.as_str() {
                Some(needle) => {
                    let needle = needle.to_string();
                    plan.and_where(move |l: &Line| l.name.contains(&needle))
                }
                None => plan,
            }
        })
        .add_display_field("Id", "id")
        .add_display_field("Name", "name")
        .page_size(10)
        .build()
        .unwrap();
    let rows = (1..=25)
        .map(|id| Line {
            id,
            name: format!("line-{id:02}"),
        })
        .collect();
    Arc::new(Fixture {
        grid: DataGrid::new(definition, MemorySource::new(rows, ["id", "name"])),
        context: GridContext::new(ResultCache::in_memory(), LinkContext::new(""), "/datagrid"),
    })
}

async fn serve(fixture: &Fixture, id: &str, request: GridRequest) -> Result<Json<WirePage>, StatusCode> {
    if id != "lines" {
        return Err(StatusCode::NOT_FOUND);
    }
    fixture
        .grid
        .ajax(&request, &fixture.context)
        .await
        .map(Json)
        .map_err(|_| StatusCode::BAD_REQUEST)
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/datagrid/ajax/:id",
            get(
                |State(f): State<Arc<Fixture>>, Path(id): Path<String>, RawQuery(q): RawQuery| async move {
                    serve(&f, &id, GridRequest::from_query(q.as_deref().unwrap_or_default())).await
                },
            )
            .post(
                |State(f): State<Arc<Fixture>>, Path(id): Path<String>, body: String| async move {
                    serve(&f, &id, GridRequest::from_query(&body)).await
                },
            ),
        )
        .route(
            "/slow/ajax/:id",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "{}"
            }),
        )
        .with_state(fixture());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn refresher(transport: HttpTransport, method: Method) -> Refresher<HttpTransport> {
    Refresher::new(
        transport,
        RefresherConfig {
            method,
            header_columns: 2,
            ..RefresherConfig::default()
        },
        FilterForm::with_fields(["name"]),
    )
}

#[tokio::test]
async fn get_refresh_pages_through_the_server() {
    let base = spawn_server().await;
    let transport = HttpTransport::for_grid(&base, "/datagrid", "lines").unwrap();
    let mut r = refresher(transport, Method::Get);

    assert!(r.go_to_page(3).await.is_applied());
    let view = r.view().unwrap();
    assert_eq!(view.total_count, 25);
    assert_eq!(view.body.rows.len(), 5);
    assert_eq!(view.pagination.active_page(), Some(3));
    assert!(view.pagination.next().disabled);
}

#[tokio::test]
async fn post_refresh_sends_filters_and_ordering() {
    let base = spawn_server().await;
    let transport = HttpTransport::for_grid(&base, "/datagrid", "lines").unwrap();
    let mut r = refresher(transport, Method::Post);
    r.form_mut().set("name", "line-1");
    r.form_mut().set_ordering(vec![OrderClause::desc("id")]);

    assert!(r.submit().await.is_applied());
    let view = r.view().unwrap();
    assert_eq!(view.total_count, 10);
    match &view.body.rows[0] {
        datagrid_core::view::BodyRow::Data { cells, .. } => assert_eq!(cells[1], "line-19"),
        other => panic!("unexpected row {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_reported_and_view_is_kept() {
    let base = spawn_server().await;
    let transport = HttpTransport::for_grid(&base, "/datagrid", "missing").unwrap();
    let mut r = refresher(transport, Method::Get);
    let outcome = r.submit().await;
    assert!(matches!(
        outcome,
        datagrid_client::Outcome::Failed(ClientError::UnexpectedStatus { status, .. }) if status == StatusCode::NOT_FOUND
    ));
    assert!(r.view().is_none());
    assert!(!r.is_loading());
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = spawn_server().await;
    let transport = HttpTransport::for_grid(&base, "/slow", "lines")
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let mut r = refresher(transport, Method::Get);
    assert!(matches!(
        r.submit().await,
        datagrid_client::Outcome::Failed(ClientError::Timeout)
    ));
}
