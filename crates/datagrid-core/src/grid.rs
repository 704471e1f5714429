use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::binding::GridRequest;
use crate::cache::ResultCache;
use crate::definition::{GridDefinition, Method};
use crate::error::GridError;
use crate::links::LinkContext;
use crate::pipeline::{self, Execution};
use crate::render::{self, RenderUrls};
use crate::serializer::{self, WirePage};
use crate::source::QuerySource;

/// Everything a grid needs from its host for one request.
#[derive(Clone)]
pub struct GridContext {
    pub cache: ResultCache,
    pub links: Arc<LinkContext>,
    /// Mount point of the grid routes, e.g. `/datagrid`.
    pub route_prefix: String,
}

impl GridContext {
    pub fn new(cache: ResultCache, links: LinkContext, route_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            links: Arc::new(links),
            route_prefix: route_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, grid_id: &str) -> String {
        format!("{}/{}", self.route_prefix, grid_id)
    }

    pub fn ajax_url(&self, grid_id: &str) -> String {
        format!("{}/ajax/{}", self.route_prefix, grid_id)
    }

    pub fn script_url(&self) -> String {
        format!("{}/assets/datagrid.js", self.route_prefix)
    }
}

/// Object-safe face of a grid, as stored in the registry.
#[async_trait]
pub trait GridHandler: Send + Sync {
    fn id(&self) -> &str;

    fn method(&self) -> Method;

    /// Execute and serialize one page for the ajax endpoint.
    async fn ajax(&self, request: &GridRequest, ctx: &GridContext) -> Result<WirePage, GridError>;

    /// Execute and render the filter form, table and pagination as HTML.
    async fn render(&self, request: &GridRequest, ctx: &GridContext) -> Result<String, GridError>;
}

/// A grid definition bound to the source it queries.
pub struct DataGrid<S: QuerySource> {
    definition: GridDefinition<S::Plan, S::Row>,
    source: S,
}

impl<S: QuerySource> DataGrid<S> {
    pub fn new(definition: GridDefinition<S::Plan, S::Row>, source: S) -> Self {
        Self { definition, source }
    }

    pub fn definition(&self) -> &GridDefinition<S::Plan, S::Row> {
        &self.definition
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn execute(
        &self,
        request: &GridRequest,
        cache: &ResultCache,
    ) -> Result<Execution<S::Row>, GridError> {
        pipeline::execute(&self.definition, &self.source, request, cache).await
    }

    fn to_wire(&self, execution: Execution<S::Row>, links: &LinkContext) -> Result<WirePage, GridError> {
        let mut wire = serializer::serialize(&execution.page, &self.definition, links)?;
        wire.errors = execution.errors;
        Ok(wire)
    }
}

#[async_trait]
impl<S: QuerySource> GridHandler for DataGrid<S> {
    fn id(&self) -> &str {
        self.definition.id()
    }

    fn method(&self) -> Method {
        self.definition.method()
    }

    async fn ajax(&self, request: &GridRequest, ctx: &GridContext) -> Result<WirePage, GridError> {
        let execution = self.execute(request, &ctx.cache).await?;
        let wire = self.to_wire(execution, &ctx.links)?;
        debug!(
            grid = %self.id(),
            rows = wire.items.len(),
            page = wire.current_page,
            pages = wire.nb_pages,
            "grid page served"
        );
        Ok(wire)
    }

    async fn render(&self, request: &GridRequest, ctx: &GridContext) -> Result<String, GridError> {
        let execution = self.execute(request, &ctx.cache).await?;
        let state = execution.state.clone();
        let wire = self.to_wire(execution, &ctx.links)?;
        let urls = RenderUrls {
            page: ctx.page_url(self.id()),
            ajax: ctx.ajax_url(self.id()),
            script: ctx.script_url(),
        };
        Ok(render::render_grid(&self.definition, &wire, &state, request, &urls))
    }
}
