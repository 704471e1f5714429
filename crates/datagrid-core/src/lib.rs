//! Server-rendered data grids.
//!
//! A [`GridDefinition`] declares filters, columns and action links for one kind
//! of row. Bound to a [`QuerySource`] it becomes a [`DataGrid`], which binds
//! request parameters, narrows and orders a query plan, pages it through the
//! [`ResultCache`] and serializes the page for the browser refresher.

pub mod binding;
pub mod cache;
pub mod definition;
pub mod error;
pub mod grid;
pub mod links;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod serializer;
pub mod source;
pub mod value;
pub mod view;

pub use binding::{
    bind, ordering_pairs, Binding, Direction, FieldError, FilterState, FilterValue, GridRequest,
    OrderClause, ORDERING_PARAM, PAGE_PARAM,
};
pub use cache::{CacheKey, CachePolicy, CacheStore, FilesystemStore, InMemoryStore, ResultCache};
pub use definition::{
    grid_id_of, Accessor, Choice, GridDefinition, GridDefinitionBuilder, GridLabels, Method,
    Widget, WidgetOptions,
};
pub use error::{CacheError, GridError};
pub use grid::{DataGrid, GridContext, GridHandler};
pub use links::LinkContext;
pub use pipeline::{page_count, Execution, ResultPage};
pub use registry::GridRegistry;
pub use serializer::{WireAction, WirePage, WireRow};
pub use source::{Fetched, MemoryPlan, MemorySource, QueryPlan, QuerySource};
pub use value::{CellValue, GridRow};
pub use view::{Pagination, PageItem, PageItemKind, TableBody};
