//! Execution pipeline: bind → order → filter → paginate → cache → page.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binding::{bind, Binding, FieldError, FilterState, GridRequest};
use crate::cache::{CacheKey, ResultCache};
use crate::definition::GridDefinition;
use crate::error::GridError;
use crate::source::{Fetched, QueryPlan, QuerySource};

/// `max(ceil(total / page_size), 1)`. A zero page size is treated as 1.
pub fn page_count(total_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Row offset of the first row on `page` (1-based).
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

/// Materialized rows plus pagination metadata for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage<R> {
    pub rows: Vec<R>,
    pub total_count: u64,
    pub current_page: u32,
    pub page_count: u32,
    pub page_size: u32,
}

impl<R> ResultPage<R> {
    pub fn new(fetched: Fetched<R>, current_page: u32, page_size: u32) -> Self {
        Self {
            rows: fetched.rows,
            total_count: fetched.total_count,
            current_page,
            page_count: page_count(fetched.total_count, page_size),
            page_size,
        }
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.current_page, self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count
    }
}

/// Pipeline output: the page, the state it was computed from and any
/// validation errors that forced a fallback to the unfiltered first page.
#[derive(Debug, Clone)]
pub struct Execution<R> {
    pub page: ResultPage<R>,
    pub state: FilterState,
    pub errors: Vec<FieldError>,
}

pub async fn execute<S: QuerySource>(
    definition: &GridDefinition<S::Plan, S::Row>,
    source: &S,
    request: &GridRequest,
    cache: &ResultCache,
) -> Result<Execution<S::Row>, GridError> {
    let fields = definition.filter_fields();
    let (state, errors) = match bind(&fields, request) {
        Binding::Valid(state) => (state, Vec::new()),
        Binding::NotSubmitted => (FilterState::initial(fields.iter().copied()), Vec::new()),
        Binding::Invalid(errors) => {
            info!(
                grid = %definition.id(),
                errors = errors.len(),
                "filter binding failed; serving unfiltered first page"
            );
            (FilterState::initial(fields.iter().copied()), errors)
        }
    };

    let mut plan = source.base_plan();
    if state.is_submitted() {
        for clause in &state.ordering {
            plan = plan.add_order_by(clause)?;
        }
        for filter in definition.filters() {
            plan = filter
                .apply(plan, state.value(&filter.field.name))
                .map_err(|err| match err {
                    GridError::Predicate { .. } => err,
                    other => GridError::Predicate {
                        filter: filter.field.name.clone(),
                        message: other.to_string(),
                    },
                })?;
        }
    }

    let page_size = definition.page_size();
    let offset = page_offset(state.page, page_size);
    let plan = plan.window(offset, u64::from(page_size));

    let key = CacheKey::for_request(definition.id(), &state, page_size);
    debug!(grid = %definition.id(), key = %key, offset, limit = page_size, "executing grid query");
    let fetched: Fetched<S::Row> = cache.get_or_compute(&key, || source.fetch(plan)).await?;

    Ok(Execution {
        page: ResultPage::new(fetched, state.page, page_size),
        state,
        errors,
    })
}
