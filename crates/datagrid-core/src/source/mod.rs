//! Query source adapters.
//!
//! A source hands out a fresh [`QueryPlan`] per request; the pipeline narrows it
//! with predicates, ordering and a window, then asks the source to run it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::binding::OrderClause;
use crate::error::GridError;
use crate::value::GridRow;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{MemoryPlan, MemorySource};
#[cfg(feature = "postgres")]
pub use postgres::{PgPlan, PgSource};

/// A composable, not-yet-executed query.
pub trait QueryPlan: Send + Sized + 'static {
    /// Append an ordering clause. Earlier clauses take precedence, as in
    /// `ORDER BY a, b`. Fields the source does not recognize are rejected.
    fn add_order_by(self, clause: &OrderClause) -> Result<Self, GridError>;

    /// Restrict the plan to `limit` rows starting at `offset`.
    fn window(self, offset: u64, limit: u64) -> Self;
}

/// One executed page: the windowed rows plus the unwindowed row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fetched<R> {
    pub rows: Vec<R>,
    pub total_count: u64,
}

#[async_trait]
pub trait QuerySource: Send + Sync + 'static {
    type Plan: QueryPlan;
    type Row: GridRow + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn base_plan(&self) -> Self::Plan;

    async fn fetch(&self, plan: Self::Plan) -> Result<Fetched<Self::Row>, GridError>;
}
