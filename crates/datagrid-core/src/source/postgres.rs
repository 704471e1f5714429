use std::sync::Arc;

use async_trait::async_trait;
use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, ConditionalStatement, Expr, Order, OrderedStatement, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr,
};
use sea_query_binder::SqlxBinder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::binding::{Direction, OrderClause};
use crate::error::GridError;
use crate::source::{Fetched, QueryPlan, QuerySource};
use crate::value::GridRow;

/// A single Postgres table (or view) exposed as a grid source.
///
/// `columns` are both the selected columns and the ordering whitelist.
pub struct PgSource<R> {
    pool: PgPool,
    table: String,
    columns: Arc<[String]>,
    _row: std::marker::PhantomData<fn() -> R>,
}

impl<R> PgSource<R> {
    pub fn new<I, S>(pool: PgPool, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pool,
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            _row: std::marker::PhantomData,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgPlan {
    select: SelectStatement,
    columns: Arc<[String]>,
}

impl PgPlan {
    pub fn new<I, S>(table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Arc<[String]> = columns.into_iter().map(Into::into).collect();
        let select = Query::select()
            .columns(columns.iter().map(Alias::new))
            .from(Alias::new(table))
            .to_owned();
        Self { select, columns }
    }

    /// Add a `WHERE` condition; conditions combine with AND.
    pub fn and_where(mut self, condition: SimpleExpr) -> Self {
        self.select.and_where(condition);
        self
    }

    /// Shorthand for `column ILIKE '%needle%'`.
    pub fn contains(self, column: &str, needle: &str) -> Self {
        let pattern = format!("%{}%", escape_like(needle));
        self.and_where(Expr::col(Alias::new(column)).ilike(pattern))
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.select
    }

    fn count_statement(&self) -> SelectStatement {
        let mut count = self.select.clone();
        count
            .clear_selects()
            .clear_order_by()
            .reset_limit()
            .reset_offset()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("total"));
        count
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl QueryPlan for PgPlan {
    fn add_order_by(mut self, clause: &OrderClause) -> Result<Self, GridError> {
        if !self.columns.iter().any(|c| *c == clause.field) {
            return Err(GridError::InvalidOrdering(format!(
                "column {} is not sortable",
                clause.field
            )));
        }
        let order = match clause.direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        };
        self.select.order_by(Alias::new(&clause.field), order);
        Ok(self)
    }

    fn window(mut self, offset: u64, limit: u64) -> Self {
        self.select.offset(offset).limit(limit);
        self
    }
}

#[async_trait]
impl<R> QuerySource for PgSource<R>
where
    R: for<'r> FromRow<'r, PgRow>
        + GridRow
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + Unpin
        + 'static,
{
    type Plan = PgPlan;
    type Row = R;

    fn base_plan(&self) -> PgPlan {
        PgPlan::new(&self.table, self.columns.iter().cloned())
    }

    async fn fetch(&self, plan: PgPlan) -> Result<Fetched<R>, GridError> {
        let (count_sql, count_values) = plan.count_statement().build_sqlx(PostgresQueryBuilder);
        let total: i64 = sqlx::query_scalar_with(&count_sql, count_values)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GridError::source(e.to_string()))?;

        let (sql, values) = plan.select.build_sqlx(PostgresQueryBuilder);
        debug!(table = %self.table, sql = %sql, "fetching grid page");
        let rows = sqlx::query_as_with::<_, R, _>(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::source(e.to_string()))?;

        Ok(Fetched {
            rows,
            total_count: total.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PgPlan {
        PgPlan::new("stations", ["id", "name", "opened_on"])
    }

    #[test]
    fn builds_filtered_ordered_window() {
        let plan = plan()
            .contains("name", "gare")
            .add_order_by(&OrderClause::desc("opened_on"))
            .unwrap()
            .add_order_by(&OrderClause::asc("id"))
            .unwrap()
            .window(20, 20);
        let sql = plan.statement().to_string(PostgresQueryBuilder);
        assert_eq!(
            sql,
            r#"SELECT "id", "name", "opened_on" FROM "stations" WHERE "name" ILIKE '%gare%' ORDER BY "opened_on" DESC, "id" ASC LIMIT 20 OFFSET 20"#
        );
    }

    #[test]
    fn count_drops_window_and_ordering() {
        let plan = plan()
            .add_order_by(&OrderClause::asc("name"))
            .unwrap()
            .window(40, 20);
        let sql = plan.count_statement().to_string(PostgresQueryBuilder);
        assert_eq!(sql, r#"SELECT COUNT(*) AS "total" FROM "stations""#);
    }

    #[test]
    fn ordering_is_whitelisted() {
        let result = plan().add_order_by(&OrderClause::asc("password"));
        assert!(matches!(result, Err(GridError::InvalidOrdering(_))));
    }

    #[derive(Debug, Clone, Serialize, serde::Deserialize, sqlx::FromRow)]
    struct StationRow {
        id: i32,
        name: String,
    }

    impl GridRow for StationRow {
        fn field(&self, name: &str) -> Option<crate::value::CellValue> {
            match name {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.as_str().into()),
                _ => None,
            }
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a scratch postgres"]
    async fn pages_a_real_table() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        sqlx::query("CREATE TEMP TABLE grid_stations (id INT PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        for id in 1..=45 {
            sqlx::query("INSERT INTO grid_stations (id, name) VALUES ($1, $2)")
                .bind(id)
                .bind(format!("Station {id:02}"))
                .execute(&pool)
                .await
                .unwrap();
        }
        let source: PgSource<StationRow> = PgSource::new(pool, "grid_stations", ["id", "name"]);
        let plan = source
            .base_plan()
            .add_order_by(&OrderClause::asc("id"))
            .unwrap()
            .window(20, 20);
        let fetched = source.fetch(plan).await.unwrap();
        assert_eq!(fetched.total_count, 45);
        assert_eq!(fetched.rows.len(), 20);
        assert_eq!(fetched.rows[0].id, 21);
    }
}
