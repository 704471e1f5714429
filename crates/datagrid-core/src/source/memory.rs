use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::binding::{Direction, OrderClause};
use crate::error::GridError;
use crate::source::{Fetched, QueryPlan, QuerySource};
use crate::value::{CellValue, GridRow};

type RowPredicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Rows held in memory. Sorting is limited to the declared sortable fields.
pub struct MemorySource<R> {
    rows: Arc<[R]>,
    sortable: Arc<[String]>,
}

impl<R> MemorySource<R> {
    pub fn new<I, S>(rows: Vec<R>, sortable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows.into(),
            sortable: sortable.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R> Clone for MemorySource<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            sortable: Arc::clone(&self.sortable),
        }
    }
}

pub struct MemoryPlan<R> {
    predicates: Vec<RowPredicate<R>>,
    ordering: Vec<OrderClause>,
    offset: u64,
    limit: Option<u64>,
    sortable: Arc<[String]>,
}

impl<R> MemoryPlan<R> {
    /// Keep only rows matching `predicate`; predicates combine with AND.
    pub fn and_where<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn ordering(&self) -> &[OrderClause] {
        &self.ordering
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    fn matches(&self, row: &R) -> bool {
        self.predicates.iter().all(|p| p(row))
    }
}

impl<R: GridRow> MemoryPlan<R> {
    fn compare(&self, a: &R, b: &R) -> Ordering {
        for clause in &self.ordering {
            let left = a.field(&clause.field).unwrap_or(CellValue::Null);
            let right = b.field(&clause.field).unwrap_or(CellValue::Null);
            let ord = match clause.direction {
                Direction::Asc => left.sort_cmp(&right),
                Direction::Desc => right.sort_cmp(&left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl<R: Send + Sync + 'static> QueryPlan for MemoryPlan<R> {
    fn add_order_by(mut self, clause: &OrderClause) -> Result<Self, GridError> {
        if !self.sortable.iter().any(|f| *f == clause.field) {
            return Err(GridError::InvalidOrdering(format!(
                "field {} is not sortable",
                clause.field
            )));
        }
        self.ordering.push(clause.clone());
        Ok(self)
    }

    fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
impl<R> QuerySource for MemorySource<R>
where
    R: GridRow + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Plan = MemoryPlan<R>;
    type Row = R;

    fn base_plan(&self) -> MemoryPlan<R> {
        MemoryPlan {
            predicates: Vec::new(),
            ordering: Vec::new(),
            offset: 0,
            limit: None,
            sortable: Arc::clone(&self.sortable),
        }
    }

    async fn fetch(&self, plan: MemoryPlan<R>) -> Result<Fetched<R>, GridError> {
        let mut matched: Vec<&R> = self.rows.iter().filter(|row| plan.matches(row)).collect();
        if !plan.ordering.is_empty() {
            matched.sort_by(|a, b| plan.compare(a, b));
        }
        let total_count = matched.len() as u64;
        let offset = usize::try_from(plan.offset).unwrap_or(usize::MAX);
        let limit = plan
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(Fetched { rows, total_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct City {
        name: String,
        population: i64,
    }

    impl GridRow for City {
        fn field(&self, name: &str) -> Option<CellValue> {
            match name {
                "name" => Some(self.name.as_str().into()),
                "population" => Some(self.population.into()),
                _ => None,
            }
        }
    }

    fn source() -> MemorySource<City> {
        let rows = [("Lyon", 520), ("Paris", 2100), ("Nice", 340), ("Lille", 230)]
            .into_iter()
            .map(|(name, population)| City {
                name: name.into(),
                population,
            })
            .collect();
        MemorySource::new(rows, ["name", "population"])
    }

    #[tokio::test]
    async fn filters_sorts_and_windows() {
        let source = source();
        let plan = source
            .base_plan()
            .and_where(|c: &City| c.population > 300)
            .add_order_by(&OrderClause::desc("population"))
            .unwrap()
            .window(1, 5);
        let fetched = source.fetch(plan).await.unwrap();
        assert_eq!(fetched.total_count, 3);
        let names: Vec<&str> = fetched.rows.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Lyon", "Nice"]);
    }

    #[tokio::test]
    async fn window_past_the_end_is_empty() {
        let source = source();
        let fetched = source.fetch(source.base_plan().window(40, 20)).await.unwrap();
        assert_eq!(fetched.total_count, 4);
        assert!(fetched.rows.is_empty());
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let result = source().base_plan().add_order_by(&OrderClause::asc("mayor"));
        assert!(matches!(result, Err(GridError::InvalidOrdering(_))));
    }
}
