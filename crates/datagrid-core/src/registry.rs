//! Grid registry: maps grid ids to lazily built handlers.
//!
//! Every grid the host serves is registered at startup with a factory. The
//! first request for an id runs the factory; later requests reuse the handler.
//! Ids that were never registered can not be resolved, so a request can only
//! reach grids the host opted into.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::definition::{grid_id_of, is_valid_grid_id};
use crate::error::GridError;
use crate::grid::GridHandler;

type Factory = Box<dyn Fn() -> Result<Arc<dyn GridHandler>, GridError> + Send + Sync>;

struct Entry {
    factory: Factory,
    instance: OnceCell<Arc<dyn GridHandler>>,
}

#[derive(Default)]
pub struct GridRegistry {
    entries: BTreeMap<String, Entry>,
}

impl GridRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`. The handler it builds must report the same id.
    pub fn register<F, H>(&mut self, id: impl Into<String>, factory: F) -> Result<(), GridError>
    where
        F: Fn() -> Result<H, GridError> + Send + Sync + 'static,
        H: GridHandler + 'static,
    {
        let id = id.into();
        if !is_valid_grid_id(&id) {
            return Err(GridError::configuration(format!("invalid grid id {id:?}")));
        }
        if self.entries.contains_key(&id) {
            return Err(GridError::configuration(format!("grid {id} registered twice")));
        }
        let factory: Factory = Box::new(move || factory().map(|h| Arc::new(h) as Arc<dyn GridHandler>));
        self.entries.insert(
            id,
            Entry {
                factory,
                instance: OnceCell::new(),
            },
        );
        Ok(())
    }

    /// Register under the id derived from the type `T`.
    pub fn register_type<T, F, H>(&mut self, factory: F) -> Result<(), GridError>
    where
        T: ?Sized,
        F: Fn() -> Result<H, GridError> + Send + Sync + 'static,
        H: GridHandler + 'static,
    {
        self.register(grid_id_of::<T>(), factory)
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn GridHandler>, GridError> {
        if !is_valid_grid_id(id) {
            return Err(GridError::MalformedGridId(id.to_string()));
        }
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| GridError::UnknownGrid(id.to_string()))?;
        let handler = entry.instance.get_or_try_init(|| {
            let handler = (entry.factory)()?;
            if handler.id() != id {
                return Err(GridError::configuration(format!(
                    "grid registered as {id} reports id {}",
                    handler.id()
                )));
            }
            info!(grid = %id, "grid built");
            Ok(handler)
        })?;
        Ok(Arc::clone(handler))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
