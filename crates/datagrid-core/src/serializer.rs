//! Wire format shared by the ajax endpoint and the refresher.
//!
//! ```json
//! { "items": [{ "data": ["..."], "actions": [{ "url": "...", "label": "..." }] }],
//!   "nbPages": 3, "currentPage": 2, "totalCount": 45 }
//! ```

use serde::{Deserialize, Serialize};

use crate::binding::FieldError;
use crate::definition::{Accessor, GridDefinition};
use crate::error::GridError;
use crate::links::LinkContext;
use crate::pipeline::ResultPage;
use crate::value::GridRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAction {
    pub url: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRow {
    pub data: Vec<String>,
    pub actions: Vec<WireAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePage {
    pub items: Vec<WireRow>,
    #[serde(rename = "nbPages")]
    pub nb_pages: u32,
    pub current_page: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl WirePage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Display string for one column of `row`.
pub fn display_cell<P, R: GridRow>(
    definition: &GridDefinition<P, R>,
    accessor: &Accessor<R>,
    row: &R,
) -> Result<String, GridError> {
    match accessor {
        Accessor::Field(name) => row
            .field(name)
            .map(|value| value.display(definition.date_format()))
            .ok_or_else(|| {
                GridError::configuration(format!(
                    "no field {name} on {}",
                    std::any::type_name::<R>()
                ))
            }),
        Accessor::Computed(f) => Ok(f(row)),
    }
}

pub fn serialize_row<P, R: GridRow>(
    definition: &GridDefinition<P, R>,
    links: &LinkContext,
    row: &R,
) -> Result<WireRow, GridError> {
    let data = definition
        .display_fields()
        .iter()
        .map(|field| display_cell(definition, &field.accessor, row))
        .collect::<Result<Vec<_>, _>>()?;
    let actions = definition
        .action_links()
        .iter()
        .map(|link| {
            Ok(WireAction {
                url: link.url(links, row)?,
                label: link.label.clone(),
            })
        })
        .collect::<Result<Vec<_>, GridError>>()?;
    Ok(WireRow { data, actions })
}

/// Serialize a page. Any row failing to serialize fails the whole page.
pub fn serialize<P, R: GridRow>(
    page: &ResultPage<R>,
    definition: &GridDefinition<P, R>,
    links: &LinkContext,
) -> Result<WirePage, GridError> {
    let items = page
        .rows
        .iter()
        .map(|row| serialize_row(definition, links, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WirePage {
        items,
        nb_pages: page.page_count,
        current_page: page.current_page,
        total_count: page.total_count,
        errors: Vec::new(),
    })
}
