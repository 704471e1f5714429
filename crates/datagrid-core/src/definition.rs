//! Grid definitions: filters, display columns, action links and paging.
//!
//! A definition is built once per grid kind through [`GridDefinitionBuilder`]
//! and is immutable afterwards.

use std::any::type_name;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::binding::{FilterValue, ORDERING_PARAM, PAGE_PARAM};
use crate::error::GridError;
use crate::links::LinkContext;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

pub type Predicate<P> = Arc<dyn Fn(P, &FilterValue) -> Result<P, GridError> + Send + Sync>;
pub type CellFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;
pub type UrlBuilder<R> = Arc<dyn Fn(&LinkContext, &R) -> Result<String, GridError> + Send + Sync>;

/// Stable, URL-safe id for a grid type: its path with `::` replaced by `_`.
pub fn grid_id_of<T: ?Sized>() -> String {
    type_name::<T>()
        .replace("::", "_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("get") {
            Ok(Method::Get)
        } else if s.eq_ignore_ascii_case("post") {
            Ok(Method::Post)
        } else {
            Err(GridError::configuration(format!("unsupported method {s}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Input widget for a filter field. Binding parses submitted text according to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    Text,
    Integer,
    Number,
    Checkbox,
    Choice(Vec<Choice>),
    Date,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetOptions {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
}

impl WidgetOptions {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub name: String,
    pub widget: Widget,
    pub options: WidgetOptions,
}

impl FilterField {
    pub fn new(name: impl Into<String>, widget: Widget, options: WidgetOptions) -> Self {
        Self {
            name: name.into(),
            widget,
            options,
        }
    }

    pub fn label(&self) -> &str {
        self.options.label.as_deref().unwrap_or(&self.name)
    }
}

pub struct GridFilter<P> {
    pub field: FilterField,
    predicate: Predicate<P>,
}

impl<P> GridFilter<P> {
    pub fn apply(&self, plan: P, value: &FilterValue) -> Result<P, GridError> {
        (self.predicate)(plan, value)
    }
}

pub enum Accessor<R> {
    /// Named field read through [`crate::value::GridRow::field`].
    Field(String),
    Computed(CellFn<R>),
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Field(name) => Accessor::Field(name.clone()),
            Accessor::Computed(f) => Accessor::Computed(Arc::clone(f)),
        }
    }
}

impl<R> From<&str> for Accessor<R> {
    fn from(name: &str) -> Self {
        Accessor::Field(name.to_string())
    }
}

impl<R> From<String> for Accessor<R> {
    fn from(name: String) -> Self {
        Accessor::Field(name)
    }
}

impl<R> Accessor<R> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Accessor::Computed(Arc::new(f))
    }
}

pub struct DisplayField<R> {
    pub title: String,
    pub accessor: Accessor<R>,
}

pub struct ActionLink<R> {
    pub label: String,
    builder: UrlBuilder<R>,
}

impl<R> ActionLink<R> {
    pub fn url(&self, links: &LinkContext, row: &R) -> Result<String, GridError> {
        (self.builder)(links, row)
    }
}

/// Static UI strings rendered around the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLabels {
    pub empty: String,
    pub previous: String,
    pub next: String,
    pub submit: String,
}

impl Default for GridLabels {
    fn default() -> Self {
        Self {
            empty: "No results".into(),
            previous: "Previous".into(),
            next: "Next".into(),
            submit: "Search".into(),
        }
    }
}

pub struct GridDefinition<P, R> {
    id: String,
    filters: Vec<GridFilter<P>>,
    display_fields: Vec<DisplayField<R>>,
    actions: Vec<ActionLink<R>>,
    method: Method,
    page_size: u32,
    date_format: String,
    labels: GridLabels,
}

impl<P: 'static, R: 'static> GridDefinition<P, R> {
    pub fn builder(id: impl Into<String>) -> GridDefinitionBuilder<P, R> {
        GridDefinitionBuilder::new(id.into())
    }

    /// Builder whose id is derived from the type `T` owning the grid.
    pub fn builder_for<T: ?Sized>() -> GridDefinitionBuilder<P, R> {
        GridDefinitionBuilder::new(grid_id_of::<T>())
    }
}

impl<P, R> GridDefinition<P, R> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filters(&self) -> &[GridFilter<P>] {
        &self.filters
    }

    pub fn filter_fields(&self) -> Vec<&FilterField> {
        self.filters.iter().map(|f| &f.field).collect()
    }

    pub fn display_fields(&self) -> &[DisplayField<R>] {
        &self.display_fields
    }

    pub fn display_titles(&self) -> impl Iterator<Item = &str> {
        self.display_fields.iter().map(|f| f.title.as_str())
    }

    pub fn action_links(&self) -> &[ActionLink<R>] {
        &self.actions
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn labels(&self) -> &GridLabels {
        &self.labels
    }

    pub fn form_element_id(&self) -> String {
        format!("{}-datagrid-filter-form", self.id)
    }

    pub fn filter_element_id(&self, name: &str) -> String {
        format!("{}-datagrid-filter-{}", self.id, name)
    }

    pub fn page_element_id(&self) -> String {
        format!("{}-datagrid-page", self.id)
    }

    pub fn table_holder_element_id(&self) -> String {
        format!("{}-datagrid-table-holder", self.id)
    }

    pub fn pagination_element_id(&self) -> String {
        format!("{}-datagrid-pagination", self.id)
    }
}

pub struct GridDefinitionBuilder<P, R> {
    id: String,
    filters: Vec<GridFilter<P>>,
    display_fields: Vec<DisplayField<R>>,
    actions: Vec<ActionLink<R>>,
    method: Method,
    page_size: u32,
    date_format: String,
    labels: GridLabels,
}

impl<P: 'static, R: 'static> GridDefinitionBuilder<P, R> {
    fn new(id: String) -> Self {
        Self {
            id,
            filters: Vec::new(),
            display_fields: Vec::new(),
            actions: Vec::new(),
            method: Method::default(),
            page_size: DEFAULT_PAGE_SIZE,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            labels: GridLabels::default(),
        }
    }

    /// Declare a filter. The predicate narrows the plan with the bound value and
    /// runs on every submitted request, including when the value is empty.
    pub fn filter<F>(self, name: impl Into<String>, widget: Widget, options: WidgetOptions, predicate: F) -> Self
    where
        F: Fn(P, &FilterValue) -> P + Send + Sync + 'static,
    {
        self.try_filter(name, widget, options, move |plan, value| Ok(predicate(plan, value)))
    }

    pub fn try_filter<F>(mut self, name: impl Into<String>, widget: Widget, options: WidgetOptions, predicate: F) -> Self
    where
        F: Fn(P, &FilterValue) -> Result<P, GridError> + Send + Sync + 'static,
    {
        self.filters.push(GridFilter {
            field: FilterField::new(name, widget, options),
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Replace all display fields.
    pub fn display_fields<I, T, A>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<Accessor<R>>,
    {
        self.display_fields = fields
            .into_iter()
            .map(|(title, accessor)| DisplayField {
                title: title.into(),
                accessor: accessor.into(),
            })
            .collect();
        self
    }

    /// Add a column; an existing column with the same title is replaced in place.
    pub fn add_display_field(mut self, title: impl Into<String>, accessor: impl Into<Accessor<R>>) -> Self {
        let title = title.into();
        let accessor = accessor.into();
        match self.display_fields.iter_mut().find(|f| f.title == title) {
            Some(existing) => existing.accessor = accessor,
            None => self.display_fields.push(DisplayField { title, accessor }),
        }
        self
    }

    pub fn remove_display_field(mut self, title: &str) -> Self {
        self.display_fields.retain(|f| f.title != title);
        self
    }

    pub fn add_action_link<F>(mut self, label: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&LinkContext, &R) -> Result<String, GridError> + Send + Sync + 'static,
    {
        self.actions.push(ActionLink {
            label: label.into(),
            builder: Arc::new(builder),
        });
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn labels(mut self, labels: GridLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn build(self) -> Result<GridDefinition<P, R>, GridError> {
        if self.id.is_empty() || !is_valid_grid_id(&self.id) {
            return Err(GridError::configuration(format!("invalid grid id {:?}", self.id)));
        }
        if self.page_size == 0 {
            return Err(GridError::configuration("page size must be at least 1"));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(GridError::configuration(format!(
                "invalid date format {:?}",
                self.date_format
            )));
        }
        for (i, filter) in self.filters.iter().enumerate() {
            let name = filter.field.name.as_str();
            if name.is_empty() || name == PAGE_PARAM || name.starts_with(ORDERING_PARAM) {
                return Err(GridError::configuration(format!("filter name {name:?} is reserved")));
            }
            if self.filters[..i].iter().any(|f| f.field.name == name) {
                return Err(GridError::configuration(format!("duplicate filter {name}")));
            }
        }
        Ok(GridDefinition {
            id: self.id,
            filters: self.filters,
            display_fields: self.display_fields,
            actions: self.actions,
            method: self.method,
            page_size: self.page_size,
            date_format: self.date_format,
            labels: self.labels,
        })
    }
}

pub(crate) fn is_valid_grid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
