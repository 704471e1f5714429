//! Request parameters and filter binding.
//!
//! A grid request is a flat list of form pairs: one per declared filter, the
//! hidden page field and the ordering clauses
//! (`_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=asc`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::definition::{FilterField, Widget};

pub const PAGE_PARAM: &str = "_page";
pub const ORDERING_PARAM: &str = "_datagrid_ordering";
pub const DEFAULT_PAGE: u32 = 1;
/// Cache-key marker for states whose predicates ran.
const SUBMITTED_MARKER: &str = "_submitted";

const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// Raw submitted parameters, in the order received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRequest {
    params: Vec<(String, String)>,
}

impl GridRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string (query string or form body).
    pub fn from_query(query: &str) -> Self {
        let params = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect();
        Self { params }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Last value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|(k, _)| k == name)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn has_ordering(&self) -> bool {
        self.params
            .iter()
            .any(|(k, _)| k.starts_with(ORDERING_PARAM))
    }

    /// Ordering clauses keyed by their submitted index, in index order.
    fn raw_ordering(&self) -> Result<Vec<(Option<String>, Option<String>)>, FieldError> {
        let mut clauses: BTreeMap<usize, (Option<String>, Option<String>)> = BTreeMap::new();
        for (key, value) in &self.params {
            let Some(rest) = key.strip_prefix(ORDERING_PARAM) else {
                continue;
            };
            let (index, part) = parse_ordering_key(rest)
                .ok_or_else(|| FieldError::new(ORDERING_PARAM, "Malformed ordering parameter."))?;
            let entry = clauses.entry(index).or_default();
            match part {
                "field" => entry.0 = Some(value.clone()),
                "direction" => entry.1 = Some(value.clone()),
                _ => {
                    return Err(FieldError::new(
                        ORDERING_PARAM,
                        "Malformed ordering parameter.",
                    ))
                }
            }
        }
        Ok(clauses.into_values().collect())
    }
}

/// Parses `[<index>][<part>]`.
fn parse_ordering_key(rest: &str) -> Option<(usize, &str)> {
    let rest = rest.strip_prefix('[')?;
    let (index, rest) = rest.split_once(']')?;
    let part = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some((index.parse().ok()?, part))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(format!("unknown direction {s}"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderClause {
    pub field: String,
    pub direction: Direction,
}

impl OrderClause {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Form pairs encoding an ordering list, in clause order.
pub fn ordering_pairs(ordering: &[OrderClause]) -> Vec<(String, String)> {
    ordering
        .iter()
        .enumerate()
        .flat_map(|(i, clause)| {
            [
                (format!("{ORDERING_PARAM}[{i}][field]"), clause.field.clone()),
                (
                    format!("{ORDERING_PARAM}[{i}][direction]"),
                    clause.direction.as_str().to_string(),
                ),
            ]
        })
        .collect()
}

/// A filter value after binding against its widget.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(v) => Some(*v as f64),
            FilterValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FilterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FilterValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Stable text form, used both for cache keys and to refill form inputs.
    pub fn canonical(&self) -> String {
        match self {
            FilterValue::Empty => String::new(),
            FilterValue::Text(text) => text.clone(),
            FilterValue::Integer(v) => v.to_string(),
            FilterValue::Number(v) => v.to_string(),
            FilterValue::Bool(true) => "1".into(),
            FilterValue::Bool(false) => "0".into(),
            FilterValue::Date(d) => d.format(DATE_INPUT_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Bound values for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    values: Vec<(String, FilterValue)>,
    pub page: u32,
    pub ordering: Vec<OrderClause>,
    submitted: bool,
}

impl FilterState {
    /// The unfiltered first page: every filter empty, no ordering.
    pub fn initial<'a>(fields: impl IntoIterator<Item = &'a FilterField>) -> Self {
        Self {
            values: fields
                .into_iter()
                .map(|f| (f.name.clone(), FilterValue::Empty))
                .collect(),
            page: DEFAULT_PAGE,
            ordering: Vec::new(),
            submitted: false,
        }
    }

    /// Whether predicates and ordering apply to this state.
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn value(&self, name: &str) -> &FilterValue {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or(&FilterValue::Empty)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Filters in declaration order, then page, then ordering clauses in order.
    /// Submitted states end with `_submitted=1`: a submitted form with every
    /// filter empty still runs its predicates, a first load does not.
    pub fn canonical_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .values
            .iter()
            .map(|(n, v)| (n.clone(), v.canonical()))
            .collect();
        pairs.push((PAGE_PARAM.to_string(), self.page.to_string()));
        pairs.extend(ordering_pairs(&self.ordering));
        if self.submitted {
            pairs.push((SUBMITTED_MARKER.to_string(), "1".to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// None of the grid's parameters were present (first load).
    NotSubmitted,
    Valid(FilterState),
    Invalid(Vec<FieldError>),
}

/// Bind a request against the declared filter fields.
///
/// The request counts as submitted when any declared filter, the page field
/// or an ordering parameter is present.
pub fn bind(fields: &[&FilterField], request: &GridRequest) -> Binding {
    let submitted = request.contains(PAGE_PARAM)
        || request.has_ordering()
        || fields.iter().any(|f| request.contains(&f.name));
    if !submitted {
        return Binding::NotSubmitted;
    }

    let mut errors = Vec::new();
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        match bind_field(field, request.get(&field.name)) {
            Ok(value) => values.push((field.name.clone(), value)),
            Err(message) => errors.push(FieldError::new(field.name.clone(), message)),
        }
    }

    let page = match request.get(PAGE_PARAM).map(str::trim) {
        None | Some("") => DEFAULT_PAGE,
        Some(raw) => match raw.parse::<u32>() {
            Ok(page) if page >= 1 => page,
            _ => {
                errors.push(FieldError::new(PAGE_PARAM, "Page must be a positive integer."));
                DEFAULT_PAGE
            }
        },
    };

    let ordering = match bind_ordering(request) {
        Ok(ordering) => ordering,
        Err(err) => {
            errors.push(err);
            Vec::new()
        }
    };

    if !errors.is_empty() {
        return Binding::Invalid(errors);
    }

    Binding::Valid(FilterState {
        values,
        page,
        ordering,
        submitted: true,
    })
}

fn bind_field(field: &FilterField, raw: Option<&str>) -> Result<FilterValue, &'static str> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        if field.options.required {
            return Err("This value should not be blank.");
        }
        return Ok(match field.widget {
            Widget::Checkbox => FilterValue::Bool(false),
            _ => FilterValue::Empty,
        });
    };

    match &field.widget {
        Widget::Text => Ok(FilterValue::Text(raw.to_string())),
        Widget::Integer => raw
            .parse()
            .map(FilterValue::Integer)
            .map_err(|_| "Please enter an integer."),
        Widget::Number => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FilterValue::Number(v)),
            _ => Err("Please enter a number."),
        },
        Widget::Checkbox => match raw.to_ascii_lowercase().as_str() {
            "1" | "on" | "true" | "yes" => Ok(FilterValue::Bool(true)),
            "0" | "off" | "false" | "no" => Ok(FilterValue::Bool(false)),
            _ => Err("Please tick or untick the box."),
        },
        Widget::Choice(choices) => {
            if choices.iter().any(|c| c.value == raw) {
                Ok(FilterValue::Text(raw.to_string()))
            } else {
                Err("The selected choice is invalid.")
            }
        }
        Widget::Date => NaiveDate::parse_from_str(raw, DATE_INPUT_FORMAT)
            .map(FilterValue::Date)
            .map_err(|_| "Please enter a valid date."),
    }
}

fn bind_ordering(request: &GridRequest) -> Result<Vec<OrderClause>, FieldError> {
    request
        .raw_ordering()?
        .into_iter()
        .map(|(field, direction)| {
            let field = field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| FieldError::new(ORDERING_PARAM, "Ordering field is missing."))?;
            let direction = direction
                .as_deref()
                .unwrap_or("asc")
                .parse::<Direction>()
                .map_err(|_| FieldError::new(ORDERING_PARAM, "Ordering direction must be asc or desc."))?;
            Ok(OrderClause { field, direction })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Choice, WidgetOptions};

    fn fields() -> Vec<FilterField> {
        vec![
            FilterField::new("name", Widget::Text, WidgetOptions::default()),
            FilterField::new("capacity", Widget::Integer, WidgetOptions::default()),
            FilterField::new(
                "region",
                Widget::Choice(vec![Choice::new("North", "north"), Choice::new("South", "south")]),
                WidgetOptions::default(),
            ),
            FilterField::new("active", Widget::Checkbox, WidgetOptions::default()),
        ]
    }

    fn bind_all(request: &GridRequest) -> Binding {
        let fields = fields();
        let refs: Vec<&FilterField> = fields.iter().collect();
        bind(&refs, request)
    }

    #[test]
    fn first_load_is_not_submitted() {
        assert_eq!(bind_all(&GridRequest::new()), Binding::NotSubmitted);
        let unrelated = GridRequest::from_query("utm_source=mail");
        assert_eq!(bind_all(&unrelated), Binding::NotSubmitted);
    }

    #[test]
    fn binds_values_page_and_ordering() {
        let request = GridRequest::from_query(
            "name=%20Gare%20&capacity=12&region=north&active=on&_page=3\
             &_datagrid_ordering[1][field]=capacity&_datagrid_ordering[1][direction]=DESC\
             &_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=asc",
        );
        let Binding::Valid(state) = bind_all(&request) else {
            panic!("expected a valid binding");
        };
        assert!(state.is_submitted());
        assert_eq!(state.value("name"), &FilterValue::Text("Gare".into()));
        assert_eq!(state.value("capacity"), &FilterValue::Integer(12));
        assert_eq!(state.value("active"), &FilterValue::Bool(true));
        assert_eq!(state.page, 3);
        assert_eq!(
            state.ordering,
            vec![OrderClause::asc("name"), OrderClause::desc("capacity")]
        );
    }

    #[test]
    fn empty_values_bind_to_empty() {
        let request = GridRequest::from_query("name=&_page=");
        let Binding::Valid(state) = bind_all(&request) else {
            panic!("expected a valid binding");
        };
        assert!(state.value("name").is_empty());
        assert_eq!(state.value("active"), &FilterValue::Bool(false));
        assert_eq!(state.page, 1);
    }

    #[test]
    fn collects_every_field_error() {
        let request = GridRequest::from_query(
            "capacity=lots&region=east&_page=0&_datagrid_ordering[0][field]=name&_datagrid_ordering[0][direction]=up",
        );
        let Binding::Invalid(errors) = bind_all(&request) else {
            panic!("expected an invalid binding");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["capacity", "region", "_page", "_datagrid_ordering"]);
    }

    #[test]
    fn canonical_pairs_ignore_parameter_order() {
        let a = GridRequest::from_query("name=x&capacity=3&_page=2");
        let b = GridRequest::from_query("_page=2&capacity=3&name=x");
        let (Binding::Valid(a), Binding::Valid(b)) = (bind_all(&a), bind_all(&b)) else {
            panic!("expected valid bindings");
        };
        assert_eq!(a.canonical_pairs(), b.canonical_pairs());
    }

    #[test]
    fn submitted_empty_form_differs_from_first_load() {
        let fields = fields();
        let first_load = FilterState::initial(fields.iter());
        let Binding::Valid(empty_submit) = bind_all(&GridRequest::from_query("name=")) else {
            panic!("expected a valid binding");
        };
        assert_eq!(empty_submit.value("name"), &FilterValue::Empty);
        assert_ne!(first_load.canonical_pairs(), empty_submit.canonical_pairs());
        assert!(!first_load
            .canonical_pairs()
            .iter()
            .any(|(name, _)| name == SUBMITTED_MARKER));
    }

    #[test]
    fn ordering_pairs_round_trip_through_request() {
        let ordering = vec![OrderClause::desc("name"), OrderClause::asc("id")];
        let request = GridRequest::from_pairs(ordering_pairs(&ordering));
        assert_eq!(bind_ordering(&request).unwrap(), ordering);
    }
}
