use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field value read off a domain row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Display form. Dates use `date_format` (strftime syntax); everything else
    /// uses its plain string form.
    pub fn display(&self, date_format: &str) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Integer(v) => v.to_string(),
            CellValue::Number(v) => v.to_string(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Date(d) => d.format(date_format).to_string(),
            CellValue::DateTime(dt) => dt.format(date_format).to_string(),
            CellValue::Timestamp(ts) => ts.format(date_format).to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Bool(_) => 1,
            CellValue::Integer(_) | CellValue::Number(_) => 2,
            CellValue::Date(_) | CellValue::DateTime(_) | CellValue::Timestamp(_) => 3,
            CellValue::Text(_) => 4,
        }
    }

    /// Total order used by in-memory sorting. Nulls sort first, numbers compare
    /// across integer/float, dates compare across their representations.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => a
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&b.as_f64().unwrap_or_default()),
            (a, b) if a.rank() == 3 && b.rank() == 3 => a.as_naive_datetime().cmp(&b.as_naive_datetime()),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    fn as_naive_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => d.and_hms_opt(0, 0, 0),
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Timestamp(ts) => Some(ts.naive_utc()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::Timestamp(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Domain rows expose their fields by name so display columns and in-memory
/// sorting can reach them. Returning `None` means the row has no such field.
pub trait GridRow {
    fn field(&self, name: &str) -> Option<CellValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_use_configured_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(CellValue::Date(date).display("%d/%m/%Y"), "09/03/2024");
        assert_eq!(CellValue::Date(date).display("%Y-%m-%d"), "2024-03-09");
        assert_eq!(CellValue::Null.display("%d/%m/%Y"), "");
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert_eq!(
            CellValue::Integer(2).sort_cmp(&CellValue::Number(2.5)),
            Ordering::Less
        );
        assert_eq!(
            CellValue::Null.sort_cmp(&CellValue::Text("a".into())),
            Ordering::Less
        );
    }
}
