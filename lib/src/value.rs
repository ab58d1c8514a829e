//! Row values and the JSON row caches.
//!
//! A row maps binding names (`dcterms_title`, `uri`, ...) to scalar values. An absent
//! key means the binding was unbound. Dates are written as ISO-8601 strings and turned
//! back into dates on load for a fixed set of field names, so a cache written and read
//! again compares equal to the rows it was written from.

use crate::errors::FacetError;
use crate::util::atomic_write;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use log::debug;
use serde::{Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

pub type Row = BTreeMap<String, Value>;

/// Fields of `toc/faceted_data.json` holding dates.
pub const FACETED_DATA_DATE_FIELDS: &[&str] = &["dcterms_issued"];

/// Fields of `feed/faceted_entries.json` holding dates.
pub const FACETED_ENTRIES_DATE_FIELDS: &[&str] = &[
    "published",
    "updated",
    "dcterms_issued",
    "rpubl_avgorandedatum",
    "orig_created",
    "orig_updated",
];

impl Value {
    pub fn str<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    /// Parses an ISO date or datetime, returning `None` for anything else.
    pub fn parse_date(s: &str) -> Option<Value> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Value::DateTime(dt));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Value::DateTime(dt.naive_utc()));
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Value::Date(d));
        }
        None
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_date(&self) -> bool {
        !matches!(self, Value::Str(_))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Value::Str(s) => Value::parse_date(s).and_then(|v| v.date()),
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) if dt.nanosecond() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S"))
            }
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// Looks up `binding` in `row`, failing the way a facet strategy expects.
pub fn get<'a>(row: &'a Row, binding: &str) -> Result<&'a Value, FacetError> {
    row.get(binding)
        .ok_or_else(|| FacetError::MissingBinding(binding.to_string()))
}

/// Like [`get`], but the value rendered as text.
pub fn get_text(row: &Row, binding: &str) -> Result<String, FacetError> {
    get(row, binding).map(|v| v.to_string())
}

/// Converts a decoded JSON object into a row, turning ISO strings in `date_fields` into dates.
pub fn row_from_json(
    object: serde_json::Map<String, serde_json::Value>,
    date_fields: &BTreeSet<&str>,
) -> Row {
    let mut row = Row::new();
    for (key, value) in object {
        let value = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => {
                if date_fields.contains(key.as_str()) {
                    Value::parse_date(&s).unwrap_or(Value::Str(s))
                } else {
                    Value::Str(s)
                }
            }
            other => Value::Str(other.to_string()),
        };
        row.insert(key, value);
    }
    row
}

/// Turns string values of `date_fields` holding ISO dates into dates, the same way
/// [`read_rows`] does for cached rows.
pub fn parse_date_fields(row: &mut Row, date_fields: &[&str]) {
    for field in date_fields {
        let parsed = match row.get(*field) {
            Some(Value::Str(s)) => Value::parse_date(s),
            _ => None,
        };
        if let Some(date) = parsed {
            row.insert(field.to_string(), date);
        }
    }
}

pub fn read_rows(path: &Path, date_fields: &[&str]) -> Result<Vec<Row>> {
    debug!("Loading rows from {}", path.display());
    let file = std::fs::File::open(path)?;
    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(BufReader::new(file))?;
    let date_fields: BTreeSet<&str> = date_fields.iter().copied().collect();
    Ok(objects
        .into_iter()
        .map(|o| row_from_json(o, &date_fields))
        .collect())
}

/// Pretty JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Writes the rows atomically. An empty row list removes the cache instead.
pub fn write_rows(path: &Path, rows: &[Row]) -> Result<()> {
    if rows.is_empty() {
        debug!("No rows, removing {}", path.display());
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        return Ok(());
    }
    debug!("Saving {} rows to {}", rows.len(), path.display());
    atomic_write(path, &to_pretty_json(rows)?)
}
