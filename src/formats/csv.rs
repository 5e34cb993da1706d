//! CSV handlers for JSON:API documents.
//!
//! CSV is flat, JSON:API resources are not, so nested members are
//! flattened into dot-joined column names on the way out and rebuilt on
//! the way in:
//!
//! ```text
//! {"type": "person", "attributes": {"name": "one"}}
//!     <=>
//! attributes.name,type
//! one,person
//! ```

use std::collections::BTreeSet;

use bytes::Bytes;
use serde_json::{json, Map, Value};

use crate::error::{ConnegError, Result};
use crate::media::MediaType;

/// Flatten a value into dot-joined keys.
///
/// Objects contribute their member names, arrays their indices; scalars
/// become leaves. Empty objects and arrays produce no keys.
///
/// ```
/// use conneg::formats::csv::flatten;
/// use serde_json::json;
///
/// let flat = flatten(&json!({"a": {"b": 1}, "c": [true, null]}));
/// assert_eq!(flat["a.b"], 1);
/// assert_eq!(flat["c.0"], true);
/// assert!(flat["c.1"].is_null());
/// ```
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(value, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Map<String, Value>) {
    match value {
        Value::Object(members) => {
            for (name, member) in members {
                flatten_into(member, &format!("{prefix}{name}."), out);
            }
        },
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(item, &format!("{prefix}{index}."), out);
            }
        },
        leaf => {
            let key = prefix.strip_suffix('.').unwrap_or(prefix);
            out.insert(key.to_string(), leaf.clone());
        },
    }
}

/// Rebuild a nested object from dot-joined keys.
///
/// A later key that descends through a path holding a scalar replaces that
/// scalar with an object.
pub fn unflatten<I>(entries: I) -> Value
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut output = Map::new();
    for (key, value) in entries {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut output, &segments, value);
    }
    Value::Object(output)
}

fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {},
        [last] => {
            target.insert((*last).to_string(), value);
        },
        [head, rest @ ..] => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_path(child, rest, value);
            }
        },
    }
}

/// Render the `data` member of a document as CSV.
///
/// A single resource is written as one row. Columns are the sorted union
/// of every row's flattened keys; missing cells are left empty.
pub fn render(document: &Value) -> Result<Bytes> {
    let data = document.get("data").ok_or_else(|| {
        ConnegError::Render("CSV output needs a document with a `data` member".into())
    })?;

    let rows: Vec<Map<String, Value>> = match data {
        Value::Array(items) => items.iter().map(flatten).collect(),
        Value::Null => Vec::new(),
        single => vec![flatten(single)],
    };

    let fields: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    if fields.is_empty() {
        return Ok(Bytes::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&fields)
        .map_err(|e| ConnegError::Render(e.to_string()))?;
    for row in &rows {
        writer
            .write_record(fields.iter().map(|field| cell(row.get(*field))))
            .map_err(|e| ConnegError::Render(e.to_string()))?;
    }

    writer
        .into_inner()
        .map(Bytes::from)
        .map_err(|e| ConnegError::Render(e.to_string()))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse a CSV body into a single-resource document.
///
/// Only the first data row is used; the header row supplies the
/// dot-joined member names. Every value arrives as a string.
pub fn parse(body: &[u8], media_type: &MediaType) -> Result<Value> {
    if let Some(charset) = media_type.charset() {
        if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
            return Err(ConnegError::Parse(format!("unsupported CSV charset {charset:?}")));
        }
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(body);
    let headers = reader.headers()?.clone();

    let mut records = reader.records();
    let first = records
        .next()
        .ok_or_else(|| ConnegError::Parse("CSV body contains no data rows".into()))??;

    let ignored = records.count();
    if ignored > 0 {
        tracing::debug!(ignored, "CSV body has extra rows, using the first one");
    }

    let row = headers
        .iter()
        .zip(first.iter())
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())));

    Ok(json!({ "data": unflatten(row) }))
}
