use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::Result;

/// Logical type picked for a flattened column from the JSON values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
}

/// Flattens nested ticket objects into a table with one dotted-path column per leaf,
/// e.g. `{"via": {"channel": "email"}}` becomes column `via.channel`.
///
/// The column set is the union of leaves across all records, in first-seen order.
/// A record without a given leaf, or with an explicit JSON `null`, gets a null cell.
pub struct JsonFlattener {
    separator: String,
}

impl JsonFlattener {
    pub fn new() -> Self {
        Self::with_separator(".")
    }

    pub fn with_separator(separator: impl Into<String>) -> Self {
        JsonFlattener {
            separator: separator.into(),
        }
    }

    pub fn flatten_to_dataframe(&self, records: &[Map<String, Value>]) -> Result<DataFrame> {
        if records.is_empty() {
            return Ok(DataFrame::empty());
        }

        let mut column_index: HashMap<String, usize> = HashMap::new();
        let mut columns: Vec<(String, Vec<Option<Value>>)> = Vec::new();

        for (row, record) in records.iter().enumerate() {
            for (path, value) in self.flatten_record(record) {
                let idx = *column_index.entry(path.clone()).or_insert_with(|| {
                    debug!("New column '{}' first seen at row {}", path, row);
                    columns.push((path, Vec::new()));
                    columns.len() - 1
                });

                let cells = &mut columns[idx].1;
                if cells.len() == row + 1 {
                    // `{"a.b": 1, "a": {"b": 2}}` collides on one path; last one wins.
                    cells[row] = value;
                } else {
                    cells.resize(row, None);
                    cells.push(value);
                }
            }
        }

        let height = records.len();
        let mut series_vec = Vec::with_capacity(columns.len());
        for (name, mut cells) in columns {
            cells.resize(height, None);
            series_vec.push(build_series(&name, &cells).into());
        }

        let df = DataFrame::new(series_vec)?;
        info!(
            "Flattened {} records into {} columns",
            df.height(),
            df.width()
        );

        Ok(df)
    }

    /// Leaf paths of one record in declaration order. Nulls become `None`; arrays are
    /// kept whole as leaves; empty objects contribute nothing.
    pub fn flatten_record(&self, record: &Map<String, Value>) -> Vec<(String, Option<Value>)> {
        let mut leaves = Vec::new();
        self.collect_leaves(None, record, &mut leaves);
        leaves
    }

    fn collect_leaves(
        &self,
        prefix: Option<&str>,
        object: &Map<String, Value>,
        leaves: &mut Vec<(String, Option<Value>)>,
    ) {
        for (key, value) in object {
            let path = match prefix {
                Some(prefix) => format!("{}{}{}", prefix, self.separator, key),
                None => key.clone(),
            };

            match value {
                Value::Object(nested) => self.collect_leaves(Some(&path), nested, leaves),
                Value::Null => leaves.push((path, None)),
                other => leaves.push((path, Some(other.clone()))),
            }
        }
    }
}

impl Default for JsonFlattener {
    fn default() -> Self {
        Self::new()
    }
}

fn infer_kind(cells: &[Option<Value>]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;

    for value in cells.iter().flatten() {
        let this = match value {
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Number(n) if n.is_i64() => ColumnKind::Integer,
            Value::Number(_) => ColumnKind::Float,
            _ => return ColumnKind::Text,
        };

        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Integer), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
            _ => return ColumnKind::Text,
        });
    }

    kind.unwrap_or(ColumnKind::Text)
}

fn build_series(name: &str, cells: &[Option<Value>]) -> Series {
    match infer_kind(cells) {
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells.iter().map(|c| c.as_ref().and_then(Value::as_bool)).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells.iter().map(|c| c.as_ref().and_then(Value::as_i64)).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_ref().and_then(Value::as_f64)).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells.iter().map(|c| c.as_ref().map(value_to_text)).collect();
            Series::new(name.into(), values)
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
