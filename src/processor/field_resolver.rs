use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::RawTicket;

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Id,
    Sku,
    Description,
    CreatedAt,
}

/// Candidate column names for each canonical ticket field, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCandidates {
    pub id: Vec<String>,
    pub sku: Vec<String>,
    pub description: Vec<String>,
    pub created_at: Vec<String>,
}

impl Default for FieldCandidates {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        FieldCandidates {
            id: owned(&["id", "ticket_id"]),
            sku: owned(&["sku", "product_sku", "custom_fields.sku", "product_id"]),
            description: owned(&["description", "body", "raw_subject", "subject"]),
            created_at: owned(&["created_at", "created_date", "date"]),
        }
    }
}

/// Maps the columns of a flattened ticket table onto the canonical ticket fields.
pub struct FieldResolver {
    field_mappings: FieldCandidates,
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::with_candidates(FieldCandidates::default())
    }

    pub fn with_candidates(field_mappings: FieldCandidates) -> Self {
        FieldResolver { field_mappings }
    }

    fn candidates(&self, field: TicketField) -> &[String] {
        match field {
            TicketField::Id => &self.field_mappings.id,
            TicketField::Sku => &self.field_mappings.sku,
            TicketField::Description => &self.field_mappings.description,
            TicketField::CreatedAt => &self.field_mappings.created_at,
        }
    }

    /// Exact name match wins over a loose one (case and `_`/`-`/space insensitive);
    /// within each pass candidates are tried in their configured order.
    pub fn resolve_column(&self, field: TicketField, columns: &[String]) -> Option<String> {
        let candidates = self.candidates(field);

        for candidate in candidates {
            if columns.iter().any(|c| c == candidate) {
                return Some(candidate.clone());
            }
        }

        for candidate in candidates {
            let normalized_candidate = normalize_field_name(candidate);
            if let Some(column) = columns
                .iter()
                .find(|c| normalize_field_name(c) == normalized_candidate)
            {
                return Some(column.clone());
            }
        }

        None
    }

    /// Reads one `RawTicket` per table row. Missing ids become `row-<n>`, missing
    /// descriptions become empty, and missing or unparseable timestamps fall back to
    /// `ingested_at`.
    pub fn resolve_tickets(&self, df: &DataFrame, ingested_at: DateTime<Utc>) -> Result<Vec<RawTicket>> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let height = df.height();

        let read = |field: TicketField| -> Result<Vec<Option<String>>> {
            match self.resolve_column(field, &columns) {
                Some(name) => {
                    info!("Resolved {:?} from column '{}'", field, name);
                    column_as_strings(df, &name)
                }
                None => {
                    warn!("No column found for {:?}; candidates were {:?}", field, self.candidates(field));
                    Ok(vec![None; height])
                }
            }
        };

        let ids = read(TicketField::Id)?;
        let skus = read(TicketField::Sku)?;
        let descriptions = read(TicketField::Description)?;
        let created = read(TicketField::CreatedAt)?;

        let mut tickets = Vec::with_capacity(height);
        let mut seen_ids = HashSet::new();
        let mut assigned_ids = 0;
        let mut assigned_timestamps = 0;
        let mut duplicate_ids = 0;

        for row in 0..height {
            let id = match non_blank(&ids[row]) {
                Some(id) => id,
                None => {
                    assigned_ids += 1;
                    format!("row-{}", row + 1)
                }
            };
            if !seen_ids.insert(id.clone()) {
                duplicate_ids += 1;
            }

            let created_at = match created[row].as_deref() {
                Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                    warn!("Ticket {}: unparseable timestamp '{}', using ingestion time", id, raw);
                    assigned_timestamps += 1;
                    ingested_at
                }),
                None => {
                    assigned_timestamps += 1;
                    ingested_at
                }
            };

            tickets.push(RawTicket {
                id,
                sku: non_blank(&skus[row]),
                description: descriptions[row].clone().unwrap_or_default(),
                created_at,
            });
        }

        if duplicate_ids > 0 {
            warn!("{} tickets share an identifier with an earlier ticket", duplicate_ids);
        }
        info!(
            "Resolved {} tickets ({} assigned ids, {} ingestion timestamps)",
            tickets.len(),
            assigned_ids,
            assigned_timestamps
        );

        Ok(tickets)
    }
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_field_name(name: &str) -> String {
    name.to_lowercase()
        .replace("_", "")
        .replace("-", "")
        .replace(" ", "")
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Any column rendered as optional strings; nulls stay `None`.
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let casted = df.column(name)?.cast(&DataType::String)?;
    let values = casted.str()?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]`, bare dates and integer epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::JsonFlattener;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn frame(values: Vec<Value>) -> DataFrame {
        let records: Vec<_> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        JsonFlattener::new().flatten_to_dataframe(&records).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_preferred() {
        let resolver = FieldResolver::new();
        let columns = cols(&["ticket_id", "id", "Description"]);

        assert_eq!(
            resolver.resolve_column(TicketField::Id, &columns),
            Some("id".to_string())
        );
        assert_eq!(
            resolver.resolve_column(TicketField::Description, &columns),
            Some("Description".to_string())
        );
    }

    #[test]
    fn test_loose_match_and_missing() {
        let resolver = FieldResolver::new();
        let columns = cols(&["Created-At", "custom_fields.SKU"]);

        assert_eq!(
            resolver.resolve_column(TicketField::CreatedAt, &columns),
            Some("Created-At".to_string())
        );
        assert_eq!(
            resolver.resolve_column(TicketField::Sku, &columns),
            Some("custom_fields.SKU".to_string())
        );
        assert_eq!(resolver.resolve_column(TicketField::Description, &columns), None);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_field_name("created_at"), "createdat");
        assert_eq!(normalize_field_name("Created-At"), "createdat");
        assert_eq!(normalize_field_name("Created At"), "createdat");
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-14T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-14T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-14 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2025-03-14T09:30:00 "), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-14"),
            Some(Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("1741944600"), Some(expected));
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn test_resolve_tickets_fills_gaps() {
        let resolver = FieldResolver::new();
        let ingested_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let df = frame(vec![
            json!({"id": 1001, "sku": "AS-2801", "description": "Leaking", "created_at": "2025-01-05T10:00:00Z"}),
            json!({"sku": " ", "description": "How do I install it?"}),
            json!({"id": 1003, "created_at": "garbage"}),
        ]);

        let tickets = resolver.resolve_tickets(&df, ingested_at).unwrap();
        assert_eq!(tickets.len(), 3);

        assert_eq!(tickets[0].id, "1001");
        assert_eq!(tickets[0].sku.as_deref(), Some("AS-2801"));
        assert_eq!(
            tickets[0].created_at,
            Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap()
        );

        assert_eq!(tickets[1].id, "row-2");
        assert_eq!(tickets[1].sku, None);
        assert_eq!(tickets[1].created_at, ingested_at);

        assert_eq!(tickets[2].description, "");
        assert_eq!(tickets[2].created_at, ingested_at);
    }
}
