use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

use crate::config::{KeyColumn, ReportSection};
use crate::models::RankedCount;
use crate::processor::{DiscoveryStrategy, Extraction, column_as_strings, parse_timestamp, rank_labels};

const TOP_VALUES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub non_null: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFieldSummary {
    pub column: String,
    pub title: String,
    /// `None` when the column does not exist in the table.
    pub top_values: Option<Vec<RankedCount>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSpan {
    pub column: String,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub unparsed: usize,
}

/// Structural summary of a flattened ticket table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    pub strategy: DiscoveryStrategy,
    pub top_level_keys: Vec<String>,
    pub skipped_lines: Vec<usize>,
    pub skipped_elements: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
    /// Columns with at least one missing cell, most missing first.
    pub missing: Vec<MissingCount>,
    pub key_fields: Vec<KeyFieldSummary>,
    pub date_span: Option<DateSpan>,
}

pub struct DataProfiler {
    key_columns: Vec<KeyColumn>,
    date_column: String,
}

impl DataProfiler {
    pub fn new() -> Self {
        Self::from_report_config(&ReportSection::default())
    }

    pub fn from_report_config(report: &ReportSection) -> Self {
        DataProfiler {
            key_columns: report.key_columns.clone(),
            date_column: report.date_column.clone(),
        }
    }

    pub fn profile(&self, extraction: &Extraction, df: &DataFrame) -> Result<ProfileReport> {
        let height = df.height();

        let columns: Vec<ColumnProfile> = df
            .get_columns()
            .iter()
            .map(|col| ColumnProfile {
                name: col.name().to_string(),
                dtype: col.dtype().to_string(),
                non_null: height - col.null_count(),
            })
            .collect();

        let mut missing: Vec<MissingCount> = columns
            .iter()
            .filter(|c| c.non_null < height)
            .map(|c| MissingCount {
                column: c.name.clone(),
                missing: height - c.non_null,
            })
            .collect();
        missing.sort_by(|a, b| b.missing.cmp(&a.missing));

        let mut key_fields = Vec::with_capacity(self.key_columns.len());
        for key in &self.key_columns {
            let top_values = if has_column(df, &key.column) {
                let values = column_as_strings(df, &key.column)?;
                Some(rank_labels(values.iter().flatten().map(String::as_str), TOP_VALUES))
            } else {
                None
            };
            key_fields.push(KeyFieldSummary {
                column: key.column.clone(),
                title: key.title.clone(),
                top_values,
            });
        }

        let date_span = if has_column(df, &self.date_column) {
            Some(self.date_span(df)?)
        } else {
            None
        };

        Ok(ProfileReport {
            strategy: extraction.strategy.clone(),
            top_level_keys: extraction.top_level_keys.clone(),
            skipped_lines: extraction.skipped_lines.clone(),
            skipped_elements: extraction.skipped_elements,
            row_count: height,
            column_count: df.width(),
            columns,
            missing,
            key_fields,
            date_span,
        })
    }

    fn date_span(&self, df: &DataFrame) -> Result<DateSpan> {
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut latest: Option<DateTime<Utc>> = None;
        let mut unparsed = 0;

        for raw in column_as_strings(df, &self.date_column)?.into_iter().flatten() {
            match parse_timestamp(&raw) {
                Some(ts) => {
                    earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
                    latest = Some(latest.map_or(ts, |l| l.max(ts)));
                }
                None => unparsed += 1,
            }
        }

        Ok(DateSpan {
            column: self.date_column.clone(),
            earliest,
            latest,
            unparsed,
        })
    }
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new()
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{}", rule)?;
        writeln!(f, "DATA PROFILING REPORT")?;
        writeln!(f, "{}", rule)?;

        writeln!(f, "\n--- 1. Basic Information ---")?;
        writeln!(f, "Ticket list located via: {}", self.strategy)?;
        if !self.top_level_keys.is_empty() {
            writeln!(f, "Top-level keys: {:?}", self.top_level_keys)?;
        }
        if !self.skipped_lines.is_empty() {
            writeln!(
                f,
                "Skipped {} malformed lines: {:?}",
                self.skipped_lines.len(),
                self.skipped_lines
            )?;
        }
        if self.skipped_elements > 0 {
            writeln!(f, "Skipped {} non-object list elements", self.skipped_elements)?;
        }
        writeln!(f, "Total number of tickets found: {}", self.row_count)?;
        writeln!(f, "Total number of columns (fields) found: {}", self.column_count)?;

        writeln!(f, "\n--- 2. Column Names & Data Types ---")?;
        let width = self.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for (i, column) in self.columns.iter().enumerate() {
            writeln!(
                f,
                "{:>4}  {:<width$}  {:>8} non-null  {}",
                i,
                column.name,
                column.non_null,
                column.dtype,
                width = width
            )?;
        }

        writeln!(f, "\n--- 3. Missing Data Report ---")?;
        if self.missing.is_empty() {
            writeln!(f, "No missing data found.")?;
        } else {
            for entry in &self.missing {
                writeln!(f, "{:<width$}  {}", entry.column, entry.missing, width = width)?;
            }
        }

        writeln!(f, "\n--- 4. Analysis of Key Fields ---")?;
        for field in &self.key_fields {
            match &field.top_values {
                Some(values) => {
                    writeln!(f, "\n--- Top {} Values for '{}' ---", TOP_VALUES, field.title)?;
                    for value in values {
                        writeln!(f, "{:<30} {}", value.label, value.count)?;
                    }
                }
                None => writeln!(f, "\n--- Column '{}' not found. Skipping analysis. ---", field.column)?,
            }
        }

        if let Some(span) = &self.date_span {
            writeln!(f, "\n--- 5. Date Range of Tickets ---")?;
            match (span.earliest, span.latest) {
                (Some(earliest), Some(latest)) => {
                    writeln!(f, "Earliest Ticket: {}", earliest)?;
                    writeln!(f, "Latest Ticket:   {}", latest)?;
                }
                _ => writeln!(f, "No parseable timestamps in '{}'", span.column)?,
            }
            if span.unparsed > 0 {
                writeln!(f, "Unparseable timestamps: {}", span.unparsed)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{InputFormat, JsonFlattener, RecordExtractor};
    use chrono::TimeZone;

    fn profile(input: &str, format: InputFormat) -> ProfileReport {
        let extraction = RecordExtractor::new().extract(input.as_bytes(), format).unwrap();
        let df = JsonFlattener::new().flatten_to_dataframe(&extraction.records).unwrap();
        DataProfiler::new().profile(&extraction, &df).unwrap()
    }

    const EXPORT: &str = r#"{
        "count": 4,
        "results": [
            {"id": 1, "status": "open", "priority": "high", "via": {"channel": "email"}, "created_at": "2024-11-02T08:00:00Z"},
            {"id": 2, "status": "solved", "priority": null, "via": {"channel": "web"}, "created_at": "2025-01-15T10:30:00Z"},
            {"id": 3, "status": "open", "via": {"channel": "email"}, "created_at": "2024-07-19T16:45:00Z"},
            {"id": 4, "status": "pending", "created_at": "not a date"}
        ]
    }"#;

    #[test]
    fn test_basic_counts_and_missing() {
        let report = profile(EXPORT, InputFormat::Document);

        assert_eq!(report.strategy, DiscoveryStrategy::CandidateKey("results".to_string()));
        assert_eq!(report.top_level_keys, vec!["count", "results"]);
        assert_eq!(report.row_count, 4);
        assert_eq!(report.column_count, 5);
        assert_eq!(
            report.missing,
            vec![
                MissingCount { column: "priority".to_string(), missing: 3 },
                MissingCount { column: "via.channel".to_string(), missing: 1 },
            ]
        );
        assert_eq!(report.columns[0].dtype, DataType::Int64.to_string());
    }

    #[test]
    fn test_key_fields_and_missing_column_notice() {
        let report = profile(EXPORT, InputFormat::Document);

        let status = &report.key_fields[0];
        assert_eq!(status.title, "Status");
        assert_eq!(
            status.top_values.as_ref().unwrap()[0],
            RankedCount { label: "open".to_string(), count: 2 }
        );

        let channel = &report.key_fields[1];
        assert_eq!(channel.top_values.as_ref().unwrap().len(), 2);

        let text = profile(r#"[{"id": 1}]"#, InputFormat::Document).to_string();
        assert!(text.contains("Column 'status' not found. Skipping analysis."));
        assert!(text.contains("No missing data found."));
    }

    #[test]
    fn test_date_span() {
        let report = profile(EXPORT, InputFormat::Document);
        let span = report.date_span.unwrap();

        assert_eq!(span.earliest, Some(Utc.with_ymd_and_hms(2024, 7, 19, 16, 45, 0).unwrap()));
        assert_eq!(span.latest, Some(Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()));
        assert_eq!(span.unparsed, 1);
    }

    #[test]
    fn test_skipped_lines_are_reported() {
        let input = "{\"id\": 1, \"status\": \"open\"}\noops\n{\"id\": 2, \"status\": \"open\"}\n";
        let report = profile(input, InputFormat::Lines);

        assert_eq!(report.skipped_lines, vec![2]);
        assert!(report.date_span.is_none());
        assert!(report.to_string().contains("Skipped 1 malformed lines: [2]"));
    }
}
