use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{AnalyzerError, Result};

pub const DEFAULT_CANDIDATE_KEYS: [&str; 4] = ["results", "tickets", "exports", "audits"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Line mode for `.jsonl`/`.ndjson` paths, document mode for everything else.
    #[default]
    Auto,
    Document,
    Lines,
}

impl InputFormat {
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                    InputFormat::Lines
                }
                _ => InputFormat::Document,
            },
            other => other,
        }
    }
}

/// How the ticket list was located in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiscoveryStrategy {
    RootArray,
    CandidateKey(String),
    FirstListMember(String),
    LineDelimited,
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryStrategy::RootArray => write!(f, "root array"),
            DiscoveryStrategy::CandidateKey(key) => write!(f, "common key '{}'", key),
            DiscoveryStrategy::FirstListMember(key) => write!(f, "first list under key '{}'", key),
            DiscoveryStrategy::LineDelimited => write!(f, "newline-delimited records"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Map<String, Value>>,
    pub strategy: DiscoveryStrategy,
    /// Top-level keys of an object root, in declaration order. Empty otherwise.
    pub top_level_keys: Vec<String>,
    /// 1-based line numbers that failed to parse as a JSON object (line mode).
    pub skipped_lines: Vec<usize>,
    /// Array elements that were not objects (document mode).
    pub skipped_elements: usize,
}

impl Extraction {
    pub fn skipped(&self) -> usize {
        self.skipped_lines.len() + self.skipped_elements
    }
}

pub struct RecordExtractor {
    candidate_keys: Vec<String>,
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self::with_candidate_keys(DEFAULT_CANDIDATE_KEYS.iter().map(|k| k.to_string()).collect())
    }

    pub fn with_candidate_keys(candidate_keys: Vec<String>) -> Self {
        RecordExtractor { candidate_keys }
    }

    /// Raw file bytes in, records out. Line mode decodes each line on its own, so
    /// one line of invalid UTF-8 is skipped like any other malformed line.
    pub fn extract(&self, input: &[u8], format: InputFormat) -> Result<Extraction> {
        match format {
            InputFormat::Lines => self.extract_lines(input),
            InputFormat::Document | InputFormat::Auto => self.extract_document(input),
        }
    }

    pub fn extract_document(&self, input: &[u8]) -> Result<Extraction> {
        let root: Value = serde_json::from_slice(input)
            .map_err(|source| AnalyzerError::MalformedDocument { source })?;

        let (items, strategy, top_level_keys) = match root {
            Value::Array(items) => (items, DiscoveryStrategy::RootArray, Vec::new()),
            Value::Object(mut map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                info!("Found top-level keys in the JSON object: {:?}", keys);

                let (key, strategy) = self.discover_list_key(&map).ok_or_else(|| {
                    AnalyzerError::SchemaDiscovery {
                        root_kind: "object",
                        keys: keys.clone(),
                    }
                })?;

                let items = match map.remove(&key) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                (items, strategy, keys)
            }
            other => {
                return Err(AnalyzerError::SchemaDiscovery {
                    root_kind: json_kind(&other),
                    keys: Vec::new(),
                });
            }
        };

        info!("Located ticket list via {}", strategy);

        let total = items.len();
        let mut records = Vec::with_capacity(total);
        let mut skipped_elements = 0;

        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(record) => records.push(record),
                other => {
                    skipped_elements += 1;
                    warn!(
                        "Skipping element {} of the ticket list: expected an object, found {}",
                        index,
                        json_kind(&other)
                    );
                }
            }
        }

        if records.is_empty() {
            return Err(AnalyzerError::NoValidRecords {
                skipped: skipped_elements,
                total,
            });
        }

        info!(
            "Extraction summary: {} records, {} skipped elements",
            records.len(),
            skipped_elements
        );

        Ok(Extraction {
            records,
            strategy,
            top_level_keys,
            skipped_lines: Vec::new(),
            skipped_elements,
        })
    }

    /// Parses one JSON object per line. Bad lines are skipped and reported, never fatal,
    /// unless no line at all yields a record. Blank lines are ignored.
    pub fn extract_lines<R: BufRead>(&self, reader: R) -> Result<Extraction> {
        let mut records = Vec::new();
        let mut skipped_lines = Vec::new();
        let mut total = 0;

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read line {}: {}", line_no, e);
                    total += 1;
                    skipped_lines.push(line_no);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            total += 1;

            match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(record)) => records.push(record),
                Ok(other) => {
                    warn!(
                        "Skipping line {}: expected a JSON object, found {}",
                        line_no,
                        json_kind(&other)
                    );
                    skipped_lines.push(line_no);
                }
                Err(e) => {
                    warn!("Skipping line {}: {}", line_no, e);
                    skipped_lines.push(line_no);
                }
            }
        }

        if records.is_empty() {
            return Err(AnalyzerError::NoValidRecords {
                skipped: skipped_lines.len(),
                total,
            });
        }

        info!(
            "Extraction summary: {} records, {} skipped lines out of {}",
            records.len(),
            skipped_lines.len(),
            total
        );

        Ok(Extraction {
            records,
            strategy: DiscoveryStrategy::LineDelimited,
            top_level_keys: Vec::new(),
            skipped_lines,
            skipped_elements: 0,
        })
    }

    /// Preferred keys first, then the first list-valued member in declaration order.
    fn discover_list_key(&self, map: &Map<String, Value>) -> Option<(String, DiscoveryStrategy)> {
        for key in &self.candidate_keys {
            if matches!(map.get(key), Some(Value::Array(_))) {
                debug!("Candidate key '{}' holds a list", key);
                return Some((key.clone(), DiscoveryStrategy::CandidateKey(key.clone())));
            }
        }

        map.iter()
            .find(|(_, value)| value.is_array())
            .map(|(key, _)| (key.clone(), DiscoveryStrategy::FirstListMember(key.clone())))
    }
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
