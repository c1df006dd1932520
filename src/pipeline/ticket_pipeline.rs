use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::dataset::{IngestSummary, TicketDataset};
use super::memo::digest;
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::Ticket;
use crate::processor::{
    Extraction, FieldResolver, InputFormat, JsonFlattener, ProductCatalog, RecordExtractor, TextNormalizer,
    TopicClassifier, enrich,
};

/// Raw input to `TicketDataset`: extract, flatten, resolve fields, derive tokens
/// and topic, then join against the product catalog.
pub struct TicketPipeline {
    extractor: RecordExtractor,
    flattener: JsonFlattener,
    resolver: FieldResolver,
    normalizer: TextNormalizer,
    classifier: TopicClassifier,
    catalog: Arc<ProductCatalog>,
    settings_fingerprint: String,
}

impl TicketPipeline {
    pub fn new(catalog: Arc<ProductCatalog>) -> Result<Self> {
        Self::from_config(&AnalyzerConfig::default(), catalog)
    }

    pub fn from_config(config: &AnalyzerConfig, catalog: Arc<ProductCatalog>) -> Result<Self> {
        let classifier = TopicClassifier::from_keywords(
            &config.classifier.return_keywords,
            &config.classifier.defect_keywords,
        )?;
        let normalizer = TextNormalizer::new().extend_stop_words(config.text.extra_stop_words.iter().cloned());

        let settings = [
            serde_json::to_vec(&config.extractor.candidate_keys)?,
            serde_json::to_vec(&config.fields)?,
            serde_json::to_vec(&config.classifier.return_keywords)?,
            serde_json::to_vec(&config.classifier.defect_keywords)?,
            serde_json::to_vec(&config.text.extra_stop_words)?,
            serde_json::to_vec(catalog.products())?,
        ];
        let parts: Vec<&[u8]> = settings.iter().map(Vec::as_slice).collect();
        let settings_fingerprint = digest(&parts);

        Ok(TicketPipeline {
            extractor: RecordExtractor::with_candidate_keys(config.extractor.candidate_keys.clone()),
            flattener: JsonFlattener::new(),
            resolver: FieldResolver::with_candidates(config.fields.clone()),
            normalizer,
            classifier,
            catalog,
            settings_fingerprint,
        })
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Reads the file as raw bytes; decoding is left to extraction so a bad line
    /// in line mode costs one record instead of the whole file.
    pub fn read_input(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|source| AnalyzerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Digest identifying a dataset built from `input` under these settings.
    pub fn fingerprint(&self, input: &[u8], format: InputFormat) -> String {
        let format = format!("{:?}", format);
        digest(&[
            input,
            format.as_bytes(),
            self.settings_fingerprint.as_bytes(),
        ])
    }

    pub fn extract_and_flatten(&self, input: &[u8], format: InputFormat) -> Result<(Extraction, DataFrame)> {
        let extraction = self.extractor.extract(input, format)?;
        info!(
            "📥 Extracted {} records via {} ({} skipped)",
            extraction.records.len(),
            extraction.strategy,
            extraction.skipped()
        );

        let df = self.flattener.flatten_to_dataframe(&extraction.records)?;
        info!("🔄 Flattened to {} rows x {} columns", df.height(), df.width());

        Ok((extraction, df))
    }

    pub fn run(&self, input: &[u8], format: InputFormat, ingested_at: DateTime<Utc>) -> Result<TicketDataset> {
        let (extraction, df) = self.extract_and_flatten(input, format)?;

        let tickets: Vec<Ticket> = self
            .resolver
            .resolve_tickets(&df, ingested_at)?
            .into_iter()
            .map(|raw| Ticket::ingest(raw, &self.normalizer, &self.classifier))
            .collect();

        let rows = enrich(tickets, &self.catalog);
        let unmatched_products = rows.iter().filter(|r| r.product.is_none()).count();

        let summary = IngestSummary {
            strategy: extraction.strategy,
            records: extraction.records.len(),
            skipped_lines: extraction.skipped_lines,
            skipped_elements: extraction.skipped_elements,
            columns: df.width(),
            unmatched_products,
        };
        info!("✅ Built dataset of {} tickets", rows.len());

        Ok(TicketDataset::new(rows, self.fingerprint(input, format), summary))
    }
}
