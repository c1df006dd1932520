use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::dataset::TicketDataset;
use super::memo::{MemoCache, digest};
use super::ticket_pipeline::TicketPipeline;
use crate::config::MemoSection;
use crate::error::{AnalyzerError, Result};
use crate::models::{AggregateResult, FilterCriteria, ProductReport, Topic, TopicReport};
use crate::processor::{Aggregator, InputFormat, brands};

/// One analysis session. Datasets are memoized by input and settings, aggregates
/// by dataset and filter; `force` bypasses both. Both caches are bounded.
pub struct TicketAnalyzer {
    pipeline: TicketPipeline,
    aggregator: Aggregator,
    datasets: MemoCache<TicketDataset>,
    aggregates: MemoCache<AggregateResult>,
}

impl TicketAnalyzer {
    pub fn new(pipeline: TicketPipeline, aggregator: Aggregator) -> Self {
        Self::with_memo(pipeline, aggregator, MemoSection::default())
    }

    pub fn with_memo(pipeline: TicketPipeline, aggregator: Aggregator, memo: MemoSection) -> Self {
        TicketAnalyzer {
            pipeline,
            aggregator,
            datasets: MemoCache::with_capacity(memo.datasets),
            aggregates: MemoCache::with_capacity(memo.aggregates),
        }
    }

    pub fn pipeline(&self) -> &TicketPipeline {
        &self.pipeline
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn load(
        &mut self,
        input: &[u8],
        format: InputFormat,
        ingested_at: DateTime<Utc>,
        force: bool,
    ) -> Result<Arc<TicketDataset>> {
        let key = self.pipeline.fingerprint(input, format);
        let pipeline = &self.pipeline;
        self.datasets
            .get_or_try_insert_with(&key, force, || pipeline.run(input, format, ingested_at))
    }

    pub fn aggregate(&mut self, dataset: &TicketDataset, criteria: &FilterCriteria, force: bool) -> Result<Arc<AggregateResult>> {
        let criteria_json = serde_json::to_vec(criteria)?;
        let settings_json = serde_json::to_vec(self.aggregator.settings())?;
        let key = digest(&[
            dataset.fingerprint().as_bytes(),
            criteria_json.as_slice(),
            settings_json.as_slice(),
        ]);

        let aggregator = &self.aggregator;
        let result = self.aggregates.get_or_try_insert_with(&key, force, || {
            Ok::<_, AnalyzerError>(aggregator.aggregate(dataset.rows(), criteria))
        })?;
        info!(
            "📊 Aggregated {} tickets (memo hits: {}, misses: {})",
            result.total,
            self.aggregates.hits(),
            self.aggregates.misses()
        );
        Ok(result)
    }

    pub fn topic_report(&self, dataset: &TicketDataset, criteria: &FilterCriteria, topic: Topic) -> TopicReport {
        self.aggregator.topic_report(dataset.rows(), criteria, topic)
    }

    pub fn product_report(&self, dataset: &TicketDataset, criteria: &FilterCriteria, product_name: &str) -> ProductReport {
        self.aggregator.product_report(dataset.rows(), criteria, product_name)
    }

    pub fn product_names(&self, dataset: &TicketDataset, criteria: &FilterCriteria) -> Vec<String> {
        self.aggregator.product_names(dataset.rows(), criteria)
    }

    pub fn brands(&self, dataset: &TicketDataset) -> Vec<String> {
        brands(dataset.rows())
    }

    /// Drops every memoized dataset and aggregate.
    pub fn clear(&mut self) {
        self.datasets.clear();
        self.aggregates.clear();
    }
}
