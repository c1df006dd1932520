use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::models::{
    AggregateResult, EnrichedRow, FilterCriteria, MonthlyBucket, ProductReport, RankedCount,
    TicketSummary, Topic, TopicCounts, TopicRates, TopicReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    pub top_products: usize,
    pub top_words: usize,
    pub complaint_words: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        AggregationSettings {
            top_products: 5,
            top_words: 10,
            complaint_words: 5,
        }
    }
}

/// Computes filtered statistics over enriched rows. Results are fresh values on
/// every call; nothing is cached here.
pub struct Aggregator {
    settings: AggregationSettings,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_settings(AggregationSettings::default())
    }

    pub fn with_settings(settings: AggregationSettings) -> Self {
        Aggregator { settings }
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// Rows passing every constraint, in input order.
    pub fn select<'a>(&self, rows: &'a [EnrichedRow], criteria: &FilterCriteria) -> Vec<&'a EnrichedRow> {
        rows.iter().filter(|row| criteria.matches(row)).collect()
    }

    pub fn aggregate(&self, all: &[EnrichedRow], criteria: &FilterCriteria) -> AggregateResult {
        let rows = self.select(all, criteria);
        debug!("Filter kept {} of {} rows", rows.len(), all.len());

        let counts = topic_counts(&rows);
        AggregateResult {
            total: rows.len(),
            counts,
            rates: TopicRates::from_counts(&counts),
            top_products: rank_products(&rows, self.settings.top_products),
            top_words: word_frequencies(&rows, self.settings.top_words),
            monthly_trend: monthly_trend(&rows),
        }
    }

    /// One topic within the other active filters; any topic constraint in
    /// `criteria` is replaced by `topic`.
    pub fn topic_report(&self, all: &[EnrichedRow], criteria: &FilterCriteria, topic: Topic) -> TopicReport {
        let base = self.select(all, &criteria.clone().without_topic());
        let rows: Vec<&EnrichedRow> = base
            .iter()
            .copied()
            .filter(|row| row.ticket.topic() == topic)
            .collect();

        TopicReport {
            topic,
            count: rows.len(),
            share_of_filtered: percentage(rows.len(), base.len()),
            top_products: rank_products(&rows, self.settings.top_products),
            top_words: word_frequencies(&rows, self.settings.top_words),
        }
    }

    /// Metrics for one product display name within the date and brand filters.
    pub fn product_report(&self, all: &[EnrichedRow], criteria: &FilterCriteria, product_name: &str) -> ProductReport {
        let scoped = criteria.clone().without_topic().with_product(product_name);
        let mut rows = self.select(all, &scoped);
        let counts = topic_counts(&rows);

        let complaints: Vec<&EnrichedRow> = rows
            .iter()
            .copied()
            .filter(|row| matches!(row.ticket.topic(), Topic::Defect | Topic::Return))
            .collect();
        let complaint_words = word_frequencies(&complaints, self.settings.complaint_words);

        rows.sort_by_key(|row| row.ticket.created_at());
        let tickets = rows
            .iter()
            .map(|row| TicketSummary {
                id: row.ticket.id().to_string(),
                created_at: row.ticket.created_at(),
                description: row.ticket.description().to_string(),
                topic: row.ticket.topic(),
            })
            .collect();

        ProductReport {
            product_name: product_name.to_string(),
            total: rows.len(),
            defect_rate: percentage(counts.defects, rows.len()),
            return_rate: percentage(counts.returns, rows.len()),
            complaint_words,
            tickets,
        }
    }

    /// Sorted product display names present in the selection, ignoring any product
    /// constraint in `criteria`.
    pub fn product_names(&self, all: &[EnrichedRow], criteria: &FilterCriteria) -> Vec<String> {
        let rows = self.select(all, &criteria.clone().without_product());
        let names: BTreeSet<&str> = rows.iter().filter_map(|row| row.product_name()).collect();
        names.into_iter().map(str::to_string).collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted distinct brands across all rows. Rows without a product are skipped.
pub fn brands(rows: &[EnrichedRow]) -> Vec<String> {
    let brands: BTreeSet<&str> = rows.iter().filter_map(|row| row.brand()).collect();
    brands.into_iter().map(str::to_string).collect()
}

pub fn topic_counts(rows: &[&EnrichedRow]) -> TopicCounts {
    let mut counts = TopicCounts::default();
    for row in rows {
        counts.record(row.ticket.topic());
    }
    counts
}

/// Tickets per product display name, highest first. Rows without a product are not ranked.
pub fn rank_products(rows: &[&EnrichedRow], limit: usize) -> Vec<RankedCount> {
    rank_labels(rows.iter().filter_map(|row| row.product_name()), limit)
}

/// Token counts across all rows, highest first.
pub fn word_frequencies(rows: &[&EnrichedRow], limit: usize) -> Vec<RankedCount> {
    rank_labels(
        rows.iter()
            .flat_map(|row| row.ticket.tokens().iter().map(String::as_str)),
        limit,
    )
}

/// Per-topic counts for every calendar month that has at least one row, oldest first.
pub fn monthly_trend(rows: &[&EnrichedRow]) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<(i32, u32), TopicCounts> = BTreeMap::new();

    for row in rows {
        let created = row.ticket.created_at();
        buckets
            .entry((created.year(), created.month()))
            .or_default()
            .record(row.ticket.topic());
    }

    buckets
        .into_iter()
        .map(|((year, month), counts)| MonthlyBucket {
            month: format!("{:04}-{:02}", year, month),
            counts,
        })
        .collect()
}

/// Counts labels and sorts by count descending. The sort is stable over
/// first-occurrence order, so ties keep the order labels were first seen in.
pub fn rank_labels<'a>(labels: impl Iterator<Item = &'a str>, limit: usize) -> Vec<RankedCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counted: Vec<(&str, usize)> = Vec::new();

    for label in labels {
        match index.get(label).copied() {
            Some(idx) => counted[idx].1 += 1,
            None => {
                index.insert(label, counted.len());
                counted.push((label, 1));
            }
        }
    }

    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted
        .into_iter()
        .take(limit)
        .map(|(label, count)| RankedCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
