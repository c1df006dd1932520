use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::models::{EnrichedRow, FilterCriteria};
use crate::processor::DiscoveryStrategy;

/// What happened while turning raw input into rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub strategy: DiscoveryStrategy,
    pub records: usize,
    pub skipped_lines: Vec<usize>,
    pub skipped_elements: usize,
    pub columns: usize,
    pub unmatched_products: usize,
}

/// The enriched ticket rows of one analysis session. Never mutated after
/// construction; every aggregation borrows it.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDataset {
    rows: Vec<EnrichedRow>,
    fingerprint: String,
    summary: IngestSummary,
}

impl TicketDataset {
    pub fn new(rows: Vec<EnrichedRow>, fingerprint: String, summary: IngestSummary) -> Self {
        TicketDataset {
            rows,
            fingerprint,
            summary,
        }
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Digest of the input and pipeline settings this dataset was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().map(|r| r.ticket.created_at().date_naive());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Earliest ticket date through `today` (or the latest ticket, if later).
    pub fn default_criteria(&self, today: NaiveDate) -> Result<FilterCriteria> {
        match self.date_span() {
            Some((first, last)) => FilterCriteria::new(first.min(today), last.max(today)),
            None => FilterCriteria::new(today, today),
        }
    }
}
