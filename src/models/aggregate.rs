use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Topic;

/// A label with its occurrence count, used for product rankings and word tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicCounts {
    pub returns: usize,
    pub defects: usize,
    pub questions: usize,
}

impl TopicCounts {
    pub fn record(&mut self, topic: Topic) {
        match topic {
            Topic::Return => self.returns += 1,
            Topic::Defect => self.defects += 1,
            Topic::Question => self.questions += 1,
        }
    }

    pub fn get(&self, topic: Topic) -> usize {
        match topic {
            Topic::Return => self.returns,
            Topic::Defect => self.defects,
            Topic::Question => self.questions,
        }
    }

    pub fn total(&self) -> usize {
        self.returns + self.defects + self.questions
    }
}

/// Per-topic percentages of the filtered row count. All zero for an empty selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TopicRates {
    pub return_rate: f64,
    pub defect_rate: f64,
    pub question_rate: f64,
}

impl TopicRates {
    pub fn from_counts(counts: &TopicCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return TopicRates::default();
        }

        let pct = |n: usize| n as f64 / total as f64 * 100.0;
        TopicRates {
            return_rate: pct(counts.returns),
            defect_rate: pct(counts.defects),
            question_rate: pct(counts.questions),
        }
    }

    pub fn get(&self, topic: Topic) -> f64 {
        match topic {
            Topic::Return => self.return_rate,
            Topic::Defect => self.defect_rate,
            Topic::Question => self.question_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyBucket {
    /// ISO year-month, e.g. `2025-03`.
    pub month: String,
    pub counts: TopicCounts,
}

impl MonthlyBucket {
    pub fn total(&self) -> usize {
        self.counts.total()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total: usize,
    pub counts: TopicCounts,
    pub rates: TopicRates,
    pub top_products: Vec<RankedCount>,
    pub top_words: Vec<RankedCount>,
    pub monthly_trend: Vec<MonthlyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicReport {
    pub topic: Topic,
    pub count: usize,
    /// Share of this topic among all rows that pass the other filters.
    pub share_of_filtered: f64,
    pub top_products: Vec<RankedCount>,
    pub top_words: Vec<RankedCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub topic: Topic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub product_name: String,
    pub total: usize,
    pub defect_rate: f64,
    pub return_rate: f64,
    /// Most frequent words across the product's Defect and Return tickets.
    pub complaint_words: Vec<RankedCount>,
    pub tickets: Vec<TicketSummary>,
}
