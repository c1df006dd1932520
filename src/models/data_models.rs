use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::processor::{TextNormalizer, TopicClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    Return,
    Defect,
    Question,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Return, Topic::Defect, Topic::Question];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Return => "Return",
            Topic::Defect => "Defect",
            Topic::Question => "Question",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "return" | "returns" => Ok(Topic::Return),
            "defect" | "defects" => Ok(Topic::Defect),
            "question" | "questions" => Ok(Topic::Question),
            other => Err(format!(
                "unknown topic '{}', expected one of Return, Defect, Question",
                other
            )),
        }
    }
}

/// Product reference data, keyed by sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub product_name: String,
    pub category: String,
    pub brand: String,
}

/// Canonical ticket fields resolved from a flattened row, before text processing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTicket {
    pub id: String,
    pub sku: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A support ticket with its derived tokens and topic.
///
/// Fields are private so the derived values can only come from `Ticket::ingest`
/// and never drift from the description they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    id: String,
    sku: Option<String>,
    description: String,
    created_at: DateTime<Utc>,
    tokens: Vec<String>,
    topic: Topic,
}

impl Ticket {
    pub fn ingest(raw: RawTicket, normalizer: &TextNormalizer, classifier: &TopicClassifier) -> Self {
        let tokens = normalizer.tokenize(&raw.description).collect();
        let topic = classifier.classify(&raw.description);

        Ticket {
            id: raw.id,
            sku: raw.sku,
            description: raw.description,
            created_at: raw.created_at,
            tokens,
            topic,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// A ticket joined with its product. `product` is `None` when the sku is
/// missing or has no entry in the reference table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    pub ticket: Ticket,
    pub product: Option<Product>,
}

impl EnrichedRow {
    pub fn product_name(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.product_name.as_str())
    }

    pub fn brand(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.brand.as_str())
    }

    pub fn category(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.category.as_str())
    }
}
