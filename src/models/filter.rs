use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AnalyzerError, Result};
use crate::models::{EnrichedRow, Topic};

/// Conjunctive filter over enriched rows. The date range is inclusive on both
/// ends and `start <= end` always holds for a constructed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterCriteria {
    start: NaiveDate,
    end: NaiveDate,
    brand: Option<String>,
    topic: Option<Topic>,
    product: Option<String>,
}

impl FilterCriteria {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyzerError::InvalidDateRange { start, end });
        }

        Ok(FilterCriteria {
            start,
            end,
            brand: None,
            topic: None,
            product: None,
        })
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn without_topic(mut self) -> Self {
        self.topic = None;
        self
    }

    pub fn without_product(mut self) -> Self {
        self.product = None;
        self
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn matches(&self, row: &EnrichedRow) -> bool {
        let date = row.ticket.created_at().date_naive();
        if date < self.start || date > self.end {
            return false;
        }

        // A brand or product constraint never matches a row without product data.
        if let Some(brand) = &self.brand {
            if row.brand() != Some(brand.as_str()) {
                return false;
            }
        }

        if let Some(product) = &self.product {
            if row.product_name() != Some(product.as_str()) {
                return false;
            }
        }

        match self.topic {
            Some(topic) => row.ticket.topic() == topic,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = FilterCriteria::new(date(2025, 5, 2), date(2025, 5, 1)).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let criteria = FilterCriteria::new(date(2025, 5, 1), date(2025, 5, 1)).unwrap();
        assert_eq!(criteria.start(), criteria.end());
    }

    #[test]
    fn test_builder_sets_optional_constraints() {
        let criteria = FilterCriteria::new(date(2025, 1, 1), date(2025, 12, 31))
            .unwrap()
            .with_brand("Audi")
            .with_topic(Topic::Defect)
            .with_product("Valve Block | Audi Q7");

        assert_eq!(criteria.brand(), Some("Audi"));
        assert_eq!(criteria.topic(), Some(Topic::Defect));
        assert_eq!(criteria.product(), Some("Valve Block | Audi Q7"));
        assert_eq!(criteria.clone().without_topic().topic(), None);
    }
}
