use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use ticket_insights::config::{AnalyzerConfig, ProductCatalogConfig};
use ticket_insights::error::AnalyzerError;
use ticket_insights::models::{FilterCriteria, Topic};
use ticket_insights::pipeline::{TicketAnalyzer, TicketDataset, TicketPipeline};
use ticket_insights::processor::{
    Aggregator, DiscoveryStrategy, InputFormat, ProductCatalog, TextNormalizer, TopicClassifier,
};
use ticket_insights::report::DataProfiler;

const SAMPLE_TICKETS: &str = include_str!("../data/sample_tickets.jsonl");
const SAMPLE_EXPORT: &str = include_str!("../data/sample_export.json");
const PRODUCTS: &str = include_str!("../configs/products.toml");

fn catalog() -> Arc<ProductCatalog> {
    let config: ProductCatalogConfig = toml::from_str(PRODUCTS).unwrap();
    Arc::new(config.into_catalog().unwrap())
}

fn pipeline() -> TicketPipeline {
    TicketPipeline::new(catalog()).unwrap()
}

fn ingested_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

fn sample_dataset() -> TicketDataset {
    pipeline()
        .run(SAMPLE_TICKETS.as_bytes(), InputFormat::Lines, ingested_at())
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn everything() -> FilterCriteria {
    FilterCriteria::new(date(2023, 1, 1), date(2025, 12, 31)).unwrap()
}

#[test]
fn test_sample_tickets_join_every_row() {
    let dataset = sample_dataset();

    assert_eq!(dataset.len(), 120);
    assert_eq!(dataset.summary().strategy, DiscoveryStrategy::LineDelimited);
    assert_eq!(dataset.summary().unmatched_products, 0);
    assert_eq!(dataset.rows()[0].ticket.id(), "1001");
    assert_eq!(
        dataset.rows()[0].product_name(),
        Some("Front Air Spring | Audi A8 D4")
    );
    assert_eq!(dataset.date_span(), Some((date(2023, 7, 3), date(2025, 6, 16))));
}

#[test]
fn test_malformed_lines_are_skipped_and_counted() {
    let mut lines: Vec<&str> = SAMPLE_TICKETS.lines().collect();
    lines.insert(10, "{\"ticket_id\": 9999, \"description\": ");
    lines.insert(50, "not json at all");
    lines.insert(90, "[1, 2, 3]");
    let input = lines.join("\n");

    let dataset = pipeline().run(input.as_bytes(), InputFormat::Lines, ingested_at()).unwrap();

    assert_eq!(dataset.len(), 120);
    assert_eq!(dataset.summary().skipped_lines, vec![11, 51, 91]);
}

#[test]
fn test_join_preserves_row_count_without_catalog() {
    let dataset = TicketPipeline::new(Arc::new(ProductCatalog::default()))
        .unwrap()
        .run(SAMPLE_TICKETS.as_bytes(), InputFormat::Lines, ingested_at())
        .unwrap();

    assert_eq!(dataset.len(), 120);
    assert_eq!(dataset.summary().unmatched_products, 120);
    assert!(dataset.rows().iter().all(|row| row.product.is_none()));
}

#[test]
fn test_overview_counts_and_rates() {
    let dataset = sample_dataset();
    let result = Aggregator::new().aggregate(dataset.rows(), &everything());

    assert_eq!(result.total, 120);
    assert_eq!(
        (result.counts.returns, result.counts.defects, result.counts.questions),
        (15, 23, 82)
    );
    assert!((result.rates.return_rate - 12.5).abs() < 1e-9);
    let sum = result.rates.return_rate + result.rates.defect_rate + result.rates.question_rate;
    assert!((sum - 100.0).abs() < 1e-9);

    assert_eq!(result.top_products.len(), 5);
    assert_eq!(result.top_words.len(), 10);
    assert_eq!(result.monthly_trend.len(), 24);
    assert_eq!(result.monthly_trend[0].month, "2023-07");
    assert_eq!(result.monthly_trend.iter().map(|b| b.total()).sum::<usize>(), 120);
}

#[test]
fn test_brand_filter_rates_sum_to_hundred() {
    let dataset = sample_dataset();
    let result = Aggregator::new().aggregate(dataset.rows(), &everything().with_brand("Audi"));

    assert_eq!(result.total, 34);
    assert_eq!(
        (result.counts.returns, result.counts.defects, result.counts.questions),
        (2, 4, 28)
    );
    let sum = result.rates.return_rate + result.rates.defect_rate + result.rates.question_rate;
    assert!((sum - 100.0).abs() < 1e-9);
}

#[test]
fn test_empty_selection_has_zero_rates() {
    let dataset = sample_dataset();
    let criteria = FilterCriteria::new(date(2020, 1, 1), date(2020, 1, 31)).unwrap();
    let result = Aggregator::new().aggregate(dataset.rows(), &criteria);

    assert_eq!(result.total, 0);
    assert_eq!(result.rates.return_rate, 0.0);
    assert_eq!(result.rates.defect_rate, 0.0);
    assert_eq!(result.rates.question_rate, 0.0);
    assert!(result.monthly_trend.is_empty());
}

#[test]
fn test_inverted_date_range_is_rejected() {
    let err = FilterCriteria::new(date(2025, 2, 1), date(2025, 1, 1)).unwrap_err();
    assert!(matches!(err, AnalyzerError::InvalidDateRange { .. }));
}

#[test]
fn test_twenty_row_rate_scenario() {
    let mut lines = Vec::new();
    for i in 0..20 {
        let description = match i % 4 {
            0 => "I want a refund for this",
            1 | 2 => "The strut is broken",
            _ => "Does this fit a 2012 model?",
        };
        lines.push(format!(
            r#"{{"id": {}, "sku": "AS-2801", "description": "{}", "created_at": "2025-03-{:02}"}}"#,
            i,
            description,
            i + 1
        ));
    }

    let dataset = pipeline()
        .run(lines.join("\n").as_bytes(), InputFormat::Lines, ingested_at())
        .unwrap();
    let result = Aggregator::new().aggregate(dataset.rows(), &everything());

    assert_eq!(result.total, 20);
    assert!((result.rates.defect_rate - 50.0).abs() < 1e-9);
    assert!((result.rates.return_rate - 25.0).abs() < 1e-9);
    assert!((result.rates.question_rate - 25.0).abs() < 1e-9);
}

#[test]
fn test_example_descriptions_classify() {
    let classifier = TopicClassifier::new().unwrap();

    assert_eq!(
        classifier.classify("The AS-2801 air spring is leaking air and I want a refund."),
        Topic::Return
    );
    assert_eq!(
        classifier.classify("VB-5004 valve block fixed my suspension problem. Thanks!"),
        Topic::Question
    );
}

#[test]
fn test_tokens_never_contain_stop_words_or_punctuation() {
    let normalizer = TextNormalizer::new();
    let dataset = sample_dataset();

    for row in dataset.rows() {
        for token in row.ticket.tokens() {
            assert!(!normalizer.is_stop_word(token), "{}", token);
            assert!(token.chars().any(char::is_alphanumeric), "{}", token);
        }
    }
}

#[test]
fn test_topic_and_product_views() {
    let dataset = sample_dataset();
    let aggregator = Aggregator::new();

    let defects = aggregator.topic_report(dataset.rows(), &everything(), Topic::Defect);
    assert_eq!(defects.count, 23);
    assert!(defects.top_products.iter().all(|p| p.count >= 1));

    let names = aggregator.product_names(dataset.rows(), &everything().with_brand("Porsche"));
    assert_eq!(
        names,
        vec!["Air Suspension Compressor | Porsche", "Front Air Strut | Porsche Panamera"]
    );

    let report = aggregator.product_report(dataset.rows(), &everything(), "Front Air Strut | Porsche Panamera");
    assert!(report.total > 0);
    assert!(
        report
            .tickets
            .windows(2)
            .all(|pair| pair[0].created_at <= pair[1].created_at)
    );
}

#[test]
fn test_analyzer_memoizes_dataset_and_aggregates() {
    let mut analyzer = TicketAnalyzer::new(pipeline(), Aggregator::new());

    let first = analyzer
        .load(SAMPLE_TICKETS.as_bytes(), InputFormat::Lines, ingested_at(), false)
        .unwrap();
    let again = analyzer
        .load(SAMPLE_TICKETS.as_bytes(), InputFormat::Lines, ingested_at(), false)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let a = analyzer.aggregate(&first, &everything(), false).unwrap();
    let b = analyzer.aggregate(&first, &everything(), true).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a, b);
}

#[test]
fn test_nested_export_resolves_fields_and_profiles() {
    let pipeline = pipeline();
    let dataset = pipeline
        .run(SAMPLE_EXPORT.as_bytes(), InputFormat::Document, ingested_at())
        .unwrap();

    assert_eq!(
        dataset.summary().strategy,
        DiscoveryStrategy::CandidateKey("results".to_string())
    );
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.summary().unmatched_products, 0);
    assert_eq!(dataset.rows()[0].ticket.topic(), Topic::Defect);
    assert_eq!(dataset.rows()[1].ticket.topic(), Topic::Return);

    let (extraction, df) = pipeline
        .extract_and_flatten(SAMPLE_EXPORT.as_bytes(), InputFormat::Document)
        .unwrap();
    let report = DataProfiler::from_report_config(&AnalyzerConfig::default().report)
        .profile(&extraction, &df)
        .unwrap();

    assert_eq!(report.top_level_keys, vec!["count", "next_page", "results"]);
    assert_eq!(report.row_count, 6);
    assert_eq!(report.missing[0].column, "via.source.from.address");
    assert_eq!(report.missing[0].missing, 5);
    let priority = report.missing.iter().find(|m| m.column == "priority");
    assert_eq!(priority.map(|m| m.missing), Some(2));
}

#[test]
fn test_undiscoverable_list_reports_keys() {
    let err = pipeline()
        .run(br#"{"count": 0, "next_page": null}"#, InputFormat::Document, ingested_at())
        .unwrap_err();

    match err {
        AnalyzerError::SchemaDiscovery { keys, .. } => assert_eq!(keys, vec!["count", "next_page"]),
        other => panic!("unexpected error: {}", other),
    }
}
