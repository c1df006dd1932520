pub mod aggregator;
pub mod enrichment;
pub mod field_resolver;
pub mod json_flattener;
pub mod record_extractor;
pub mod text_normalizer;
pub mod topic_classifier;

pub use aggregator::*;
pub use enrichment::*;
pub use field_resolver::*;
pub use json_flattener::*;
pub use record_extractor::*;
pub use text_normalizer::*;
pub use topic_classifier::*;
