pub mod analyzer;
pub mod dataset;
pub mod memo;
pub mod ticket_pipeline;

pub use analyzer::TicketAnalyzer;
pub use dataset::{IngestSummary, TicketDataset};
pub use memo::{MemoCache, digest};
pub use ticket_pipeline::TicketPipeline;
