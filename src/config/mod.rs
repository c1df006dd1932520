pub mod analyzer_config;
pub mod product_catalog;

pub use analyzer_config::*;
pub use product_catalog::ProductCatalogConfig;
