use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::models::Product;
use crate::processor::ProductCatalog;

/// `[[products]]` entries of the reference table file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalogConfig {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalogConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read product reference file: {}", path.display()))?;

        let config: ProductCatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse product reference file: {}", path.display()))?;

        info!("Loaded {} products from {}", config.products.len(), path.display());
        Ok(config)
    }

    /// A missing optional path yields an empty catalog; every ticket then joins to nothing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                warn!("Product reference file {} not found, continuing without products", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn into_catalog(self) -> Result<ProductCatalog> {
        ProductCatalog::new(self.products).context("Invalid product reference table")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;

    #[test]
    fn test_parse_products() {
        let config: ProductCatalogConfig = toml::from_str(
            r#"
            [[products]]
            sku = "AS-2801"
            product_name = "Front Air Spring | Audi A8 D4"
            category = "Air Spring"
            brand = "Audi"

            [[products]]
            sku = "AC-8200"
            product_name = "Air Suspension Compressor | BMW"
            category = "Compressor"
            brand = "BMW"
            "#,
        )
        .unwrap();

        let catalog = config.into_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("AC-8200").map(|p| p.brand.as_str()), Some("BMW"));
    }

    #[test]
    fn test_duplicate_sku_surfaces_non_unique_key() {
        let config: ProductCatalogConfig = toml::from_str(
            r#"
            [[products]]
            sku = "VB-5001"
            product_name = "Valve Block | Audi Q7"
            category = "Valve Block"
            brand = "Audi"

            [[products]]
            sku = "VB-5001"
            product_name = "Valve Block | Audi Q7"
            category = "Valve Block"
            brand = "Audi"
            "#,
        )
        .unwrap();

        let err = config.into_catalog().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::NonUniqueKey { .. })
        ));
    }

    #[test]
    fn test_missing_optional_file_gives_empty_catalog() {
        let config = ProductCatalogConfig::load(Some(Path::new("no/such/products.toml"))).unwrap();
        assert!(config.products.is_empty());
    }
}
