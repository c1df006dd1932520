use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{AnalyzerError, Result};
use crate::models::{EnrichedRow, Product, Ticket};

/// Product reference table keyed by sku. Construction rejects duplicate skus, so a
/// join against a catalog can never multiply ticket rows.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
    by_sku: HashMap<String, usize>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Result<Self> {
        let mut by_sku = HashMap::with_capacity(products.len());

        for (idx, product) in products.iter().enumerate() {
            if by_sku.insert(product.sku.clone(), idx).is_some() {
                return Err(AnalyzerError::NonUniqueKey {
                    sku: product.sku.clone(),
                });
            }
        }

        Ok(ProductCatalog { products, by_sku })
    }

    pub fn get(&self, sku: &str) -> Option<&Product> {
        self.by_sku.get(sku).map(|&idx| &self.products[idx])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Left join of tickets onto the catalog. Output has exactly one row per ticket, in
/// input order; unmatched or sku-less tickets carry no product.
pub fn enrich(tickets: Vec<Ticket>, catalog: &ProductCatalog) -> Vec<EnrichedRow> {
    let mut unmatched = 0;

    let rows: Vec<EnrichedRow> = tickets
        .into_iter()
        .map(|ticket| {
            let product = ticket.sku().and_then(|sku| catalog.get(sku)).cloned();
            if product.is_none() {
                unmatched += 1;
            }
            EnrichedRow { ticket, product }
        })
        .collect();

    if unmatched > 0 {
        warn!("{} of {} tickets have no matching product", unmatched, rows.len());
    }
    info!("Joined {} tickets against {} products", rows.len(), catalog.len());

    rows
}
