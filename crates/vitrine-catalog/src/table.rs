use std::collections::HashMap;

use vitrine_core::Product;

/// All products from one ingestion pass, in feed order, plus an id index
/// for point lookups.
#[derive(Debug, Clone, Default)]
pub struct ProductTable {
    products: Vec<Product>,
    headers: Vec<String>,
    by_id: HashMap<String, usize>,
}

impl ProductTable {
    /// Builds a table. When ids repeat, lookups resolve to the last occurrence.
    #[must_use]
    pub fn new(products: Vec<Product>, headers: Vec<String>) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id.clone(), idx))
            .collect();
        Self {
            products,
            headers,
            by_id,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Original feed column names; empty for snapshot-backed tables.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Exact lookup by id after trimming the input.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id
            .get(id.trim())
            .and_then(|&idx| self.products.get(idx))
    }
}
