use serde::{Deserialize, Serialize};

/// Store label used when a feed row leaves the store column blank.
pub const DEFAULT_STORE_LABEL: &str = "Partner";

/// A catalog entry, normalized from one feed row or snapshot record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// External identifier. Non-empty, short, and free of whitespace once
    /// ingested.
    pub id: String,
    pub name: String,
    /// Possibly truncated to the configured storage budget, with `...` appended.
    pub description: String,
    /// Sale price when present, regular price otherwise. Kept as the feed's
    /// text; formatting is left to the presentation layer.
    pub price: String,
    /// Outbound purchase link.
    pub affiliate_link: String,
    pub image_url: String,
    pub store: String,
    /// Raw category field. May hold several comma-separated categories.
    pub category: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_link: Option<String>,
    /// Display label for the purchase button, derived from `store`.
    pub button_text: String,
}

impl Product {
    /// Builds the purchase button label for `store`.
    #[must_use]
    pub fn button_text_for(store: &str) -> String {
        format!("Buy at Store: {store}")
    }

    /// Iterates the individual, trimmed, non-empty entries of the category field.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Distinct values used to populate the front end's filter controls. Each list
/// is sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub stores: Vec<String>,
    pub categories: Vec<String>,
    pub brands: Vec<String>,
}

/// A product listing request.
///
/// String filters are compared case-insensitively after trimming; an empty
/// string means "not filtered".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub offset: usize,
    pub limit: usize,
    pub search_term: String,
    pub store: String,
    pub category: String,
    pub brand: String,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
            search_term: String::new(),
            store: String::new(),
            category: String::new(),
            brand: String::new(),
        }
    }
}

impl ProductQuery {
    /// Returns `true` if any of the store/category/brand filters is set.
    #[must_use]
    pub fn has_equality_filters(&self) -> bool {
        [&self.store, &self.category, &self.brand]
            .iter()
            .any(|v| !v.trim().is_empty())
    }

    #[must_use]
    pub fn has_search_term(&self) -> bool {
        !self.search_term.trim().is_empty()
    }

    /// The landing view: first page, nothing searched, nothing filtered.
    #[must_use]
    pub fn is_landing(&self) -> bool {
        self.offset == 0 && !self.has_search_term() && !self.has_equality_filters()
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Number of products matching the filters, across all pages.
    pub total_count: usize,
    pub products: Vec<Product>,
    /// Original feed column names, when the table came from the CSV feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
}

impl ProductPage {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}
