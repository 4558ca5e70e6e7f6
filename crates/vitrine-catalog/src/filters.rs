//! Distinct store, category, and brand values for the filter controls.

use std::collections::BTreeSet;

use vitrine_core::{CatalogTuning, FilterOptions};

use crate::table::ProductTable;

/// Substrings that mark a value as a leaked URL rather than a label.
const URL_MARKERS: &[&str] = &["http", "www.", "://"];

/// Validity window for filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRules {
    pub min_len: usize,
    pub max_len: usize,
    pub max_words: usize,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self::from(&CatalogTuning::default())
    }
}

impl From<&CatalogTuning> for FilterRules {
    fn from(tuning: &CatalogTuning) -> Self {
        Self {
            min_len: tuning.filter_min_len,
            max_len: tuning.filter_max_len,
            max_words: tuning.filter_max_words,
        }
    }
}

/// Rejects values that look like mis-parsed description fragments: too
/// short or long, URL-like, containing `,,`, or too many words.
#[must_use]
pub fn is_valid_filter_value(value: &str, rules: &FilterRules) -> bool {
    let value = value.trim();
    let len = value.chars().count();
    if len < rules.min_len || len > rules.max_len {
        return false;
    }
    let lowered = value.to_lowercase();
    if URL_MARKERS.iter().any(|m| lowered.contains(m)) || value.contains(",,") {
        return false;
    }
    value.split_whitespace().count() <= rules.max_words
}

/// Builds sorted, deduplicated filter options from every product in `table`.
/// A product contributes one entry per comma-separated category.
#[must_use]
pub fn build_filter_options(table: &ProductTable, rules: &FilterRules) -> FilterOptions {
    let mut stores = BTreeSet::new();
    let mut categories = BTreeSet::new();
    let mut brands = BTreeSet::new();

    let accept = |set: &mut BTreeSet<String>, value: &str| {
        if is_valid_filter_value(value, rules) {
            set.insert(value.trim().to_owned());
        }
    };

    for product in table.products() {
        accept(&mut stores, &product.store);
        for category in product.categories() {
            accept(&mut categories, category);
        }
        accept(&mut brands, &product.brand);
    }

    FilterOptions {
        stores: stores.into_iter().collect(),
        categories: categories.into_iter().collect(),
        brands: brands.into_iter().collect(),
    }
}
