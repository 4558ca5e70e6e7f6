//! Filtering, pagination, and landing-view sampling over a [`ProductTable`].

use rand::Rng;
use vitrine_core::{Product, ProductPage, ProductQuery};

use crate::sampling::{diversified_sample, SamplingConfig};
use crate::table::ProductTable;

/// Lowercased, trimmed filter values. Empty means "not filtered".
struct Criteria {
    search_term: String,
    store: String,
    category: String,
    brand: String,
}

impl Criteria {
    fn from_query(query: &ProductQuery) -> Self {
        let fold = |s: &str| s.trim().to_lowercase();
        Self {
            search_term: fold(&query.search_term),
            store: fold(&query.store),
            category: fold(&query.category),
            brand: fold(&query.brand),
        }
    }

    fn is_unfiltered(&self) -> bool {
        self.search_term.is_empty()
            && self.store.is_empty()
            && self.category.is_empty()
            && self.brand.is_empty()
    }

    fn matches(&self, product: &Product) -> bool {
        if !self.store.is_empty() && !equals_folded(&product.store, &self.store) {
            return false;
        }
        if !self.category.is_empty() && !self.matches_category(product) {
            return false;
        }
        if !self.brand.is_empty() && !equals_folded(&product.brand, &self.brand) {
            return false;
        }
        self.search_term.is_empty() || self.matches_search(product)
    }

    // The filter index offers individual categories, so a multi-category
    // field must match on any of its entries as well as on the whole value.
    fn matches_category(&self, product: &Product) -> bool {
        equals_folded(&product.category, &self.category)
            || product
                .categories()
                .any(|entry| equals_folded(entry, &self.category))
    }

    // Description is not searched.
    fn matches_search(&self, product: &Product) -> bool {
        [&product.id, &product.name, &product.brand, &product.store]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.search_term))
    }
}

fn equals_folded(value: &str, folded: &str) -> bool {
    value.trim().to_lowercase() == folded
}

/// Runs `query` against `table`.
///
/// The landing view (offset 0, no search, no filters) returns a
/// store-diversified random sample drawn with `rng`. Every other request
/// returns the deterministic slice `matching[offset..offset + limit]`.
/// `total_count` always counts every matching product.
pub fn query<R: Rng + ?Sized>(
    table: &ProductTable,
    query: &ProductQuery,
    sampling: &SamplingConfig,
    rng: &mut R,
) -> ProductPage {
    let criteria = Criteria::from_query(query);

    let matching: Vec<&Product> = if criteria.is_unfiltered() {
        table.products().iter().collect()
    } else {
        table
            .products()
            .iter()
            .filter(|p| criteria.matches(p))
            .collect()
    };
    let total_count = matching.len();

    let selected: Vec<&Product> = if query.is_landing() {
        diversified_sample(
            matching.iter().copied(),
            |p| p.store.as_str(),
            query.limit,
            sampling,
            rng,
        )
    } else {
        matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect()
    };

    let headers = Some(table.headers())
        .filter(|h| !h.is_empty())
        .map(<[String]>::to_vec);

    ProductPage {
        total_count,
        products: selected.into_iter().cloned().collect(),
        headers,
    }
}

/// Point lookup by trimmed id.
#[must_use]
pub fn find_by_id(table: &ProductTable, id: &str) -> Option<Product> {
    table.get(id).cloned()
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
