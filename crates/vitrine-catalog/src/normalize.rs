//! Conversion from decoded feed rows (and compact snapshot records) to
//! [`vitrine_core::Product`].
//!
//! The feed is a hand-maintained spreadsheet, so column names drift and rows
//! occasionally get shredded by stray line breaks. Each canonical field is
//! resolved through an alias list, and rows that look corrupt are rejected
//! rather than repaired.

use std::collections::HashMap;

use thiserror::Error;
use vitrine_core::{CatalogTuning, Product, DEFAULT_STORE_LABEL};

use crate::rows::{Decoder, RawRow};
use crate::table::ProductTable;

const ID_ALIASES: &[&str] = &["id", "sku", "product_id", "codigo"];
const NAME_ALIASES: &[&str] = &["name", "title", "nome", "titulo"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "descricao"];
const PRICE_ALIASES: &[&str] = &["sale_price", "price", "preco_promocional", "preco"];
const LINK_ALIASES: &[&str] = &["link", "affiliate_link", "url", "link_afiliado"];
const IMAGE_ALIASES: &[&str] = &["image_link", "image", "image_url", "imagem"];
const STORE_ALIASES: &[&str] = &["store", "partner_store", "loja", "loja_parceira"];
const CATEGORY_ALIASES: &[&str] = &["category", "product_type", "categoria"];
const BRAND_ALIASES: &[&str] = &["brand", "marca"];
const SOCIAL_ALIASES: &[&str] = &["social_link", "facebook_link"];

/// Marker appended to descriptions cut to the storage budget.
pub const TRUNCATION_MARKER: &str = "...";

/// Number of positions in a compact snapshot record:
/// `[id, name, price, image, link, store, category, brand, description, socialLink]`.
pub const COMPACT_WIDTH: usize = 10;

/// Why a row was dropped during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("row has {fields} fields, expected at least {expected_min}")]
    ShortRow { fields: usize, expected_min: usize },

    #[error("row has no id")]
    MissingId,

    #[error("malformed id \"{id}\"")]
    MalformedId { id: String },
}

/// Validation thresholds applied to every ingested row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeRules {
    pub max_id_len: usize,
    pub description_budget: usize,
    pub min_field_ratio: f64,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self::from(&CatalogTuning::default())
    }
}

impl From<&CatalogTuning> for NormalizeRules {
    fn from(tuning: &CatalogTuning) -> Self {
        Self {
            max_id_len: tuning.max_id_len,
            description_budget: tuning.description_budget,
            min_field_ratio: tuning.min_field_ratio,
        }
    }
}

/// Lowercased, trimmed header name to column index, built once per ingestion.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    headers: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnMap {
    /// Builds the map from the feed's header row. When a header name repeats,
    /// the first column wins.
    #[must_use]
    pub fn from_header(header: &[String]) -> Self {
        let headers: Vec<String> = header.iter().map(|h| h.trim().to_owned()).collect();
        let mut index = HashMap::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            index.entry(name.to_lowercase()).or_insert(idx);
        }
        Self { headers, index }
    }

    /// Number of header columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Header names as they appeared in the feed, trimmed.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Column index for `name`, compared case-insensitively after trimming.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.trim().to_lowercase()).copied()
    }

    /// Returns the first non-empty value among `aliases`, trimmed, or `""`.
    #[must_use]
    pub fn resolve<'r>(&self, row: &'r [String], aliases: &[&str]) -> &'r str {
        aliases
            .iter()
            .filter_map(|alias| self.position(alias))
            .filter_map(|idx| row.get(idx))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }
}

/// Per-reason counts of dropped rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub short_rows: usize,
    pub missing_id: usize,
    pub malformed_id: usize,
}

impl RejectionCounts {
    pub fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::ShortRow { .. } => self.short_rows += 1,
            Rejection::MissingId => self.missing_id += 1,
            Rejection::MalformedId { .. } => self.malformed_id += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.short_rows + self.missing_id + self.malformed_id
    }
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub table: ProductTable,
    /// Data rows examined, header excluded.
    pub rows_seen: usize,
    pub rejected: RejectionCounts,
}

/// Checks the id heuristic: non-empty, at most `max_len` characters, and no
/// whitespace. Ids failing it usually mean a description leaked across a
/// line break into the id column.
///
/// # Errors
///
/// Returns [`Rejection::MissingId`] or [`Rejection::MalformedId`].
pub fn validate_id(id: &str, max_len: usize) -> Result<(), Rejection> {
    if id.is_empty() {
        return Err(Rejection::MissingId);
    }
    if id.chars().count() > max_len || id.chars().any(char::is_whitespace) {
        return Err(Rejection::MalformedId { id: id.to_owned() });
    }
    Ok(())
}

/// Cuts `text` to `budget` characters, appending [`TRUNCATION_MARKER`] when
/// anything was removed.
///
/// Idempotent: text that already ends in the marker with at most `budget`
/// characters before it is returned unchanged, so snapshot records exported
/// from a normalized table hydrate back to the same description.
#[must_use]
pub fn truncate_description(text: &str, budget: usize) -> String {
    if let Some(body) = text.strip_suffix(TRUNCATION_MARKER) {
        if body.chars().count() <= budget {
            return text.to_owned();
        }
    }
    match text.char_indices().nth(budget) {
        None => text.to_owned(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(text[..cut].trim_end());
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Normalizes one decoded feed row.
///
/// Checks run in order and stop at the first failure: row width against the
/// header, then the id heuristic. The description is then cut to budget.
///
/// # Errors
///
/// Returns the [`Rejection`] that disqualified the row.
pub fn normalize_row(
    row: &[String],
    columns: &ColumnMap,
    rules: &NormalizeRules,
) -> Result<Product, Rejection> {
    let expected_min = min_fields(columns.width(), rules.min_field_ratio);
    if row.len() < expected_min {
        return Err(Rejection::ShortRow {
            fields: row.len(),
            expected_min,
        });
    }

    let id = columns.resolve(row, ID_ALIASES);
    validate_id(id, rules.max_id_len)?;

    Ok(build_product(
        FieldValues {
            id,
            name: columns.resolve(row, NAME_ALIASES),
            price: columns.resolve(row, PRICE_ALIASES),
            image_url: columns.resolve(row, IMAGE_ALIASES),
            affiliate_link: columns.resolve(row, LINK_ALIASES),
            store: columns.resolve(row, STORE_ALIASES),
            category: columns.resolve(row, CATEGORY_ALIASES),
            brand: columns.resolve(row, BRAND_ALIASES),
            description: columns.resolve(row, DESCRIPTION_ALIASES),
            social_link: columns.resolve(row, SOCIAL_ALIASES),
        },
        rules,
    ))
}

/// Hydrates one compact snapshot record. Missing trailing positions read as
/// empty; the same id and description rules apply as for feed rows.
///
/// # Errors
///
/// Returns [`Rejection::MissingId`] or [`Rejection::MalformedId`].
pub fn normalize_compact(cells: &[String], rules: &NormalizeRules) -> Result<Product, Rejection> {
    let cell = |idx: usize| cells.get(idx).map_or("", |c| c.trim());

    let id = cell(0);
    validate_id(id, rules.max_id_len)?;

    Ok(build_product(
        FieldValues {
            id,
            name: cell(1),
            price: cell(2),
            image_url: cell(3),
            affiliate_link: cell(4),
            store: cell(5),
            category: cell(6),
            brand: cell(7),
            description: cell(8),
            social_link: cell(9),
        },
        rules,
    ))
}

/// Decodes and normalizes a whole CSV document. The first row is the header.
#[must_use]
pub fn ingest_csv(text: &str, rules: &NormalizeRules) -> IngestReport {
    let mut rows = Decoder::new(text);
    let Some(header) = rows.next() else {
        return IngestReport::default();
    };
    let columns = ColumnMap::from_header(&header);

    collect(rows, columns.headers().to_vec(), |row: &RawRow| {
        normalize_row(row, &columns, rules)
    })
}

/// Normalizes compact snapshot records.
#[must_use]
pub fn ingest_compact(records: Vec<Vec<String>>, rules: &NormalizeRules) -> IngestReport {
    collect(records, Vec::new(), |cells: &Vec<String>| {
        normalize_compact(cells, rules)
    })
}

fn collect<I, F>(rows: I, headers: Vec<String>, mut normalize: F) -> IngestReport
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> Result<Product, Rejection>,
{
    let mut products = Vec::new();
    let mut rejected = RejectionCounts::default();
    let mut rows_seen = 0usize;

    for row in rows {
        rows_seen += 1;
        match normalize(&row) {
            Ok(product) => products.push(product),
            Err(rejection) => {
                tracing::debug!(row = rows_seen, reason = %rejection, "dropping feed row");
                rejected.record(&rejection);
            }
        }
    }

    IngestReport {
        table: ProductTable::new(products, headers),
        rows_seen,
        rejected,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn min_fields(width: usize, ratio: f64) -> usize {
    (width as f64 * ratio).ceil() as usize
}

struct FieldValues<'a> {
    id: &'a str,
    name: &'a str,
    price: &'a str,
    image_url: &'a str,
    affiliate_link: &'a str,
    store: &'a str,
    category: &'a str,
    brand: &'a str,
    description: &'a str,
    social_link: &'a str,
}

fn build_product(values: FieldValues<'_>, rules: &NormalizeRules) -> Product {
    let store = if values.store.is_empty() {
        DEFAULT_STORE_LABEL
    } else {
        values.store
    };
    let social_link = Some(values.social_link)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    Product {
        id: values.id.to_owned(),
        name: values.name.to_owned(),
        description: truncate_description(values.description, rules.description_budget),
        price: values.price.to_owned(),
        affiliate_link: values.affiliate_link.to_owned(),
        image_url: values.image_url.to_owned(),
        store: store.to_owned(),
        category: values.category.to_owned(),
        brand: values.brand.to_owned(),
        social_link,
        button_text: Product::button_text_for(store),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
