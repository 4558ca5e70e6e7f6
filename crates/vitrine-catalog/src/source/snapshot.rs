//! Chunked snapshot of pre-normalized records in a key-value store.
//!
//! Layout: `{count_key}` holds the chunk count; `{chunk_prefix}{i}` holds a
//! JSON array of compact records for `i` in `0..count`. Compact records use
//! the positional schema documented on [`crate::normalize::COMPACT_WIDTH`].

use std::sync::Arc;

use serde_json::Value;
use vitrine_core::{Product, SnapshotSettings};

use crate::error::CatalogError;
use crate::source::kv::KvStore;

/// Key names for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotKeys {
    pub count_key: String,
    pub chunk_prefix: String,
}

impl SnapshotKeys {
    #[must_use]
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}{index}", self.chunk_prefix)
    }
}

impl Default for SnapshotKeys {
    fn default() -> Self {
        Self {
            count_key: "products_chunk_count".to_owned(),
            chunk_prefix: "products_chunk_".to_owned(),
        }
    }
}

impl From<&SnapshotSettings> for SnapshotKeys {
    fn from(settings: &SnapshotSettings) -> Self {
        Self {
            count_key: settings.count_key.clone(),
            chunk_prefix: settings.chunk_prefix.clone(),
        }
    }
}

/// Reads compact records from a snapshot.
#[derive(Clone)]
pub struct SnapshotSource {
    store: Arc<dyn KvStore>,
    keys: SnapshotKeys,
}

impl std::fmt::Debug for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSource")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl SnapshotSource {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, keys: SnapshotKeys) -> Self {
        Self { store, keys }
    }

    #[must_use]
    pub fn keys(&self) -> &SnapshotKeys {
        &self.keys
    }

    /// Reads and concatenates every chunk in index order.
    ///
    /// A missing or unparsable count is read as one chunk. Missing or
    /// unparsable chunks are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Store`] if the count key cannot be read at all.
    /// - [`CatalogError::SnapshotMissing`] if no chunk could be read.
    pub async fn read_records(&self) -> Result<Vec<Vec<String>>, CatalogError> {
        let raw_count = self.store.get(&self.keys.count_key).await?;
        let chunk_count = match raw_count.as_deref().map(str::trim).map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => n,
            other => {
                tracing::warn!(
                    key = %self.keys.count_key,
                    value = ?other,
                    "snapshot chunk count missing or invalid, assuming 1"
                );
                1
            }
        };

        let mut records = Vec::new();
        let mut chunks_read = 0usize;

        for index in 0..chunk_count {
            let key = self.keys.chunk_key(index);
            let json = match self.store.get(&key).await {
                Ok(Some(json)) => json,
                Ok(None) => {
                    tracing::warn!(%key, "snapshot chunk missing, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "snapshot chunk unreadable, skipping");
                    continue;
                }
            };
            match parse_chunk(&json) {
                Ok(chunk) => {
                    records.extend(chunk);
                    chunks_read += 1;
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "snapshot chunk is not valid JSON, skipping");
                }
            }
        }

        if chunks_read == 0 {
            return Err(CatalogError::SnapshotMissing {
                key: self.keys.count_key.clone(),
            });
        }

        tracing::debug!(chunk_count, chunks_read, records = records.len(), "snapshot read");
        Ok(records)
    }
}

/// Parses one chunk. Cells may be strings, numbers, booleans, or null;
/// everything is stringified and null becomes `""`.
///
/// # Errors
///
/// Returns the `serde_json` error if the chunk is not an array of arrays.
pub fn parse_chunk(json: &str) -> Result<Vec<Vec<String>>, serde_json::Error> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(json)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Encodes a product into the compact positional record.
#[must_use]
pub fn to_compact(product: &Product) -> Vec<String> {
    vec![
        product.id.clone(),
        product.name.clone(),
        product.price.clone(),
        product.image_url.clone(),
        product.affiliate_link.clone(),
        product.store.clone(),
        product.category.clone(),
        product.brand.clone(),
        product.description.clone(),
        product.social_link.clone().unwrap_or_default(),
    ]
}

/// Writes `products` as a chunked snapshot and returns the chunk count.
///
/// Chunks are written first and the count key last, so a concurrent reader
/// never sees a count pointing past the written chunks. An empty catalog is
/// written as one empty chunk.
///
/// # Errors
///
/// Returns [`CatalogError::Store`] or [`CatalogError::InvalidKey`] from the
/// store, or [`CatalogError::Deserialize`] if a chunk cannot be serialized.
pub async fn write_snapshot(
    store: &dyn KvStore,
    keys: &SnapshotKeys,
    products: &[Product],
    chunk_size: usize,
) -> Result<usize, CatalogError> {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<&[Product]> = if products.is_empty() {
        vec![&[]]
    } else {
        products.chunks(chunk_size).collect()
    };

    for (index, chunk) in chunks.iter().enumerate() {
        let records: Vec<Vec<String>> = chunk.iter().map(to_compact).collect();
        let json = serde_json::to_string(&records).map_err(|e| CatalogError::Deserialize {
            context: format!("snapshot chunk {index}"),
            source: e,
        })?;
        store.put(&keys.chunk_key(index), json).await?;
    }

    store
        .put(&keys.count_key, chunks.len().to_string())
        .await?;

    tracing::info!(
        products = products.len(),
        chunks = chunks.len(),
        "snapshot written"
    );
    Ok(chunks.len())
}
