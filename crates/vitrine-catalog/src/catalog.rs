//! Query-facing facade: cache plus query engine plus filter index.

use std::sync::Arc;

use vitrine_core::{AppConfig, CatalogTuning, FilterOptions, Product, ProductPage, ProductQuery};

use crate::cache::{CacheSettings, CacheStatus, CatalogCache};
use crate::error::CatalogError;
use crate::query::{find_by_id, query};
use crate::sampling::SamplingConfig;
use crate::source::SourceBackend;

/// The catalog as the HTTP layer and CLI see it. Cheap to clone.
///
/// No operation here fails on data problems: an unreachable source degrades
/// to the last good table, or to an empty one.
#[derive(Debug, Clone)]
pub struct Catalog {
    cache: CatalogCache,
    sampling: SamplingConfig,
}

impl Catalog {
    #[must_use]
    pub fn new(source: SourceBackend, tuning: &CatalogTuning) -> Self {
        Self {
            cache: CatalogCache::new(source, CacheSettings::from(tuning)),
            sampling: SamplingConfig::from(tuning),
        }
    }

    /// Builds the catalog over the backend selected in `config`.
    ///
    /// # Errors
    ///
    /// See [`SourceBackend::from_app_config`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CatalogError> {
        let source = SourceBackend::from_app_config(config)?;
        Ok(Self::new(source, &config.tuning))
    }

    #[must_use]
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub async fn products_page(&self, request: &ProductQuery) -> ProductPage {
        let table = self.cache.get_table().await;
        query(&table, request, &self.sampling, &mut rand::rng())
    }

    /// `None` means "not found", including when no data could be loaded.
    pub async fn product_by_id(&self, id: &str) -> Option<Product> {
        let table = self.cache.get_table().await;
        find_by_id(&table, id)
    }

    pub async fn filter_options(&self) -> Arc<FilterOptions> {
        self.cache.filter_options().await
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }

    /// Loads the table eagerly and returns its size.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure; the catalog keeps serving whatever it
    /// had before.
    pub async fn warm(&self) -> Result<usize, Arc<CatalogError>> {
        let table = self.cache.refresh().await?;
        Ok(table.len())
    }
}
