//! Freshness cache over the active source backend.
//!
//! Concurrency contract:
//! - At most one source fetch is outstanding at a time. The in-flight refresh
//!   lives in a slot as a [`Shared`] future and every caller that needs a
//!   refresh clones the same handle.
//! - A caller that finds a stale table triggers (or joins) that refresh in the
//!   background and is answered from the stale table immediately. A caller
//!   that finds nothing cached awaits the refresh.
//! - The table and the filter options are replaced wholesale behind `Arc`s,
//!   never mutated in place.
//! - A failed refresh never overwrites a cached table. With nothing cached,
//!   callers receive an empty table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::time::Instant;
use vitrine_core::{CatalogTuning, FilterOptions, SourceKind};

use crate::error::CatalogError;
use crate::filters::{build_filter_options, FilterRules};
use crate::normalize::NormalizeRules;
use crate::source::SourceBackend;
use crate::table::ProductTable;

type RefreshResult = Result<Arc<CacheEntry>, Arc<CatalogError>>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshResult>>;

/// Lifetimes and ingestion rules for one cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub filters_ttl: Duration,
    pub normalize: NormalizeRules,
    pub filters: FilterRules,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&CatalogTuning::default())
    }
}

impl From<&CatalogTuning> for CacheSettings {
    fn from(tuning: &CatalogTuning) -> Self {
        Self {
            ttl: Duration::from_secs(tuning.cache_ttl_secs),
            filters_ttl: Duration::from_secs(tuning.filters_ttl_secs),
            normalize: NormalizeRules::from(tuning),
            filters: FilterRules::from(tuning),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    table: Arc<ProductTable>,
    fetched_at: Instant,
    generation: u64,
}

#[derive(Debug)]
struct FilterEntry {
    options: Arc<FilterOptions>,
    built_at: Instant,
    generation: u64,
}

/// Coarse cache state, distinguishing "never fetched" from "fetched but stale".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: CacheState,
    pub source: SourceKind,
    pub products: usize,
    /// Number of successful refreshes so far.
    pub generation: u64,
    pub age_secs: Option<u64>,
    pub refreshing: bool,
}

struct Inner {
    source: SourceBackend,
    settings: CacheSettings,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    filters: RwLock<Option<Arc<FilterEntry>>>,
    in_flight: Mutex<Option<RefreshFuture>>,
    generation: AtomicU64,
}

/// Shared handle to one catalog cache. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("source", &self.inner.source)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(source: SourceBackend, settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                entry: RwLock::new(None),
                filters: RwLock::new(None),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    /// Returns the table to query. Never fails: a stale table is preferred
    /// over no data, and with nothing cached an empty table is returned.
    pub async fn get_table(&self) -> Arc<ProductTable> {
        self.current_entry()
            .await
            .map_or_else(|| Arc::new(ProductTable::empty()), |e| Arc::clone(&e.table))
    }

    /// Starts (or joins) a refresh and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure, shared among every caller that joined
    /// the same refresh. The cached table is left untouched on failure.
    pub async fn refresh(&self) -> Result<Arc<ProductTable>, Arc<CatalogError>> {
        let entry = self.refresh_handle().await?;
        Ok(Arc::clone(&entry.table))
    }

    /// Filter options for the current table, rebuilt when their own TTL
    /// expires or the table generation changes.
    pub async fn filter_options(&self) -> Arc<FilterOptions> {
        let Some(entry) = self.current_entry().await else {
            return Arc::new(FilterOptions::default());
        };

        let cached = read_lock(&self.inner.filters);
        if let Some(filters) = cached {
            if filters.generation == entry.generation
                && filters.built_at.elapsed() < self.inner.settings.filters_ttl
            {
                return Arc::clone(&filters.options);
            }
        }

        let options = Arc::new(build_filter_options(
            &entry.table,
            &self.inner.settings.filters,
        ));
        tracing::debug!(
            generation = entry.generation,
            stores = options.stores.len(),
            categories = options.categories.len(),
            brands = options.brands.len(),
            "filter options rebuilt"
        );
        *write_lock(&self.inner.filters) = Some(Arc::new(FilterEntry {
            options: Arc::clone(&options),
            built_at: Instant::now(),
            generation: entry.generation,
        }));
        options
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        let entry = read_lock(&self.inner.entry);
        let refreshing = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        let source = self.inner.source.kind();

        match entry {
            None => CacheStatus {
                state: CacheState::Empty,
                source,
                products: 0,
                generation: 0,
                age_secs: None,
                refreshing,
            },
            Some(entry) => {
                let age = entry.fetched_at.elapsed();
                CacheStatus {
                    state: if age < self.inner.settings.ttl {
                        CacheState::Fresh
                    } else {
                        CacheState::Stale
                    },
                    source,
                    products: entry.table.len(),
                    generation: entry.generation,
                    age_secs: Some(age.as_secs()),
                    refreshing,
                }
            }
        }
    }

    async fn current_entry(&self) -> Option<Arc<CacheEntry>> {
        let cached = read_lock(&self.inner.entry);
        match cached {
            Some(entry) if entry.fetched_at.elapsed() < self.inner.settings.ttl => Some(entry),
            Some(stale) => {
                self.trigger_refresh();
                Some(stale)
            }
            None => self.refresh_handle().await.ok(),
        }
    }

    /// Returns the in-flight refresh, starting one if none is running.
    fn refresh_handle(&self) -> RefreshFuture {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| self.spawn_refresh()).clone()
    }

    /// Starts a background refresh unless one is already running.
    fn trigger_refresh(&self) {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(self.spawn_refresh());
        }
    }

    // Must be called with the slot locked. The spawned driver completes the
    // refresh even if every caller goes away.
    fn spawn_refresh(&self) -> RefreshFuture {
        let refresh = run_refresh(Arc::clone(&self.inner)).boxed().shared();
        let driver = refresh.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        refresh
    }
}

async fn run_refresh(inner: Arc<Inner>) -> RefreshResult {
    let started = Instant::now();
    let source = inner.source.kind();
    tracing::info!(%source, "refreshing catalog");

    let outcome = inner.source.load(&inner.settings.normalize).await;

    let result = match outcome {
        Ok(report) => {
            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let entry = Arc::new(CacheEntry {
                table: Arc::new(report.table),
                fetched_at: Instant::now(),
                generation,
            });
            *write_lock(&inner.entry) = Some(Arc::clone(&entry));
            *write_lock(&inner.filters) = None;

            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            tracing::info!(
                %source,
                rows = entry.table.len(),
                rows_seen = report.rows_seen,
                rejected = report.rejected.total(),
                short_rows = report.rejected.short_rows,
                missing_id = report.rejected.missing_id,
                malformed_id = report.rejected.malformed_id,
                generation,
                elapsed_ms,
                "catalog refreshed"
            );
            Ok(entry)
        }
        Err(e) => {
            let serving_stale = read_lock(&inner.entry).is_some();
            tracing::warn!(
                %source,
                error = %e,
                source_unavailable = e.is_source_unavailable(),
                serving_stale,
                "catalog refresh failed"
            );
            Err(Arc::new(e))
        }
    };

    *inner
        .in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
    result
}

fn read_lock<T: Clone>(lock: &RwLock<T>) -> T {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
