//! Source backends: where raw catalog rows come from.
//!
//! Exactly one backend is active per deployment. The feed backend yields
//! CSV text that still needs decoding and column mapping; the snapshot
//! backend yields compact positional records.

pub mod feed;
pub mod kv;
pub mod snapshot;

use std::sync::Arc;

use vitrine_core::{AppConfig, SourceKind};

use crate::error::CatalogError;
use crate::normalize::{ingest_compact, ingest_csv, IngestReport, NormalizeRules};

use feed::FeedClient;
use kv::DirectoryKv;
use snapshot::{SnapshotKeys, SnapshotSource};

/// Unprocessed payload from one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFeed {
    Csv(String),
    Records(Vec<Vec<String>>),
}

impl RawFeed {
    /// Normalizes the payload into a product table.
    #[must_use]
    pub fn into_report(self, rules: &NormalizeRules) -> IngestReport {
        match self {
            RawFeed::Csv(text) => ingest_csv(&text, rules),
            RawFeed::Records(records) => ingest_compact(records, rules),
        }
    }
}

#[derive(Debug)]
pub enum SourceBackend {
    Feed(FeedClient),
    Snapshot(SnapshotSource),
}

impl SourceBackend {
    /// Builds the backend selected by `config.source`. The snapshot backend
    /// reads from a [`DirectoryKv`] rooted at `config.snapshot.dir`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::MissingFeedUrl`] if the feed is selected without a URL.
    /// - [`CatalogError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CatalogError> {
        match config.source {
            SourceKind::Feed => FeedClient::from_settings(&config.feed)?
                .map(SourceBackend::Feed)
                .ok_or(CatalogError::MissingFeedUrl),
            SourceKind::Snapshot => {
                let store = Arc::new(DirectoryKv::new(&config.snapshot.dir));
                Ok(SourceBackend::Snapshot(SnapshotSource::new(
                    store,
                    SnapshotKeys::from(&config.snapshot),
                )))
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceBackend::Feed(_) => SourceKind::Feed,
            SourceBackend::Snapshot(_) => SourceKind::Snapshot,
        }
    }

    /// Retrieves the raw payload from the active backend.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`CatalogError`].
    pub async fn fetch_raw(&self) -> Result<RawFeed, CatalogError> {
        match self {
            SourceBackend::Feed(client) => client.fetch_csv().await.map(RawFeed::Csv),
            SourceBackend::Snapshot(source) => source.read_records().await.map(RawFeed::Records),
        }
    }

    /// Fetches and normalizes in one step.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`CatalogError`]. Row-level problems are
    /// counted in the report, never returned as errors.
    pub async fn load(&self, rules: &NormalizeRules) -> Result<IngestReport, CatalogError> {
        Ok(self.fetch_raw().await?.into_report(rules))
    }
}
