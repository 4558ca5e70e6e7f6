use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from feed {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("feed rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("key-value store error for key \"{key}\": {reason}")]
    Store { key: String, reason: String },

    #[error("snapshot unavailable: no readable chunk found (count key \"{key}\")")]
    SnapshotMissing { key: String },

    #[error("invalid key-value store key \"{key}\"")]
    InvalidKey { key: String },

    #[error("feed source selected but no feed URL is configured")]
    MissingFeedUrl,
}

impl CatalogError {
    /// Returns `true` for failures meaning the configured feed or snapshot
    /// could not be retrieved at all, as opposed to a malformed payload.
    #[must_use]
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            CatalogError::Http(_)
                | CatalogError::UnexpectedStatus { .. }
                | CatalogError::RateLimited { .. }
                | CatalogError::Store { .. }
                | CatalogError::SnapshotMissing { .. }
        )
    }
}
