use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Environment {
    /// Production logs go to collectors that do not render ANSI escapes.
    #[must_use]
    pub fn ansi_logs(&self) -> bool {
        !matches!(self, Environment::Production)
    }
}

/// Which backend feeds the catalog. Exactly one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Published spreadsheet exported as CSV over HTTP.
    Feed,
    /// Pre-chunked, pre-normalized records in a key-value store.
    Snapshot,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Feed => write!(f, "feed"),
            SourceKind::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Clone)]
pub struct FeedSettings {
    /// Published-CSV URL. Required when the feed backend is active; the CLI
    /// also reads it when building a snapshot.
    pub url: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("url", &self.url.as_ref().map(|_| "[redacted]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSettings {
    /// Directory backing the key-value store, one file per key.
    pub dir: PathBuf,
    /// Key holding the number of chunks.
    pub count_key: String,
    /// Chunk `i` lives under `{chunk_prefix}{i}`.
    pub chunk_prefix: String,
}

/// Heuristic thresholds and cache lifetimes. These were tuned against a real
/// feed of uneven quality, so they are configuration rather than constants.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTuning {
    pub cache_ttl_secs: u64,
    pub filters_ttl_secs: u64,
    /// Description storage budget in characters.
    pub description_budget: usize,
    pub max_id_len: usize,
    /// Rows narrower than `min_field_ratio * header_width` are dropped.
    pub min_field_ratio: f64,
    pub filter_min_len: usize,
    pub filter_max_len: usize,
    pub filter_max_words: usize,
    /// Reservoir size per store for the landing-page sample.
    pub sample_per_store: usize,
    pub sample_replace_probability: f64,
}

impl Default for CatalogTuning {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            filters_ttl_secs: 86_400,
            description_budget: 100,
            max_id_len: 25,
            min_field_ratio: 0.5,
            filter_min_len: 2,
            filter_max_len: 50,
            filter_max_words: 8,
            sample_per_store: 15,
            sample_replace_probability: 0.3,
        }
    }
}

/// Per-client fixed-window request limit applied to every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests allowed per client per window. Zero turns the limiter off.
    pub max_requests: usize,
    pub window_secs: u64,
}

impl RateLimitSettings {
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.max_requests > 0
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub source: SourceKind,
    pub feed: FeedSettings,
    pub snapshot: SnapshotSettings,
    pub tuning: CatalogTuning,
    pub rate_limit: RateLimitSettings,
}
