mod app_config;
mod config;
mod products;

use thiserror::Error;

pub use app_config::{
    AppConfig, CatalogTuning, Environment, FeedSettings, RateLimitSettings, SnapshotSettings,
    SourceKind,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{FilterOptions, Product, ProductPage, ProductQuery, DEFAULT_STORE_LABEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
