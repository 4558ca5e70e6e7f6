use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{
    AppConfig, CatalogTuning, Environment, FeedSettings, RateLimitSettings, SnapshotSettings,
    SourceKind,
};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| ParsedVar {
        var: var.to_string(),
        raw: or_default(var, default),
    };

    let env = parse_environment(&or_default("VITRINE_ENV", "development"));
    let bind_addr: SocketAddr = parse("VITRINE_BIND_ADDR", "0.0.0.0:3000").value()?;
    let log_level = or_default("VITRINE_LOG_LEVEL", "info");

    let source = parse_source(&or_default("VITRINE_SOURCE", "feed"))?;
    let feed_url = lookup("VITRINE_FEED_URL")
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    if source == SourceKind::Feed && feed_url.is_none() {
        return Err(ConfigError::MissingEnvVar("VITRINE_FEED_URL".to_string()));
    }

    let feed = FeedSettings {
        url: feed_url,
        request_timeout_secs: parse("VITRINE_REQUEST_TIMEOUT_SECS", "30").value()?,
        user_agent: or_default("VITRINE_USER_AGENT", "vitrine/0.1 (catalog-feed)"),
        max_retries: parse("VITRINE_MAX_RETRIES", "2").value()?,
        retry_backoff_base_secs: parse("VITRINE_RETRY_BACKOFF_BASE_SECS", "1").value()?,
    };

    let snapshot = SnapshotSettings {
        dir: PathBuf::from(or_default("VITRINE_SNAPSHOT_DIR", "./snapshot")),
        count_key: or_default("VITRINE_SNAPSHOT_COUNT_KEY", "products_chunk_count"),
        chunk_prefix: or_default("VITRINE_SNAPSHOT_CHUNK_PREFIX", "products_chunk_"),
    };

    let tuning = CatalogTuning {
        cache_ttl_secs: parse("VITRINE_CACHE_TTL_SECS", "600").positive()?,
        filters_ttl_secs: parse("VITRINE_FILTERS_TTL_SECS", "86400").positive()?,
        description_budget: parse("VITRINE_DESCRIPTION_BUDGET", "100").value()?,
        max_id_len: parse("VITRINE_MAX_ID_LEN", "25").value()?,
        min_field_ratio: parse("VITRINE_MIN_FIELD_RATIO", "0.5").ratio()?,
        filter_min_len: parse("VITRINE_FILTER_MIN_LEN", "2").value()?,
        filter_max_len: parse("VITRINE_FILTER_MAX_LEN", "50").value()?,
        filter_max_words: parse("VITRINE_FILTER_MAX_WORDS", "8").value()?,
        sample_per_store: parse("VITRINE_SAMPLE_PER_STORE", "15").value()?,
        sample_replace_probability: parse("VITRINE_SAMPLE_REPLACE_PROBABILITY", "0.3")
            .ratio()?,
    };

    if tuning.filter_min_len > tuning.filter_max_len {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_FILTER_MIN_LEN".to_string(),
            reason: format!(
                "must not exceed VITRINE_FILTER_MAX_LEN ({})",
                tuning.filter_max_len
            ),
        });
    }

    let rate_limit = RateLimitSettings {
        max_requests: parse("VITRINE_RATE_LIMIT_MAX_REQUESTS", "120").value()?,
        window_secs: parse("VITRINE_RATE_LIMIT_WINDOW_SECS", "60").positive()?,
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        source,
        feed,
        snapshot,
        tuning,
        rate_limit,
    })
}

/// A raw env value paired with its variable name for error reporting.
struct ParsedVar {
    var: String,
    raw: String,
}

impl ParsedVar {
    fn value<T>(&self) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: self.var.clone(),
                reason: e.to_string(),
            })
    }

    fn positive(&self) -> Result<u64, ConfigError> {
        match self.value::<u64>()? {
            0 => Err(ConfigError::InvalidEnvVar {
                var: self.var.clone(),
                reason: "must be greater than zero".to_string(),
            }),
            n => Ok(n),
        }
    }

    fn ratio(&self) -> Result<f64, ConfigError> {
        let value = self.value::<f64>()?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: self.var.clone(),
                reason: format!("{value} is outside 0.0..=1.0"),
            })
        }
    }
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_source(s: &str) -> Result<SourceKind, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "feed" | "csv" => Ok(SourceKind::Feed),
        "snapshot" | "kv" => Ok(SourceKind::Snapshot),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_SOURCE".to_string(),
            reason: format!("unknown source \"{other}\" (expected \"feed\" or \"snapshot\")"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
