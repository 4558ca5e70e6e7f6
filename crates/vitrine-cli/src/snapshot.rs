//! Exports the live feed as a chunked snapshot in a directory-backed store.
//!
//! The snapshot is what a deployment with `VITRINE_SOURCE=snapshot` reads, so
//! rows are normalized here with the same rules the server would apply.

use std::path::PathBuf;

use serde::Serialize;
use vitrine_catalog::{
    write_snapshot, DirectoryKv, FeedClient, NormalizeRules, SnapshotKeys, SourceBackend,
};
use vitrine_core::AppConfig;

use crate::print_json;

#[derive(Debug, Serialize)]
struct SnapshotSummary {
    dir: PathBuf,
    products: usize,
    chunks: usize,
    rows_seen: usize,
    rejected: usize,
}

/// Fetch, normalize, and write the feed as `chunk_size`-product chunks.
///
/// # Errors
///
/// Returns an error if no feed URL is configured, the feed cannot be fetched,
/// or the snapshot directory cannot be written.
pub(crate) async fn run_snapshot(
    config: &AppConfig,
    chunk_size: usize,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = FeedClient::from_settings(&config.feed)?
        .ok_or_else(|| anyhow::anyhow!("VITRINE_FEED_URL must be set to build a snapshot"))?;
    let rules = NormalizeRules::from(&config.tuning);

    let report = SourceBackend::Feed(client).load(&rules).await?;
    if report.rejected.total() > 0 {
        tracing::warn!(
            rejected = report.rejected.total(),
            short_rows = report.rejected.short_rows,
            missing_id = report.rejected.missing_id,
            malformed_id = report.rejected.malformed_id,
            "feed rows rejected during snapshot"
        );
    }

    let dir = dir.unwrap_or_else(|| config.snapshot.dir.clone());
    let store = DirectoryKv::new(dir.clone());
    let keys = SnapshotKeys::from(&config.snapshot);
    let chunks = write_snapshot(&store, &keys, report.table.products(), chunk_size).await?;

    print_json(&SnapshotSummary {
        dir,
        products: report.table.len(),
        chunks,
        rows_seen: report.rows_seen,
        rejected: report.rejected.total(),
    })
}
