//! Read-only commands answered from the configured source, the same way
//! the server answers them.

use vitrine_catalog::Catalog;
use vitrine_core::{AppConfig, ProductQuery};

use crate::print_json;

/// Loads the catalog eagerly so a dead source is an error here rather than
/// an empty result.
async fn loaded_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    let catalog = Catalog::from_app_config(config)?;
    let products = catalog
        .warm()
        .await
        .map_err(|e| anyhow::anyhow!("failed to load catalog from {}: {e}", config.source))?;
    tracing::info!(source = %config.source, products, "catalog loaded");
    Ok(catalog)
}

pub(crate) async fn run_query(config: &AppConfig, request: &ProductQuery) -> anyhow::Result<()> {
    let catalog = loaded_catalog(config).await?;
    print_json(&catalog.products_page(request).await)
}

pub(crate) async fn run_product(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let catalog = loaded_catalog(config).await?;
    let product = catalog
        .product_by_id(id)
        .await
        .ok_or_else(|| anyhow::anyhow!("product '{id}' not found"))?;
    print_json(&product)
}

pub(crate) async fn run_filters(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = loaded_catalog(config).await?;
    print_json(&*catalog.filter_options().await)
}
