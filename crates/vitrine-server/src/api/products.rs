use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use vitrine_core::{Product, ProductQuery};

use crate::middleware::RequestId;

use super::{normalize_limit, normalize_offset, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ProductListData {
    total: usize,
    offset: usize,
    limit: usize,
    products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductListParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    pub store: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
}

impl ProductListParams {
    fn into_query(self) -> ProductQuery {
        ProductQuery {
            offset: normalize_offset(self.offset),
            limit: normalize_limit(self.limit),
            search_term: self.query.unwrap_or_default(),
            store: self.store.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            brand: self.brand.unwrap_or_default(),
        }
    }
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ProductListParams>,
) -> Json<ApiResponse<ProductListData>> {
    let query = params.into_query();
    let page = state.catalog.products_page(&query).await;

    tracing::debug!(
        request_id = %req_id.0,
        total = page.total_count,
        returned = page.products.len(),
        "products listed"
    );

    Json(ApiResponse {
        data: ProductListData {
            total: page.total_count,
            offset: query.offset,
            limit: query.limit,
            products: page.products,
            headers: page.headers,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Some(product) = state.catalog.product_by_id(&id).await else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("product {id} not found"),
        ));
    };

    Ok(Json(ApiResponse {
        data: product,
        meta: ResponseMeta::new(req_id.0),
    }))
}
