use axum::{extract::State, Extension, Json};
use vitrine_core::FilterOptions;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

pub(super) async fn list_filters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<FilterOptions>> {
    let options = state.catalog.filter_options().await;
    Json(ApiResponse {
        data: FilterOptions::clone(&options),
        meta: ResponseMeta::new(req_id.0),
    })
}
