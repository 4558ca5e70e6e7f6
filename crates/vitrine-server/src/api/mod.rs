mod filters;
mod products;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use vitrine_catalog::{CacheState, Catalog};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

/// Browsers and edge caches may reuse the filter lists for this long.
const FILTERS_CACHE_CONTROL: &str = "public, max-age=300";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    cache: CacheState,
    source: String,
    products: usize,
    generation: u64,
    age_secs: Option<u64>,
    refreshing: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PingData {
    ok: bool,
    route: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Page size: 50 when absent, clamped to `0..=200`. Zero yields an empty page.
pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    let clamped = limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);
    usize::try_from(clamped).unwrap_or(0)
}

pub(super) fn normalize_offset(offset: Option<i64>) -> usize {
    offset.and_then(|o| usize::try_from(o).ok()).unwrap_or(0)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/{id}", get(products::get_product))
        .route(
            "/api/v1/filters",
            get(filters::list_filters).layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static(FILTERS_CACHE_CONTROL),
            )),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Reports cache state. `503` until the first successful load, so load
/// balancers can use it as a readiness check.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let status = state.catalog.status();
    let ready = status.state != CacheState::Empty;

    let data = HealthData {
        status: if ready { "ok" } else { "degraded" },
        cache: status.state,
        source: status.source.to_string(),
        products: status.products,
        generation: status.generation,
        age_secs: status.age_secs,
        refreshing: status.refreshing,
    };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

async fn ping(Extension(req_id): Extension<RequestId>) -> Json<ApiResponse<PingData>> {
    Json(ApiResponse {
        data: PingData {
            ok: true,
            route: "/api/v1/ping",
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
