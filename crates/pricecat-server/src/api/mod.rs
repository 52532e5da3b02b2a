mod listings;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pricecat_catalog::ReferencePriceTable;
use pricecat_core::{CatalogStore, StoreError};
use pricecat_sync::{CatalogSource, SyncOrchestrator};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// Shared handler state. The orchestrator owns the store and the token
/// budget; `pool` is only present when runs are tracked in Postgres.
pub struct AppState<Src, St> {
    pub orchestrator: Arc<SyncOrchestrator<Src, St>>,
    pub references: Arc<ReferencePriceTable>,
    pub pool: Option<PgPool>,
}

impl<Src, St> AppState<Src, St> {
    pub fn new(orchestrator: Arc<SyncOrchestrator<Src, St>>, pool: Option<PgPool>) -> Self {
        Self {
            orchestrator,
            references: Arc::new(ReferencePriceTable::default()),
            pool,
        }
    }
}

impl<Src, St> Clone for AppState<Src, St> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            references: Arc::clone(&self.references),
            pool: self.pool.clone(),
        }
    }
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
    database: &'static str,
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
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" | "insufficient_budget" => StatusCode::TOO_MANY_REQUESTS,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    usize::try_from(limit.unwrap_or(50).clamp(1, 200)).unwrap_or(50)
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    tracing::error!(error = %error, "catalog query failed");
    match error {
        StoreError::Unavailable(_) => {
            ApiError::new(request_id, "store_unavailable", "catalog storage unavailable")
        }
        StoreError::Conflict(_) => ApiError::new(request_id, "internal_error", "catalog query failed"),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router<Src, St>(
    auth: AuthState,
    rate_limit: RateLimitState,
) -> Router<AppState<Src, St>>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    Router::new()
        .route("/api/v1/sync", post(sync::trigger_sync::<Src, St>))
        .route("/api/v1/budget", get(sync::get_budget::<Src, St>))
        .route("/api/v1/listings", get(listings::list_listings::<Src, St>))
        .route(
            "/api/v1/products/{slug}",
            get(listings::get_product::<Src, St>),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app<Src, St>(
    state: AppState<Src, St>,
    auth: AuthState,
    rate_limit: RateLimitState,
) -> Router
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let public_routes = Router::new().route("/api/v1/health", get(health::<Src, St>));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health<Src, St>(
    State(state): State<AppState<Src, St>>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let meta = ResponseMeta::new(req_id.0);

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "not_configured",
                },
                meta,
            }),
        );
    };

    match pricecat_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
