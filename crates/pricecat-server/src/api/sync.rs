use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use pricecat_core::CatalogStore;
use pricecat_sync::{CatalogSource, SyncOutcome, SyncRequest, SyncSummary, TokenStatus};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::runs::run_recorded;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SyncRunData {
    run_id: Option<Uuid>,
    #[serde(flatten)]
    summary: SyncSummary,
}

/// `POST /api/v1/sync`. A run that could not start for lack of budget is
/// answered with 429 and the (empty) summary; a partial run is still 200.
pub(super) async fn trigger_sync<Src, St>(
    State(state): State<AppState<Src, St>>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SyncRunData>>), ApiError>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    if request.limit == Some(0) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "limit must be at least 1",
        ));
    }

    let recorded = run_recorded(
        &state.orchestrator,
        state.pool.as_ref(),
        &request,
        "api",
    )
    .await;

    let (status, summary) = match recorded.outcome {
        Ok(SyncOutcome::Completed(summary)) => (StatusCode::OK, summary),
        Ok(SyncOutcome::InsufficientBudget(summary)) => (StatusCode::TOO_MANY_REQUESTS, summary),
        Err(e) => {
            tracing::error!(mode = %request.mode, error = %e, "sync run failed");
            return Err(ApiError::new(req_id.0, "sync_failed", e.to_string()));
        }
    };

    Ok((
        status,
        Json(ApiResponse {
            data: SyncRunData {
                run_id: recorded.run_id,
                summary,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_budget<Src, St>(
    State(state): State<AppState<Src, St>>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<TokenStatus>>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    Json(ApiResponse {
        data: state.orchestrator.budget().token_status(),
        meta: ResponseMeta::new(req_id.0),
    })
}
