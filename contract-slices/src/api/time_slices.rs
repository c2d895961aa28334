//! Time slice endpoints
//!
//! - `POST /time-slices` creates a slice
//! - `GET /time-slices/:contract_id` lists a contract's slices, newest first

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, warn};

use crate::engine::CreateOutcome;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreatedResponse, IncomingPayload, TimeSlice};
use crate::AppState;

const ALL_KNOWN_MESSAGE: &str =
    "all provided article IDs already exist for this contract - no new time slice created";

/// POST /time-slices
pub async fn create_time_slice(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let payload: IncomingPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Failed to decode payload");
        ApiError::BadRequest(format!("invalid JSON payload: {}", e))
    })?;

    let slice = payload
        .validate()
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    match state
        .engine
        .create_time_slice_within(&slice, state.request_timeout)
        .await
    {
        CreateOutcome::Created(id) => {
            info!(time_slice_id = id, contract_id = %slice.contract_id, "Time slice created");
            Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
        }
        CreateOutcome::AllArticlesKnown => {
            info!(
                contract_id = %slice.contract_id,
                article_ids = ?slice.article_ids,
                "All article IDs already recorded"
            );
            Err(ApiError::Conflict(ALL_KNOWN_MESSAGE.to_string()))
        }
        CreateOutcome::Failed(e) => {
            error!(error = %e, contract_id = %slice.contract_id, "Failed to create time slice");
            Err(ApiError::Internal("could not persist time slice".to_string()))
        }
    }
}

/// GET /time-slices/:contract_id
pub async fn list_time_slices(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> ApiResult<Json<Vec<TimeSlice>>> {
    if contract_id.is_empty() {
        return Err(ApiError::BadRequest(
            "contract_id is required in the URL path".to_string(),
        ));
    }

    let slices = match tokio::time::timeout(
        state.request_timeout,
        state.query.list_time_slices(&contract_id),
    )
    .await
    {
        Ok(Ok(slices)) => slices,
        Ok(Err(e)) => {
            error!(error = %e, contract_id = %contract_id, "Failed to fetch time slices");
            return Err(ApiError::Internal("could not fetch time slices".to_string()));
        }
        Err(_) => {
            error!(contract_id = %contract_id, "Timed out fetching time slices");
            return Err(ApiError::Internal("could not fetch time slices".to_string()));
        }
    };

    if slices.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no time slices found for contract_id: {}",
            contract_id
        )));
    }

    Ok(Json(slices))
}
