//! Pull-based progress observation.
//!
//! GET /api/status/:id  — current job record, any lifecycle state.
//! GET /api/result/:id  — terminal payload; 409 while the job is still
//! in flight, so pollers can distinguish "not yet" from "gone".

use axum::extract::{Extension, Path};
use axum::Json;
use uuid::Uuid;

use crate::common::ApiError;
use crate::kernel::jobs::JobStatus;
use crate::server::app::AppState;

pub async fn job_status(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state.store.get(id).await?;
    Ok(Json(serde_json::to_value(&job).map_err(anyhow::Error::from)?))
}

pub async fn job_result(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state.store.get(id).await?;
    match job.status {
        JobStatus::Completed => {
            let result = state
                .store
                .result(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("completed job {id} has no stored result"))?;
            Ok(Json(
                serde_json::to_value(&result).map_err(anyhow::Error::from)?,
            ))
        }
        JobStatus::Failed => Ok(Json(serde_json::json!({
            "job_id": job.id,
            "status": job.status.as_str(),
            "error": job.error,
        }))),
        status => Err(ApiError::JobNotFinished {
            id,
            status: status.as_str().to_string(),
        }),
    }
}
