//! Job submission.
//!
//! POST /api/query
//!
//! Validation happens synchronously; the job itself runs on a detached task
//! so the response returns as soon as the job record exists.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::ApiError;
use crate::server::app::AppState;

const MIN_QUERY_LEN: usize = 10;
const MAX_QUERY_LEN: usize = 500;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn submit_query(
    Extension(state): Extension<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<(StatusCode, Json<QueryResponse>), ApiError> {
    let query = request.query.trim();
    if query.len() < MIN_QUERY_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "query must be at least {MIN_QUERY_LEN} characters"
        )));
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "query must be at most {MAX_QUERY_LEN} characters"
        )));
    }

    let job = state.store.create(query).await?;
    tracing::info!(job_id = %job.id, "job accepted");

    let orchestrator = state.orchestrator.clone();
    let job_id = job.id;
    tokio::spawn(async move {
        orchestrator.run(job_id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(QueryResponse {
            job_id: job.id,
            status: job.status.as_str().to_string(),
            message: "Analysis started. Poll /api/status/{job_id} or subscribe to \
                      /api/streams/jobs/{job_id} for progress."
                .to_string(),
            created_at: job.created_at,
        }),
    ))
}
