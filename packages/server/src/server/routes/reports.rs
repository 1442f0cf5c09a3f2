//! Report artifact download.
//!
//! GET /api/reports/:filename
//!
//! Serves the plain-text report written at job completion. Filenames are
//! constrained to the `job_{uuid}.txt` shape, which also rules out path
//! traversal.

use axum::extract::{Extension, Path};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::common::ApiError;
use crate::server::app::AppState;

fn valid_report_filename(filename: &str) -> bool {
    let Some(stem) = filename
        .strip_prefix("job_")
        .and_then(|rest| rest.strip_suffix(".txt"))
    else {
        return false;
    };
    uuid::Uuid::parse_str(stem).is_ok()
}

pub async fn download_report(
    Extension(state): Extension<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_report_filename(&filename) {
        return Err(ApiError::ReportNotFound(filename));
    }

    let path = state.reports_dir.join(&filename);
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::ReportNotFound(filename))
        }
        Err(e) => Err(ApiError::Internal(anyhow::Error::from(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_validation_rejects_traversal_and_junk() {
        assert!(valid_report_filename(
            "job_8c7a2f1e-4d17-4d2c-9c0e-0a1b2c3d4e5f.txt"
        ));
        assert!(!valid_report_filename("../etc/passwd"));
        assert!(!valid_report_filename("job_..%2F..%2Fsecrets.txt"));
        assert!(!valid_report_filename("job_not-a-uuid.txt"));
        assert!(!valid_report_filename("report.txt"));
    }
}
