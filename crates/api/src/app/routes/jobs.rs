use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use contentforge_content::{ContentRequest, QualityAction};
use contentforge_core::JobId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// `POST /jobs`: validate, enqueue, and answer before the pipeline runs.
pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text());
        }
    };

    match services.manager.create_job(request).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(dto::JobCreatedResponse { job_id: job.id }),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    // An id that cannot exist is reported like any unknown id.
    let Ok(job_id) = id.parse::<JobId>() else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"));
    };

    match services.manager.get_job(job_id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// `POST /quality` with `{jobId, action, feedback?}`.
pub async fn quality(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::QualityRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text());
        }
    };

    apply_quality(&services, &body.job_id, body.action, body.feedback).await
}

/// `POST /jobs/:id/quality` with `{action, feedback?}`.
pub async fn quality_for_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::JobQualityRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text());
        }
    };

    apply_quality(&services, &id, body.action, body.feedback).await
}

async fn apply_quality(
    services: &AppServices,
    id: &str,
    action: QualityAction,
    feedback: Option<String>,
) -> axum::response::Response {
    let Ok(job_id) = id.parse::<JobId>() else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"));
    };

    match services.gate.apply(job_id, action, feedback).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
