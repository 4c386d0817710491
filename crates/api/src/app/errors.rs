use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use contentforge_infra::{StoreError, WorkflowError};

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        WorkflowError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        WorkflowError::InvalidTransition(e) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", e.to_string())
        }
        WorkflowError::Storage(e @ StoreError::Unavailable(_)) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string())
        }
        WorkflowError::Storage(e @ StoreError::Serialization(_)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
