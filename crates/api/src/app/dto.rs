use serde::{Deserialize, Serialize};

use contentforge_content::QualityAction;
use contentforge_core::JobId;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /quality`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRequest {
    pub job_id: String,
    pub action: QualityAction,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Body of `POST /jobs/:id/quality`.
#[derive(Debug, Deserialize)]
pub struct JobQualityRequest {
    pub action: QualityAction,
    #[serde(default)]
    pub feedback: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedResponse {
    pub job_id: JobId,
}
