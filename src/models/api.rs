use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

/// POST /api/v1/generate request body.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    /// Natural-language description of the component to generate.
    /// The upper length bound is configurable and enforced by the handler.
    #[garde(length(chars, min = 1))]
    pub prompt: String,
}

/// POST /api/v1/generate response.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    /// Submissions left in the current rate-limit window for this client.
    pub rate_limit_remaining: usize,
}

/// GET /api/v1/jobs/{job_id} response.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub prompt: String,
    pub generated_code: Option<String>,
    pub explanation: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            prompt: job.prompt,
            generated_code: job.generated_code,
            explanation: job.explanation,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// One entry in the GET /api/v1/history listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub job_id: Uuid,
    pub prompt: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for HistoryItem {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            prompt: job.prompt.clone(),
            status: job.status,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryItem>,
}
