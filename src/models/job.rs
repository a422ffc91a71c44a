use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a generation job in the async queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }
}

/// A UI generation job. The store holds the authoritative copy; everything
/// else references jobs by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub prompt: String,
    pub status: JobStatus,
    pub generated_code: Option<String>,
    pub explanation: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the job enters `running`, so an external reaper can detect
    /// jobs stranded by a crashed worker.
    pub running_since: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(prompt: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prompt,
            status: JobStatus::Pending,
            generated_code: None,
            explanation: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            running_since: None,
        }
    }
}
