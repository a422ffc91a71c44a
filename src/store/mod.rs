use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("invalid transition {from:?} -> {to:?} for job {job_id}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Authoritative in-memory job store.
///
/// All mutations go through methods that enforce the forward-only lifecycle
/// `pending -> running -> {success, failed}` and keep result fields mutually
/// exclusive: a terminal job carries either code+explanation or an error
/// message, never both. The write lock makes a read following a completed
/// write observe that write.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new pending job for `prompt` and return it.
    pub async fn create(&self, prompt: String) -> Job {
        let job = Job::new(prompt);
        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    /// Fetch the current record for a job.
    pub async fn get(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Transition a pending job to running.
    pub async fn mark_running(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.transition(job_id, JobStatus::Running, |job| {
            job.running_since = Some(Utc::now());
        })
        .await
    }

    /// Transition a running job to success with its generated output.
    pub async fn complete(
        &self,
        job_id: Uuid,
        generated_code: String,
        explanation: String,
    ) -> Result<(), StoreError> {
        self.transition(job_id, JobStatus::Success, |job| {
            job.generated_code = Some(generated_code);
            job.explanation = Some(explanation);
        })
        .await
    }

    /// Transition a running job to failed with a human-readable message.
    pub async fn fail(&self, job_id: Uuid, error_message: String) -> Result<(), StoreError> {
        self.transition(job_id, JobStatus::Failed, |job| {
            job.error_message = Some(error_message);
        })
        .await
    }

    /// Most recent jobs, newest first.
    pub async fn history(&self, limit: usize) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<&Job> = jobs.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.into_iter().take(limit).cloned().collect()
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn transition(
        &self,
        job_id: Uuid,
        to: JobStatus,
        apply: impl FnOnce(&mut Job),
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;

        let allowed = matches!(
            (job.status, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Success)
                | (JobStatus::Running, JobStatus::Failed)
        );
        if !allowed {
            return Err(StoreError::InvalidTransition {
                job_id,
                from: job.status,
                to,
            });
        }

        job.status = to;
        job.updated_at = Utc::now();
        apply(job);
        Ok(())
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
