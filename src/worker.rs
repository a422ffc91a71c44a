use std::time::Duration;

use tokio::time::sleep;

use crate::app_state::AppState;
use crate::services::llm::LlmError;
use crate::store::StoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Background worker loop: drains the job queue and drives each job from
/// `pending` through `running` to a terminal state. Retries against the
/// upstream happen inside the LLM client; by the time an error reaches this
/// loop it is terminal for the job.
pub async fn run(state: AppState, worker_id: usize) {
    tracing::info!(worker_id, "worker started");
    loop {
        match process_next_job(&state).await {
            Ok(true) => {
                // Drain eagerly while work is available.
            }
            Ok(false) => {
                sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                tracing::error!(worker_id, error = %e, "error processing job");
                sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Process the next queued job, if any.
/// Returns Ok(true) if a job was processed, Ok(false) if the queue was empty.
pub async fn process_next_job(state: &AppState) -> Result<bool, StoreError> {
    let Some(job_id) = state.queue.dequeue() else {
        return Ok(false);
    };

    state.store.mark_running(job_id).await?;
    let job = state
        .store
        .get(job_id)
        .await
        .ok_or(StoreError::NotFound(job_id))?;

    tracing::info!(job_id = %job_id, "processing generation job");
    let start = std::time::Instant::now();

    match state.llm.generate(&job.prompt).await {
        Ok(generated) => {
            state
                .store
                .complete(job_id, generated.code, generated.explanation)
                .await?;

            metrics::counter!("generation_jobs_completed").increment(1);
            metrics::histogram!("generation_processing_seconds")
                .record(start.elapsed().as_secs_f64());
            tracing::info!(
                job_id = %job_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "job completed"
            );
        }
        Err(err) => {
            state.store.fail(job_id, terminal_message(&err)).await?;

            metrics::counter!("generation_jobs_failed").increment(1);
            tracing::warn!(
                job_id = %job_id,
                error = %err,
                "job failed"
            );
        }
    }

    Ok(true)
}

/// Human-readable terminal failure message per error kind.
fn terminal_message(err: &LlmError) -> String {
    match err {
        LlmError::CircuitOpen => {
            "Generation service is temporarily unavailable. Please try again later.".to_string()
        }
        LlmError::Timeout(budget) => {
            format!(
                "Generation timed out after {}s. Please try again.",
                budget.as_secs()
            )
        }
        LlmError::Upstream(reason) => format!("Failed to generate component: {reason}"),
    }
}
