use common::judge_job::JudgeJob;
use common::{LifecycleEvent, Submission, TransitionError};
use tracing::{info, instrument};

use crate::error::{Result, WorkerError};
use crate::models::lifecycle::Lifecycle;

/// Handle one delivery of a judge job.
///
/// Returns `None` when the submission already left Queued, which is how a
/// redelivered job shows up. A refused `finish` is not a redelivery and is
/// returned as an error.
#[instrument(skip(lifecycle), fields(submission_id = job.submission_id, job_id = %job.job_id))]
pub async fn handle_judge_job(lifecycle: &Lifecycle, job: JudgeJob) -> Result<Option<Submission>> {
    match lifecycle.run(job.submission_id).await {
        Ok(submission) => Ok(Some(submission)),
        Err(WorkerError::Transition(
            e @ TransitionError {
                event: LifecycleEvent::Run,
                ..
            },
        )) => {
            info!(reason = %e, "Duplicate delivery, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
