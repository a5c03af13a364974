use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Contest, Problem, Submission};
use tracing::{info, instrument};

use crate::error::Result;
use crate::store::SubmissionStore;

/// Number of decay steps elapsed between the contest start and the
/// submission, rounded half away from zero.
///
/// Submissions made at or before the start, and problems without a decay
/// interval, are not penalized.
pub fn decay_steps(created_at: DateTime<Utc>, start_at: DateTime<Utc>, interval_secs: u64) -> i64 {
    let elapsed_ms = (created_at - start_at).num_milliseconds();
    if interval_secs == 0 || elapsed_ms <= 0 {
        return 0;
    }
    let interval_ms = i64::try_from(interval_secs)
        .unwrap_or(i64::MAX / 2000)
        .saturating_mul(1000);
    // round(elapsed / interval) for positive operands
    elapsed_ms
        .saturating_mul(2)
        .saturating_add(interval_ms)
        / interval_ms.saturating_mul(2)
}

/// Points credited for an accepted submission, never negative.
pub fn award_for(
    problem: &Problem,
    contest: &Contest,
    submission: &Submission,
    wrong_count: usize,
    decay_point_per_step: i64,
) -> i64 {
    let wrong_count = i64::try_from(wrong_count).unwrap_or(i64::MAX);
    let wrong_penalty = wrong_count.saturating_mul(problem.wrong_answer_penalty);
    let decay_penalty = decay_steps(submission.created_at, contest.start_at, problem.decay_interval)
        .saturating_mul(decay_point_per_step);

    problem
        .point
        .saturating_sub(wrong_penalty)
        .saturating_sub(decay_penalty)
        .max(0)
}

/// Credits contest points on a user's first acceptance of a problem.
#[derive(Clone)]
pub struct Scoring {
    store: Arc<dyn SubmissionStore>,
    decay_point_per_step: i64,
}

impl Scoring {
    pub fn new(store: Arc<dyn SubmissionStore>, decay_point_per_step: i64) -> Self {
        Self {
            store,
            decay_point_per_step,
        }
    }

    /// Compute and record the award for `submission`.
    ///
    /// Returns `None` if the (user, problem) pair was already credited, in
    /// which case neither the submission nor the aggregate is touched.
    #[instrument(skip_all, fields(submission_id = submission.id, user_id = submission.user_id))]
    pub async fn award(&self, submission: &Submission) -> Result<Option<i64>> {
        let problem = self.store.problem(submission.problem_id).await?;
        let contest = self.store.contest(problem.contest_id).await?;
        let wrong_count = self
            .store
            .count_finished_unaccepted(submission.user_id, submission.problem_id)
            .await?;

        let point = award_for(
            &problem,
            &contest,
            submission,
            wrong_count,
            self.decay_point_per_step,
        );

        let credited = self
            .store
            .add_user_point(submission.user_id, contest.id, problem.id, point)
            .await?;
        if !credited {
            info!(problem_id = problem.id, "Problem already credited, skipping award");
            return Ok(None);
        }

        self.store.set_received_point(submission.id, point).await?;
        info!(point, wrong_count, "Points awarded");
        Ok(Some(point))
    }
}
