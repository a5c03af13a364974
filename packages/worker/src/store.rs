//! Persistence seam of the judging core.
//!
//! Record storage belongs to an external collaborator; the core only needs
//! the operations below. Each operation is atomic with respect to the others,
//! which is what makes the lifecycle guard safe under duplicate delivery.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Contest, LifecycleEvent, Problem, Submission, SubmissionState, TransitionError, User,
    UserScore, Verdict,
};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::judge::Judgement;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i32 },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    Internal(String),
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new `Queued` submission and assign its id.
    async fn create_submission(
        &self,
        user_id: i32,
        problem_id: i32,
        language: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Submission, StoreError>;

    async fn submission(&self, id: i32) -> Result<Submission, StoreError>;
    /// Drop a submission record, e.g. when its admission could not complete.
    async fn delete_submission(&self, id: i32) -> Result<(), StoreError>;
    async fn problem(&self, id: i32) -> Result<Problem, StoreError>;
    async fn contest(&self, id: i32) -> Result<Contest, StoreError>;
    async fn user(&self, id: i32) -> Result<User, StoreError>;
    async fn user_score(&self, user_id: i32, contest_id: i32)
    -> Result<Option<UserScore>, StoreError>;

    /// Fire `event` on the submission if its current state allows it.
    async fn transition(&self, id: i32, event: LifecycleEvent) -> Result<Submission, StoreError>;

    async fn record_progress(&self, id: i32, last_passed_test_case: usize)
    -> Result<(), StoreError>;
    async fn record_failed_output(&self, id: i32, output: &str) -> Result<(), StoreError>;

    /// Record the verdict and resource maxima and move `Running -> Finished`
    /// in one step.
    async fn finish(&self, id: i32, judgement: &Judgement) -> Result<Submission, StoreError>;

    /// Whether the user already has an Accepted submission for the problem,
    /// other than `excluding`.
    async fn has_accepted(
        &self,
        user_id: i32,
        problem_id: i32,
        excluding: i32,
    ) -> Result<bool, StoreError>;

    async fn count_finished_unaccepted(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> Result<usize, StoreError>;

    async fn set_received_point(&self, id: i32, point: i64) -> Result<(), StoreError>;

    /// Merge an award into the (user, contest) aggregate, creating it on
    /// first use. Returns `false` if the problem was already credited.
    async fn add_user_point(
        &self,
        user_id: i32,
        contest_id: i32,
        problem_id: i32,
        point: i64,
    ) -> Result<bool, StoreError>;
}

#[derive(Default)]
struct Tables {
    submissions: BTreeMap<i32, Submission>,
    problems: HashMap<i32, Problem>,
    contests: HashMap<i32, Contest>,
    users: HashMap<i32, User>,
    scores: HashMap<(i32, i32), UserScore>,
    next_submission_id: i32,
}

impl Tables {
    fn submission_mut(&mut self, id: i32) -> Result<&mut Submission, StoreError> {
        self.submissions.get_mut(&id).ok_or(StoreError::NotFound {
            kind: "Submission",
            id,
        })
    }
}

/// In-memory store used by the local judge binary and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_problem(&self, problem: Problem) {
        self.tables
            .write()
            .await
            .problems
            .insert(problem.id, problem);
    }

    pub async fn insert_contest(&self, contest: Contest) {
        self.tables
            .write()
            .await
            .contests
            .insert(contest.id, contest);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    /// All submissions, oldest first.
    pub async fn submissions(&self) -> Vec<Submission> {
        self.tables
            .read()
            .await
            .submissions
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(
        &self,
        user_id: i32,
        problem_id: i32,
        language: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_submission_id += 1;
        let submission = Submission::queued(
            tables.next_submission_id,
            user_id,
            problem_id,
            language,
            created_at,
        );
        tables
            .submissions
            .insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn submission(&self, id: i32) -> Result<Submission, StoreError> {
        self.tables
            .read()
            .await
            .submissions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: "Submission",
                id,
            })
    }

    async fn delete_submission(&self, id: i32) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .submissions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                kind: "Submission",
                id,
            })
    }

    async fn problem(&self, id: i32) -> Result<Problem, StoreError> {
        self.tables
            .read()
            .await
            .problems
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "Problem", id })
    }

    async fn contest(&self, id: i32) -> Result<Contest, StoreError> {
        self.tables
            .read()
            .await
            .contests
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "Contest", id })
    }

    async fn user(&self, id: i32) -> Result<User, StoreError> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "User", id })
    }

    async fn user_score(
        &self,
        user_id: i32,
        contest_id: i32,
    ) -> Result<Option<UserScore>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .get(&(user_id, contest_id))
            .cloned())
    }

    async fn transition(&self, id: i32, event: LifecycleEvent) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.state = submission.state.apply(event)?;
        Ok(submission.clone())
    }

    async fn record_progress(
        &self,
        id: i32,
        last_passed_test_case: usize,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.last_passed_test_case = last_passed_test_case;
        Ok(())
    }

    async fn record_failed_output(&self, id: i32, output: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.failed_test_case_output = Some(output.to_string());
        Ok(())
    }

    async fn finish(&self, id: i32, judgement: &Judgement) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.state = submission.state.apply(LifecycleEvent::Finish)?;
        submission.verdict = Some(judgement.verdict);
        submission.used_time = judgement.used_time;
        submission.used_memory = judgement.used_memory;
        Ok(submission.clone())
    }

    async fn has_accepted(
        &self,
        user_id: i32,
        problem_id: i32,
        excluding: i32,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.submissions.values().any(|s| {
            s.id != excluding
                && s.user_id == user_id
                && s.problem_id == problem_id
                && s.verdict == Some(Verdict::Accepted)
        }))
    }

    async fn count_finished_unaccepted(
        &self,
        user_id: i32,
        problem_id: i32,
    ) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .submissions
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.problem_id == problem_id
                    && s.state == SubmissionState::Finished
                    && !s.is_accepted()
            })
            .count())
    }

    async fn set_received_point(&self, id: i32, point: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables.submission_mut(id)?;
        submission.received_point = Some(point);
        Ok(())
    }

    async fn add_user_point(
        &self,
        user_id: i32,
        contest_id: i32,
        problem_id: i32,
        point: i64,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .scores
            .entry((user_id, contest_id))
            .or_insert_with(|| UserScore::new(user_id, contest_id))
            .add_point(problem_id, point))
    }
}
