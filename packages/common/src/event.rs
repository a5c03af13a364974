use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Problem, Submission, User};
use crate::mq::Message;
use crate::{DisplayClass, SubmissionState, Verdict};

/// Format of `created_at` in events.
pub const CREATED_AT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Snapshot of a submission pushed to real-time subscribers on creation and
/// when judging finishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub event_id: String,
    pub id: i32,
    pub state: SubmissionState,
    #[serde(rename = "result_status")]
    pub verdict: Option<Verdict>,
    pub last_passed_test_case: usize,
    pub used_time: u64,
    pub used_memory: u64,
    pub received_point: Option<i64>,
    /// Human-readable creation time.
    pub created_at: String,
    /// Contact of the submitting user.
    pub email: String,
    /// Language display name.
    pub lang: String,
    pub contest: i32,
    pub problem: i32,
    /// Problem display name.
    pub name: String,
    pub css_class: DisplayClass,
    /// The user's aggregate points in the contest, if any were credited.
    pub user_score: Option<i64>,
}

impl SubmissionEvent {
    pub fn snapshot(
        submission: &Submission,
        user: &User,
        problem: &Problem,
        language_name: &str,
        user_score: Option<i64>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            id: submission.id,
            state: submission.state,
            verdict: submission.verdict,
            last_passed_test_case: submission.last_passed_test_case,
            used_time: submission.used_time,
            used_memory: submission.used_memory,
            received_point: submission.received_point,
            created_at: submission
                .created_at
                .format(CREATED_AT_FORMAT)
                .to_string(),
            email: user.email.clone(),
            lang: language_name.to_string(),
            contest: problem.contest_id,
            problem: problem.id,
            name: problem.name.clone(),
            css_class: DisplayClass::of(submission.state, submission.verdict),
            user_score,
        }
    }

    /// Event topic on the submissions channel.
    pub fn topic(&self) -> &'static str {
        "create"
    }
}

impl Message for SubmissionEvent {
    fn message_type() -> &'static str {
        "submission_event"
    }

    fn message_id(&self) -> &str {
        &self.event_id
    }
}
