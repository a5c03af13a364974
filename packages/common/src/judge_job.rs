use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mq::Message;

/// Work queue entry: judge one submission.
///
/// Delivery is at-least-once; the submission lifecycle rejects repeated runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeJob {
    /// Job identifier (UUID)
    pub job_id: String,
    /// ID of the submission to judge
    pub submission_id: i32,
}

impl JudgeJob {
    /// Create a new judge job with a generated UUID.
    pub fn new(submission_id: i32) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id,
        }
    }
}

impl Message for JudgeJob {
    fn message_type() -> &'static str {
        "judge_job"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
