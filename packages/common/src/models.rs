use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SubmissionState, Verdict};

/// One grading attempt of a user against a problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    /// Language tag, a key of the configured language table.
    pub language: String,
    pub state: SubmissionState,
    /// Set if and only if `state` is `Finished`.
    pub verdict: Option<Verdict>,
    /// Length of the passed prefix of the problem's test cases.
    pub last_passed_test_case: usize,
    /// Program output of the first mismatching test case (Wrong Answer only).
    pub failed_test_case_output: Option<String>,
    /// Maximum time over completed test cases (milliseconds).
    pub used_time: u64,
    /// Maximum memory over completed test cases (kilobytes).
    pub used_memory: u64,
    pub received_point: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// A freshly admitted submission.
    pub fn queued(
        id: i32,
        user_id: i32,
        problem_id: i32,
        language: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            problem_id,
            language: language.into(),
            state: SubmissionState::Queued,
            verdict: None,
            last_passed_test_case: 0,
            failed_test_case_output: None,
            used_time: 0,
            used_memory: 0,
            received_point: None,
            created_at,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict.is_some_and(|v| v.is_accepted())
    }

    /// Whether `viewer` may see the judging details of this submission.
    ///
    /// Reviewers always may; the owner may once the contest announces results.
    pub fn result_announced(&self, viewer: &User, contest: &Contest) -> bool {
        viewer.is_reviewer || (contest.result_announced && viewer.id == self.user_id)
    }

    /// The mismatching output of a Wrong Answer, if `viewer` may see it.
    pub fn visible_failed_output(&self, viewer: &User, contest: &Contest) -> Option<&str> {
        if self.result_announced(viewer, contest) {
            self.failed_test_case_output.as_deref()
        } else {
            None
        }
    }

    /// The first test case this submission did not pass.
    pub fn failed_test_case<'a>(&self, problem: &'a Problem) -> Option<&'a TestCase> {
        if self.is_accepted() {
            return None;
        }
        problem.test_cases.get(self.last_passed_test_case)
    }
}

/// An (input, expected output) artifact pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Grading configuration of a problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i32,
    pub contest_id: i32,
    pub name: String,
    /// Evaluated in this order.
    pub test_cases: Vec<TestCase>,
    /// Per test case time limit (milliseconds).
    pub time_limit: u64,
    /// Memory limit (kilobytes).
    pub memory_limit: u64,
    /// Maximum accepted source size (bytes).
    pub source_size_limit: u64,
    /// Base point value.
    pub point: i64,
    /// Deducted once per finished, non-accepted earlier submission.
    pub wrong_answer_penalty: i64,
    /// Seconds of contest time per slow-submission penalty step.
    pub decay_interval: u64,
}

impl Problem {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_limit)
    }
}

/// Grading window and visibility policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    pub id: i32,
    pub name: String,
    pub start_at: DateTime<Utc>,
    /// Whether submissions are currently accepted.
    pub submittable: bool,
    pub point_visible: bool,
    pub result_announced: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(default)]
    pub is_reviewer: bool,
}

/// A user's credited points within one contest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScore {
    pub user_id: i32,
    pub contest_id: i32,
    /// Credited award per problem.
    awards: BTreeMap<i32, i64>,
}

impl UserScore {
    pub fn new(user_id: i32, contest_id: i32) -> Self {
        Self {
            user_id,
            contest_id,
            awards: BTreeMap::new(),
        }
    }

    /// Credit `point` for `problem_id`. Only the first award per problem
    /// counts; returns whether this call changed the aggregate.
    pub fn add_point(&mut self, problem_id: i32, point: i64) -> bool {
        if self.awards.contains_key(&problem_id) {
            return false;
        }
        self.awards.insert(problem_id, point);
        true
    }

    pub fn award(&self, problem_id: i32) -> Option<i64> {
        self.awards.get(&problem_id).copied()
    }

    /// Total credited points, derived from the per-problem awards.
    pub fn point(&self) -> i64 {
        self.awards.values().sum()
    }
}
