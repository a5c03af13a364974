//! Fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::event::SubmissionEvent;
use common::storage::SourceLayout;
use common::{Contest, LanguageConfig, LanguageTable, Problem, Submission, TestCase, User};
use tempfile::TempDir;

use crate::models::harness::{Harness, HarnessError, HarnessReport, HarnessRequest};
use crate::models::judge::Judge;
use crate::models::lifecycle::Lifecycle;
use crate::models::scoring::Scoring;
use crate::notify::Notifier;
use crate::store::{MemoryStore, SubmissionStore};

pub type Reply = Result<HarnessReport, HarnessError>;

pub fn output(payload: &str, time_ms: u64, memory_kb: u64) -> Reply {
    Ok(HarnessReport::Output {
        payload: payload.into(),
        time_ms,
        memory_kb,
    })
}

/// Harness answering from a fixed script, one reply per call.
#[derive(Default)]
pub struct ScriptedHarness {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(HarnessRequest, Duration)>>,
    delay: Option<Duration>,
    observer: Option<(Arc<dyn SubmissionStore>, i32)>,
    observed: Mutex<Vec<Submission>>,
}

impl ScriptedHarness {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Snapshot the submission from `store` at every call.
    pub fn observing(mut self, store: Arc<dyn SubmissionStore>, submission_id: i32) -> Self {
        self.observer = Some((store, submission_id));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HarnessRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn budgets(&self) -> Vec<Duration> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, budget)| *budget)
            .collect()
    }

    pub fn observed(&self) -> Vec<Submission> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Harness for ScriptedHarness {
    async fn invoke(&self, request: &HarnessRequest, budget: Duration) -> Reply {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), budget));

        if let Some((store, id)) = &self.observer {
            let snapshot = store.submission(*id).await.unwrap();
            self.observed.lock().unwrap().push(snapshot);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(HarnessReport::Unrecognized("script exhausted".into())))
    }
}

/// Notifier keeping every event it was given.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<SubmissionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<SubmissionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: SubmissionEvent) -> crate::error::Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub fn contest_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

pub fn ruby() -> LanguageConfig {
    LanguageConfig {
        name: "Ruby".into(),
        runtime: "ruby".into(),
        extension: ".rb".into(),
        entry_point: None,
    }
}

/// One user, one contest, and one problem whose expected outputs live in a
/// temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub layout: SourceLayout,
    pub languages: Arc<LanguageTable>,
}

impl Fixture {
    pub const USER_ID: i32 = 1;
    pub const CONTEST_ID: i32 = 1;
    pub const PROBLEM_ID: i32 = 1;

    pub async fn new(expected_outputs: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let problem_dir = dir.path().join("problems");
        std::fs::create_dir_all(&problem_dir).unwrap();

        let test_cases = expected_outputs
            .iter()
            .enumerate()
            .map(|(index, expected)| {
                let input = problem_dir.join(format!("{}.in", index + 1));
                let output = problem_dir.join(format!("{}.out", index + 1));
                std::fs::write(&input, format!("input {}\n", index + 1)).unwrap();
                std::fs::write(&output, expected).unwrap();
                TestCase { input, output }
            })
            .collect();

        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(User {
                id: Self::USER_ID,
                email: "alice@example.com".into(),
                is_reviewer: false,
            })
            .await;
        store
            .insert_contest(Contest {
                id: Self::CONTEST_ID,
                name: "Practice".into(),
                start_at: contest_start(),
                submittable: true,
                point_visible: true,
                result_announced: false,
            })
            .await;
        store
            .insert_problem(Problem {
                id: Self::PROBLEM_ID,
                contest_id: Self::CONTEST_ID,
                name: "A + B".into(),
                test_cases,
                time_limit: 1000,
                memory_limit: 65536,
                source_size_limit: 1024,
                point: 100,
                wrong_answer_penalty: 10,
                decay_interval: 600,
            })
            .await;

        let languages: Arc<LanguageTable> = Arc::new([("ruby".to_string(), ruby())].into_iter().collect());
        let layout = SourceLayout::new(dir.path().join("submissions"));

        Self {
            dir,
            store,
            layout,
            languages,
        }
    }

    pub async fn problem(&self) -> Problem {
        self.store.problem(Self::PROBLEM_ID).await.unwrap()
    }

    pub async fn update_problem(&self, update: impl FnOnce(&mut Problem)) {
        let mut problem = self.problem().await;
        update(&mut problem);
        self.store.insert_problem(problem).await;
    }

    /// A queued ruby submission made at the contest start.
    pub async fn submission(&self) -> Submission {
        self.store
            .create_submission(Self::USER_ID, Self::PROBLEM_ID, "ruby", contest_start())
            .await
            .unwrap()
    }

    pub fn scoring(&self) -> Scoring {
        Scoring::new(self.store.clone(), 1)
    }

    pub fn judge(&self, harness: Arc<dyn Harness>) -> Judge {
        Judge::new(
            self.store.clone(),
            harness,
            self.layout.clone(),
            self.languages.clone(),
            self.scoring(),
        )
    }

    pub fn lifecycle(&self, harness: Arc<dyn Harness>, notifier: Arc<dyn Notifier>) -> Lifecycle {
        Lifecycle::new(
            self.store.clone(),
            Arc::new(self.judge(harness)),
            notifier,
            self.languages.clone(),
        )
    }
}
