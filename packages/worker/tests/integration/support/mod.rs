use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::event::SubmissionEvent;
use common::storage::SourceLayout;
use common::{
    Contest, LanguageConfig, LanguageTable, Problem, SubmissionState, TestCase, User,
};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use worker::{
    Admission, AdmissionError, BroadcastNotifier, Judge, Lifecycle, MemoryStore, ProcessHarness,
    Scoring, SubmissionRequest, SubmissionStore, WorkerPool,
};

pub const ALICE: i32 = 1;
pub const BOB: i32 = 2;
pub const CONTEST: i32 = 1;

/// Harness stand-in: prints the contents of the input file as its output
/// line, after checking that the source was stored. An input of `SLEEP`
/// never answers in time. Every call is logged to `calls.log`.
const HARNESS: &str = r#"#!/bin/sh
echo "$1" >> "$(dirname "$0")/calls.log"
[ -f "$1" ] || { echo '[ERROR][COMPILE]'; exit 0; }
line=$(cat "$3")
if [ "$line" = "SLEEP" ]; then
    sleep 5
fi
printf '%s\n' "$line"
"#;

pub fn contest_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

/// The full judging pipeline over an in-memory store, an in-process queue
/// and a shell harness.
pub struct TestApp {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub layout: SourceLayout,
    admission: Admission,
    notifier: BroadcastNotifier,
    pool: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.pool.abort();
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_concurrency(2).await
    }

    pub async fn spawn_with_concurrency(concurrency: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let harness_bin = dir.path().join("run_code.sh");
        std::fs::write(&harness_bin, HARNESS).unwrap();
        std::fs::set_permissions(&harness_bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = Arc::new(MemoryStore::new());
        for (id, email) in [(ALICE, "alice@example.com"), (BOB, "bob@example.com")] {
            store
                .insert_user(User {
                    id,
                    email: email.into(),
                    is_reviewer: false,
                })
                .await;
        }
        store
            .insert_contest(Contest {
                id: CONTEST,
                name: "Practice".into(),
                start_at: contest_start(),
                submittable: true,
                point_visible: true,
                result_announced: false,
            })
            .await;

        let languages: LanguageTable = [
            (
                "ruby".to_string(),
                LanguageConfig {
                    name: "Ruby".into(),
                    runtime: "ruby".into(),
                    extension: ".rb".into(),
                    entry_point: None,
                },
            ),
            (
                "java".to_string(),
                LanguageConfig {
                    name: "Java".into(),
                    runtime: "java".into(),
                    extension: ".java".into(),
                    entry_point: Some("Main".into()),
                },
            ),
        ]
        .into_iter()
        .collect();
        let languages = Arc::new(languages);

        let layout = SourceLayout::new(dir.path().join("submissions"));
        let notifier = BroadcastNotifier::new(64);

        let judge = Judge::new(
            store.clone(),
            Arc::new(ProcessHarness::new(&harness_bin)),
            layout.clone(),
            languages.clone(),
            Scoring::new(store.clone(), 1),
        );
        let lifecycle = Arc::new(Lifecycle::new(
            store.clone(),
            Arc::new(judge),
            Arc::new(notifier.clone()),
            languages.clone(),
        ));

        let (queue, receiver) = mq::channel();
        let pool = WorkerPool::new(lifecycle, concurrency);
        let pool = tokio::spawn(async move { pool.run(receiver).await });

        let admission = Admission::new(
            store.clone(),
            layout.clone(),
            languages,
            Arc::new(queue),
            Arc::new(notifier.clone()),
        );

        Self {
            dir,
            store,
            layout,
            admission,
            notifier,
            pool,
        }
    }

    /// Add a problem whose test cases are (harness output line, expected
    /// output) pairs.
    pub async fn add_problem(&self, id: i32, cases: &[(&str, &str)]) -> Problem {
        let problem_dir = self.dir.path().join("problems").join(id.to_string());
        std::fs::create_dir_all(&problem_dir).unwrap();

        let test_cases = cases
            .iter()
            .enumerate()
            .map(|(index, (line, expected))| {
                let input = problem_dir.join(format!("{}.in", index + 1));
                let output = problem_dir.join(format!("{}.out", index + 1));
                std::fs::write(&input, line).unwrap();
                std::fs::write(&output, expected).unwrap();
                TestCase { input, output }
            })
            .collect();

        let problem = Problem {
            id,
            contest_id: CONTEST,
            name: format!("Problem {id}"),
            test_cases,
            time_limit: 2000,
            memory_limit: 65536,
            source_size_limit: 64,
            point: 100,
            wrong_answer_penalty: 10,
            decay_interval: 600,
        };
        self.store.insert_problem(problem.clone()).await;
        problem
    }

    pub async fn update_problem(&self, id: i32, update: impl FnOnce(&mut Problem)) {
        let mut problem = self.store.problem(id).await.unwrap();
        update(&mut problem);
        self.store.insert_problem(problem).await;
    }

    pub async fn close_contest(&self) {
        let mut contest = self.store.contest(CONTEST).await.unwrap();
        contest.submittable = false;
        self.store.insert_contest(contest).await;
    }

    pub fn request(user: i32, problem: i32, language: &str, source: &[u8]) -> SubmissionRequest {
        SubmissionRequest {
            user_id: Some(user),
            problem_id: Some(problem),
            language: Some(language.into()),
            source: Some(source.to_vec()),
        }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<i32, AdmissionError> {
        self.submit_at(request, contest_start()).await
    }

    pub async fn submit_at(
        &self,
        request: SubmissionRequest,
        created_at: DateTime<Utc>,
    ) -> Result<i32, AdmissionError> {
        Ok(self.admission.submit_at(request, created_at).await?.id)
    }

    /// Submit and wait for the finished event.
    pub async fn judge(&self, user: i32, problem: i32) -> SubmissionEvent {
        self.judge_at(user, problem, contest_start()).await
    }

    pub async fn judge_at(
        &self,
        user: i32,
        problem: i32,
        created_at: DateTime<Utc>,
    ) -> SubmissionEvent {
        let mut events = self.notifier.subscribe();
        let id = self
            .submit_at(Self::request(user, problem, "ruby", b"puts gets"), created_at)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = events.recv().await.unwrap();
                if event.id == id && event.state == SubmissionState::Finished {
                    return event;
                }
            }
        })
        .await
        .expect("submission did not finish in time")
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SubmissionEvent> {
        self.notifier.subscribe()
    }

    /// Number of harness invocations so far.
    pub fn harness_calls(&self) -> usize {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    pub fn submissions_root(&self) -> PathBuf {
        self.layout.root().to_path_buf()
    }
}
