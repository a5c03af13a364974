use std::sync::Arc;

use common::judge_job::JudgeJob;
use common::{SubmissionState, TransitionError, Verdict};
use worker::handlers::judge::handle_judge_job;
use worker::{
    BroadcastNotifier, Judge, Lifecycle, ProcessHarness, Scoring, SubmissionStore, WorkerError,
};

use crate::support::{ALICE, TestApp, contest_start};

fn lifecycle(app: &TestApp) -> Lifecycle {
    let languages = Arc::new(
        [(
            "ruby".to_string(),
            common::LanguageConfig {
                name: "Ruby".into(),
                runtime: "ruby".into(),
                extension: ".rb".into(),
                entry_point: None,
            },
        )]
        .into_iter()
        .collect::<common::LanguageTable>(),
    );
    let judge = Judge::new(
        app.store.clone(),
        Arc::new(ProcessHarness::new(app.dir.path().join("run_code.sh"))),
        app.layout.clone(),
        languages.clone(),
        Scoring::new(app.store.clone(), 1),
    );
    Lifecycle::new(
        app.store.clone(),
        Arc::new(judge),
        Arc::new(BroadcastNotifier::new(4)),
        languages,
    )
}

#[tokio::test]
async fn duplicate_delivery_runs_once() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;
    let event = app.judge(ALICE, 1).await;
    assert_eq!(app.harness_calls(), 1);

    let lifecycle = lifecycle(&app);
    let redelivered = handle_judge_job(&lifecycle, JudgeJob::new(event.id))
        .await
        .unwrap();

    assert!(redelivered.is_none());
    assert_eq!(app.harness_calls(), 1);
}

#[tokio::test]
async fn concurrent_runs_of_one_submission_execute_once() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;
    // Created directly in the store so the pool never sees it.
    let submission = app
        .store
        .create_submission(ALICE, 1, "ruby", contest_start())
        .await
        .unwrap();
    app.layout
        .store(
            &submission,
            &common::LanguageConfig {
                name: "Ruby".into(),
                runtime: "ruby".into(),
                extension: ".rb".into(),
                entry_point: None,
            },
            64,
            b"puts 1",
        )
        .await
        .unwrap();

    let lifecycle = Arc::new(lifecycle(&app));
    let first = tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move { lifecycle.run(submission.id).await }
    });
    let second = tokio::spawn({
        let lifecycle = lifecycle.clone();
        async move { lifecycle.run(submission.id).await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let finished: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].verdict, Some(Verdict::Accepted));
    assert!(results.iter().any(|r| matches!(
        r,
        Err(WorkerError::Transition(TransitionError {
            from: SubmissionState::Running | SubmissionState::Finished,
            ..
        }))
    )));
    assert_eq!(app.harness_calls(), 1);
}
