use common::SubmissionState;
use common::storage::StorageError;
use worker::{AdmissionError, SubmissionStore};

use crate::support::{ALICE, TestApp};

#[tokio::test]
async fn source_is_stored_under_user_problem_submission() {
    let app = TestApp::spawn().await;
    app.add_problem(5, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;

    let mut events = app.subscribe();
    let id = app
        .submit(TestApp::request(ALICE, 5, "java", b"class Main {}"))
        .await
        .unwrap();

    let path = app
        .submissions_root()
        .join(ALICE.to_string())
        .join("5")
        .join(id.to_string())
        .join("Main.java");
    assert_eq!(std::fs::read(&path).unwrap(), b"class Main {}");

    let created = events.recv().await.unwrap();
    assert_eq!(created.id, id);
    assert_eq!(created.state, SubmissionState::Queued);
    assert_eq!(created.lang, "Java");
}

#[tokio::test]
async fn oversized_source_is_rejected_without_artifacts() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;

    let result = app
        .submit(TestApp::request(ALICE, 1, "ruby", &[b'#'; 65]))
        .await;

    assert!(matches!(
        result,
        Err(AdmissionError::Storage(StorageError::SourceTooLarge { .. }))
    ));
    assert!(!app.submissions_root().exists());
    assert!(app.store.submissions().await.is_empty());
    assert_eq!(app.harness_calls(), 0);
}

#[tokio::test]
async fn closed_contest_rejects_submissions() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;
    app.close_contest().await;

    let result = app.submit(TestApp::request(ALICE, 1, "ruby", b"puts 1")).await;

    let err = result.unwrap_err();
    assert!(matches!(err, AdmissionError::ContestClosed));
    assert_eq!(err.to_string(), "Contest ended");
    assert!(app.store.submissions().await.is_empty());
}

#[tokio::test]
async fn admitted_submission_is_eventually_judged() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[("1[TIME:1ms][MEMORY:1KB]", "1\n")]).await;

    let event = app.judge(ALICE, 1).await;
    let stored = app.store.submission(event.id).await.unwrap();

    assert_eq!(stored.state, SubmissionState::Finished);
    assert_eq!(stored.verdict, event.verdict);
}
