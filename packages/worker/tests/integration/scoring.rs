use chrono::Duration;
use common::Verdict;
use worker::SubmissionStore;

use crate::support::{ALICE, BOB, CONTEST, TestApp, contest_start};

const PASSING: (&str, &str) = ("1[TIME:1ms][MEMORY:1KB]", "1\n");
const FAILING: (&str, &str) = ("2[TIME:1ms][MEMORY:1KB]", "1\n");

#[tokio::test]
async fn only_first_acceptance_is_credited() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[PASSING]).await;

    let first = app.judge(ALICE, 1).await;
    let second = app.judge(ALICE, 1).await;

    assert_eq!(first.received_point, Some(100));
    assert_eq!(first.user_score, Some(100));
    assert_eq!(second.verdict, Some(Verdict::Accepted));
    assert_eq!(second.received_point, None);
    assert_eq!(second.user_score, Some(100));
}

#[tokio::test]
async fn wrong_answers_and_slow_submissions_cost_points() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[FAILING]).await;

    for _ in 0..2 {
        let event = app.judge(ALICE, 1).await;
        assert_eq!(event.verdict, Some(Verdict::WrongAnswer));
        assert_eq!(event.received_point, None);
    }

    // Fix the expected output so the next attempt passes.
    let problem = app.store.problem(1).await.unwrap();
    std::fs::write(&problem.test_cases[0].output, "2\n").unwrap();

    // 25 minutes in: round(1500 / 600) = 3 decay steps.
    let event = app
        .judge_at(ALICE, 1, contest_start() + Duration::minutes(25))
        .await;
    assert_eq!(event.verdict, Some(Verdict::Accepted));
    assert_eq!(event.received_point, Some(100 - 2 * 10 - 3));
}

#[tokio::test]
async fn scores_are_kept_per_user() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[PASSING]).await;
    app.add_problem(2, &[PASSING]).await;

    app.judge(ALICE, 1).await;
    app.judge(ALICE, 2).await;
    app.judge(BOB, 2).await;

    let alice = app.store.user_score(ALICE, CONTEST).await.unwrap().unwrap();
    let bob = app.store.user_score(BOB, CONTEST).await.unwrap().unwrap();
    assert_eq!(alice.point(), 200);
    assert_eq!(bob.point(), 100);
}

#[tokio::test]
async fn award_never_goes_negative() {
    let app = TestApp::spawn().await;
    app.add_problem(1, &[PASSING]).await;

    let event = app
        .judge_at(ALICE, 1, contest_start() + Duration::days(2))
        .await;
    assert_eq!(event.received_point, Some(0));
}
