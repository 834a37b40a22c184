use super::*;
use crate::client::model::{CaseStatus, SubmissionStatus};
use crate::test::util::{case, ok, MockApi, MockPoll};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use test_env_log::test;

fn opts() -> ObserveOptions {
    ObserveOptionsBuilder::default()
        .interval(Duration::from_millis(500))
        .highlight(Duration::from_millis(2000))
        .max_wait(None::<Duration>)
        .build()
        .unwrap()
}

/// Wait until a snapshot satisfying `pred` is published, and return it.
async fn wait_for(
    rx: &mut watch::Receiver<Snapshot>,
    pred: impl Fn(&Snapshot) -> bool,
) -> Snapshot {
    loop {
        {
            let s = rx.borrow_and_update();
            if pred(&s) {
                return s.clone();
            }
        }
        if rx.changed().await.is_err() {
            let s = rx.borrow().clone();
            assert!(pred(&s), "channel closed before condition held: {:?}", s);
            return s;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn growing_results_until_accepted() {
    let (r1, r2) = (case(1, CaseStatus::Accepted), case(2, CaseStatus::Accepted));
    let api = Arc::new(MockApi::with_script(vec![
        ok(SubmissionStatus::Running, vec![]),
        ok(SubmissionStatus::Running, vec![r1.clone()]),
        ok(SubmissionStatus::Accepted, vec![r1, r2]),
    ]));
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.polls == 1).await;
    assert_eq!(s.phase, Phase::Polling);
    assert!(s.results.is_empty());
    assert!(s.highlighted.is_empty());

    let s = wait_for(&mut rx, |s| s.polls == 2).await;
    assert_eq!(s.results.len(), 1);
    assert_eq!(s.highlighted, BTreeSet::from([0]));

    let s = wait_for(&mut rx, |s| s.polls == 3).await;
    assert_eq!(s.phase, Phase::Finished);
    assert_eq!(s.results.len(), 2);
    assert_eq!(s.highlighted, BTreeSet::from([1]));
    assert_eq!(
        s.submission.as_ref().map(|s| s.status),
        Some(SubmissionStatus::Accepted)
    );

    // Well past several intervals: no further poll
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.submission_calls(), 3);
    assert_eq!(api.results_calls(), 3);

    let s = observer.snapshot();
    assert!(s.highlighted.is_empty());
    assert_eq!(s.phase, Phase::Finished);
}

#[tokio::test(start_paused = true)]
async fn terminal_submission_is_fetched_once() {
    let api = Arc::new(MockApi::with_script(vec![ok(
        SubmissionStatus::CompileError,
        vec![],
    )]));
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.phase == Phase::Finished).await;
    assert_eq!(s.polls, 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.submission_calls(), 1);
    assert_eq!(api.results_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn highlight_lasts_at_least_its_duration() {
    let api = Arc::new(MockApi::with_script(vec![
        ok(SubmissionStatus::Running, vec![]),
        ok(SubmissionStatus::Running, vec![case(1, CaseStatus::Accepted)]),
    ]));
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    wait_for(&mut rx, |s| s.is_highlighted(0)).await;
    let marked_at = Instant::now();

    wait_for(&mut rx, |s| !s.is_highlighted(0)).await;
    assert!(marked_at.elapsed() >= Duration::from_millis(2000));

    observer.stop_observing();
}

#[tokio::test(start_paused = true)]
async fn later_growth_is_not_cut_short_by_earlier_highlight() {
    let (r1, r2) = (case(1, CaseStatus::Accepted), case(2, CaseStatus::WrongAnswer));
    let api = Arc::new(MockApi::with_script(vec![
        ok(SubmissionStatus::Running, vec![]),
        ok(SubmissionStatus::Running, vec![r1.clone()]),
        ok(SubmissionStatus::Running, vec![r1, r2]),
    ]));
    let started = Instant::now();
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    wait_for(&mut rx, |s| s.is_highlighted(1)).await;

    // The first highlight (marked at 500ms) would have expired at 2500ms.
    tokio::time::sleep_until(started + Duration::from_millis(2700)).await;
    let s = observer.snapshot();
    assert_eq!(s.highlighted, BTreeSet::from([1]));

    observer.stop_observing();
}

#[tokio::test(start_paused = true)]
async fn failed_first_poll_is_retried() {
    let api = Arc::new(MockApi::with_script(vec![
        MockPoll::NetworkError,
        ok(SubmissionStatus::Running, vec![case(1, CaseStatus::Accepted)]),
    ]));
    let observer = SubmissionObserver::start_observing(api.clone(), "99".into(), opts());
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.polls == 1).await;
    assert_eq!(s.error.as_deref(), Some("Failed to load"));
    assert!(s.results.is_empty());
    assert!(s.submission.is_none());
    assert_eq!(s.phase, Phase::Polling);

    // The second cycle gets both halves of the second answer
    let s = wait_for(&mut rx, |s| s.polls == 2).await;
    assert_eq!(s.error, None);
    assert!(s.submission.is_some());
    assert_eq!(s.results.len(), 1);
    assert_eq!(s.highlighted, BTreeSet::from([0]));
    assert_eq!(api.submission_calls(), 2);

    observer.stop_observing();
}

#[tokio::test(start_paused = true)]
async fn failed_poll_keeps_rendered_results() {
    let api = Arc::new(MockApi::with_script(vec![
        ok(SubmissionStatus::Running, vec![case(1, CaseStatus::Accepted)]),
        MockPoll::NetworkError,
    ]));
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.polls == 2).await;
    assert!(s.error.is_some());
    assert_eq!(s.results.len(), 1);
    assert!(s.submission.is_some());

    // Still retrying at every tick
    let s = wait_for(&mut rx, |s| s.polls == 4).await;
    assert_eq!(s.phase, Phase::Polling);

    observer.stop_observing();
}

#[tokio::test(start_paused = true)]
async fn missing_submission_never_polls() {
    let api = Arc::new(MockApi::with_script(vec![MockPoll::NotFound]));
    let observer = SubmissionObserver::start_observing(api.clone(), "404".into(), opts());
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.phase == Phase::NotFound).await;
    assert_eq!(s.error.as_deref(), Some("Submission 404 does not exist"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.submission_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_is_idempotent_and_final() {
    let api = Arc::new(MockApi::with_script(vec![ok(
        SubmissionStatus::Running,
        vec![case(1, CaseStatus::Accepted)],
    )]));
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts());
    let mut rx = observer.subscribe();

    wait_for(&mut rx, |s| s.polls == 1).await;
    observer.stop_observing();
    observer.stop_observing();

    let s = wait_for(&mut rx, |s| s.phase == Phase::Stopped).await;
    assert_eq!(s.polls, 1);
    let calls = api.submission_calls();

    // The pending highlight timer and the interval are both gone
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.changed().await.is_err());
    assert_eq!(api.submission_calls(), calls);
    assert_eq!(observer.snapshot().phase, Phase::Stopped);
    assert!(observer.snapshot().is_highlighted(0));

    drop(observer);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_wait() {
    let api = Arc::new(MockApi::with_script(vec![ok(
        SubmissionStatus::Pending,
        vec![],
    )]));
    let opts = ObserveOptionsBuilder::default()
        .max_wait(Duration::from_secs(2))
        .build()
        .unwrap();
    let observer = SubmissionObserver::start_observing(api.clone(), "42".into(), opts);
    let mut rx = observer.subscribe();

    let s = wait_for(&mut rx, |s| s.phase == Phase::GaveUp).await;
    assert!(s.error.is_some());
    let calls = api.submission_calls();
    assert!(calls >= 4, "polled only {} times", calls);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.submission_calls(), calls);
}

#[test]
fn options_from_config() {
    let opts = ObserveOptions::default();
    assert_eq!(opts.interval, Duration::from_millis(500));
    assert_eq!(opts.highlight, Duration::from_millis(2000));
    assert_eq!(opts.max_wait, Some(Duration::from_secs(1800)));
}
