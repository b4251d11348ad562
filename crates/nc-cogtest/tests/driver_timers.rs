//! Timer behavior of the async driver under paused time

use nc_cogtest::driver::{self, DriverHandle, TestView};
use nc_cogtest::{Color, DriverError, DriverExit, InputOutcome, Phase, ScriptedSequence, SequenceTest, TestOutcome};
use nc_core::{TestRules, TimingConfig};
use nc_test_utils::RecordingObserver;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Fallback pattern of `ScriptedSequence`
fn pattern(len: usize) -> Vec<Color> {
    (0..len).map(|i| Color::ALL[i % 4]).collect()
}

fn launch() -> (DriverHandle, driver::DriverTask, Arc<RecordingObserver>) {
    let engine = SequenceTest::new(TestRules::default(), ScriptedSequence::default());
    let observer = Arc::new(RecordingObserver::default());
    let (handle, task) = driver::spawn(engine, TimingConfig::default(), observer.clone());
    (handle, task, observer)
}

async fn until_recall(handle: &DriverHandle) -> TestView {
    let mut view = handle.subscribe();
    let ready = view
        .wait_for(|v| v.snapshot.phase == Phase::Recall && !v.snapshot.awaiting_attempt)
        .await
        .unwrap()
        .clone();
    ready
}

#[tokio::test(start_paused = true)]
async fn full_session_reports_confirmed_score() {
    let (handle, task, observer) = launch();
    handle.start().await.unwrap();

    for level in 1..=7usize {
        let view = until_recall(&handle).await;
        assert_eq!(view.snapshot.level as usize, level);
        assert_eq!(view.snapshot.sequence_len, level + 2);
        let mut last = None;
        for color in pattern(level + 2) {
            last = Some(handle.input(color).await.unwrap());
        }
        if level < 7 {
            assert!(last.unwrap().awaits_next_attempt());
        } else {
            assert_eq!(last, Some(InputOutcome::Finished { score: 700 }));
        }
    }

    let view = handle.view();
    assert_eq!(view.snapshot.phase, Phase::Result);
    assert_eq!(view.summary.map(|s| s.confirmed_score), Some(100));

    assert_eq!(handle.confirm().await.unwrap(), 100);
    assert_eq!(observer.outcomes(), vec![TestOutcome::Completed(100)]);
    assert_eq!(task.finished().await.unwrap(), DriverExit::Completed(100));
}

#[tokio::test(start_paused = true)]
async fn cancel_in_recall_stops_every_timer() {
    let (handle, task, observer) = launch();
    handle.start().await.unwrap();
    until_recall(&handle).await;

    // mistake arms the next-attempt timer
    let outcome = handle.input(Color::Yellow).await.unwrap();
    assert!(outcome.awaits_next_attempt());
    let before = handle.view();

    handle.cancel().await.unwrap();
    assert_eq!(observer.outcomes(), vec![TestOutcome::Cancelled]);

    time::sleep(Duration::from_secs(30)).await;
    let after = handle.view();
    assert_eq!(after.snapshot.phase, before.snapshot.phase);
    assert_eq!(after.snapshot.level, before.snapshot.level);
    assert!(after.snapshot.closed);
    assert_eq!(after.highlighted, None);

    assert!(matches!(handle.input(Color::Red).await, Err(DriverError::Stopped)));
    assert!(matches!(handle.confirm().await, Err(DriverError::Stopped)));
    assert_eq!(observer.outcomes(), vec![TestOutcome::Cancelled]);
    assert_eq!(task.finished().await.unwrap(), DriverExit::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_from_intro_without_start() {
    let (handle, task, observer) = launch();
    handle.cancel().await.unwrap();
    assert_eq!(observer.outcomes(), vec![TestOutcome::Cancelled]);
    assert_eq!(task.finished().await.unwrap(), DriverExit::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn inputs_during_playback_are_rejected() {
    let (handle, _task, _) = launch();
    handle.start().await.unwrap();
    let err = handle.input(Color::Red).await.unwrap_err();
    assert!(matches!(err, DriverError::Test(e) if e.is_transient()));
}

#[tokio::test(start_paused = true)]
async fn close_from_result_reports_cancel() {
    let engine = SequenceTest::new(
        TestRules {
            max_errors: 1,
            ..TestRules::default()
        },
        ScriptedSequence::default(),
    );
    let observer = Arc::new(RecordingObserver::default());
    let (handle, task) = driver::spawn(engine, TimingConfig::default(), observer.clone());

    handle.start().await.unwrap();
    until_recall(&handle).await;
    let outcome = handle.input(Color::Green).await.unwrap();
    assert_eq!(outcome, InputOutcome::Terminated { score: 0 });

    handle.cancel().await.unwrap();
    assert_eq!(observer.outcomes(), vec![TestOutcome::Cancelled]);
    assert_eq!(task.finished().await.unwrap(), DriverExit::Cancelled);
}
