mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use page_host::memory::{FrameContext, MemoryMedia, MemoryPage, MemoryPlayer};
use playguard_engine::{
    spawn_guard, EngineError, NavigationEvent, ReportSink, TickReport, Trigger,
};

use common::*;

fn collector() -> (ReportSink, Arc<Mutex<Vec<TickReport>>>) {
    let seen: Arc<Mutex<Vec<TickReport>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Arc::new(move |report: &TickReport| sink.lock().push(report.clone())), seen)
}

fn count(reports: &[TickReport], trigger: Trigger) -> usize {
    reports
        .iter()
        .filter(|report| report.trigger == Some(trigger))
        .count()
}

#[tokio::test(start_paused = true)]
async fn timer_and_mutations_feed_one_consumer() {
    let rig = watch_rig(MemoryMedia::playing(10.0));
    let (sink, seen) = collector();
    let handle = spawn_guard(rig.guard.clone(), Some(sink)).expect("spawn");

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert!(count(&seen.lock(), Trigger::Timer) >= 3);

    let (toast, button) = interruption_toast();
    rig.add_overlay(toast);
    tokio::time::sleep(Duration::from_millis(10)).await;

    {
        let reports = seen.lock();
        let mutation = reports
            .iter()
            .find(|report| report.trigger == Some(Trigger::Mutation))
            .expect("mutation handled");
        assert!(mutation.ran);
        assert_eq!(mutation.dialogs.clicked, 1);
        assert!(mutation.health.is_none());
    }
    assert_eq!(button.click_count(), 1);

    handle.notify(Trigger::Navigation(NavigationEvent::NavigateFinish));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        count(
            &seen.lock(),
            Trigger::Navigation(NavigationEvent::NavigateFinish)
        ),
        1
    );

    handle.shutdown().await.expect("shutdown");
    let settled = seen.lock().len();
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(seen.lock().len(), settled);
}

#[tokio::test]
async fn ineligible_context_is_refused() {
    let media = MemoryMedia::playing(1.0);
    let player = MemoryPlayer::new(Some(media.clone()));
    let rig = build_rig(
        MemoryPage::builder(WATCH).frame(FrameContext::CrossOrigin).build(),
        media,
        player,
    );
    assert!(matches!(
        spawn_guard(rig.guard.clone(), None),
        Err(EngineError::Inactive(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_loop() {
    let rig = watch_rig(MemoryMedia::playing(10.0));
    let (sink, seen) = collector();
    let handle = spawn_guard(rig.guard.clone(), Some(sink)).expect("spawn");
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    drop(handle);
    let settled = seen.lock().len();
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert_eq!(seen.lock().len(), settled);
    assert!(settled >= 1);
}
