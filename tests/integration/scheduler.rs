//! Auto-snapshot scheduler scenarios: an unattended firing producing a
//! retrievable snapshot, and cancellation semantics under a paused clock.

use crate::*;

use std::time::Duration;

use vantage_core::config::SchedulerSettings;
use vantage_core::report::{OwnerId, ReportResponse, SnapshotDirective};
use vantage_services::{
    AutoSnapshot, BuildProgress, Caller, ReportBuilder, ReportReply, ReportRequest, SnapshotStore,
    ThreadedOracle,
};

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        enabled: true,
        initial_delay_minutes: 2,
        period_minutes: 1440,
        poll_backoff_secs: 10,
        neutral_org: "all".to_string(),
    }
}

/// Instant builder so threaded-oracle tests finish without wall-clock waits.
struct InstantBuilder;

impl ReportBuilder for InstantBuilder {
    fn build(&self, scope: &Scope, progress: &BuildProgress) -> anyhow::Result<String> {
        progress.set_percent(100);
        Ok(format!("auto-report-{}", scope.org))
    }
}

/// A full unattended run against the real threaded oracle: the scheduler
/// starts the computation under its synthetic scope, polls it to Ready,
/// and the saved snapshot is retrievable through the handler's Show path.
#[tokio::test(start_paused = true)]
async fn test_scheduler_firing_end_to_end() {
    let oracle = Arc::new(ThreadedOracle::new(Arc::new(InstantBuilder)));
    let queue = SummaryQueue::new(oracle);
    let store = SnapshotMap::new();

    let handle = AutoSnapshot::new(
        queue.clone(),
        Arc::new(store.clone()),
        settings(),
    )
    .spawn();

    // Initial delay plus enough backoff rounds for the worker thread to
    // finish. The clock is virtual; the builder thread is real, so give it
    // a sliver of real time each round.
    for _ in 0..500 {
        tokio::time::sleep(Duration::from_secs(15)).await;
        std::thread::sleep(Duration::from_millis(1));
        if !store.list().unwrap().is_empty() {
            break;
        }
    }
    handle.cancel();
    handle.join().await;

    let ids = store.list().unwrap();
    assert_eq!(ids.len(), 1, "exactly one firing completed");

    // The scheduler's scope is deregistered after the terminal poll.
    assert!(!queue.is_registered(&Scope::new("all", OwnerId::System)));

    // Retrieve through the client-facing Show path.
    let auth = StaticAuthorizer::from_config(&AuthConfig {
        allow_all_reports: true,
        reporters: vec![],
        snapshot_creators: vec![],
    });
    let handler = ReportHandler::new(queue, Arc::new(store), Arc::new(auth));
    let caller = Caller::new("viewer", "org-any");
    let reply = handler
        .handle(
            &caller,
            &ReportRequest {
                loading_directive: LoadingDirective::NoStart,
                snapshot_directive: SnapshotDirective::Show,
                snapshot_id: Some(ids[0].clone()),
            },
        )
        .unwrap();
    let ReportReply::Stored(body) = reply else {
        panic!("expected stored reply");
    };
    let stored: ReportResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(stored.status, ReportStatus::Ready);
    assert_eq!(stored.payload, "auto-report-all");
    assert_eq!(stored.snapshot_id.as_deref(), Some(ids[0].as_str()));
}

/// Cancellation raised while the firing sleeps between polls: the loop
/// exits without a snapshot, and a second cancel is a no-op.
#[tokio::test(start_paused = true)]
async fn test_cancel_mid_backoff_is_idempotent() {
    // Never reaches Ready, so only cancellation can end the firing.
    let oracle = ScriptedOracle::new(&[(ReportStatus::Processing, 50, "")]);
    let queue = SummaryQueue::new(oracle);
    let store = SnapshotMap::new();

    let handle = AutoSnapshot::new(queue, Arc::new(store.clone()), settings()).spawn();

    // Past the initial delay and into the poll/backoff loop.
    tokio::time::sleep(Duration::from_secs(3 * 60)).await;

    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
    handle.join().await;

    assert!(store.list().unwrap().is_empty());
}

/// A firing completes, then cancellation arrives during the long period
/// sleep: the task exits cleanly and no second firing starts.
#[tokio::test(start_paused = true)]
async fn test_cancel_between_firings() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Ready, 100, "r")]);
    let queue = SummaryQueue::new(oracle);
    let store = SnapshotMap::new();

    let handle = AutoSnapshot::new(queue, Arc::new(store.clone()), settings()).spawn();

    // Let one firing complete, then cancel during the long period sleep.
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(store.list().unwrap().len(), 1);

    handle.cancel();
    handle.join().await;

    // Cancelled between firings: still exactly one snapshot.
    assert_eq!(store.list().unwrap().len(), 1);
}
