//! Client-facing report flows: poll-to-ready, snapshot round trips,
//! authorization rejections, force-stop.

use crate::*;

use vantage_core::report::{ReportResponse, SnapshotDirective};
use vantage_core::ReportError;
use vantage_services::{Caller, ReportReply, ReportRequest, SnapshotStore};

fn request(
    loading: LoadingDirective,
    snapshot: SnapshotDirective,
    snapshot_id: Option<&str>,
) -> ReportRequest {
    ReportRequest {
        loading_directive: loading,
        snapshot_directive: snapshot,
        snapshot_id: snapshot_id.map(|s| s.to_string()),
    }
}

fn live(reply: ReportReply) -> ReportResponse {
    match reply {
        ReportReply::Live(r) => r,
        ReportReply::Stored(_) => panic!("expected live reply"),
    }
}

/// Caller A polls org X: Processing at 40%, then Ready with the payload.
/// SnapshotDirective was None throughout, so no id is ever attached.
#[test]
fn test_poll_until_ready_without_snapshot() {
    let oracle = ScriptedOracle::new(&[
        (ReportStatus::Processing, 40, ""),
        (ReportStatus::Ready, 100, "report-X"),
    ]);
    let (handler, queue, store) = make_handler(oracle, &[]);
    let caller = Caller::new("session-a", "org-X");

    let r = live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::Start, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(r.status, ReportStatus::Processing);
    assert_eq!(r.percent, 40);
    assert_eq!(queue.len(), 1);

    let r = live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::NoStart, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(r.status, ReportStatus::Ready);
    assert_eq!(r.percent, 100);
    assert_eq!(r.payload, "report-X");
    assert!(r.snapshot_id.is_none());

    // terminal poll deregistered the scope and nothing was persisted
    assert_eq!(queue.len(), 0);
    assert!(store.list().unwrap().is_empty());
}

/// Caller B has snapshot-creation permission: an immediately-ready report
/// with Create comes back with an id, and Show returns the payload.
#[test]
fn test_create_then_show_round_trip() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Ready, 100, "report-Y")]);
    let (handler, _, _) = make_handler(oracle, &["session-b"]);
    let caller = Caller::new("session-b", "org-Y");

    let r = live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::Start, SnapshotDirective::Create, None),
            )
            .unwrap(),
    );
    assert_eq!(r.status, ReportStatus::Ready);
    let id = r.snapshot_id.clone().expect("snapshot id present");
    assert!(!id.is_empty());

    let reply = handler
        .handle(
            &caller,
            &request(
                LoadingDirective::NoStart,
                SnapshotDirective::Show,
                Some(&id),
            ),
        )
        .unwrap();
    let ReportReply::Stored(body) = reply else {
        panic!("expected stored reply");
    };
    let stored: ReportResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(stored.payload, "report-Y");
    assert_eq!(stored, r);
}

/// Caller C lacks report permission entirely: rejected before any queue
/// interaction, registry untouched.
#[test]
fn test_unauthorized_caller_leaves_registry_unchanged() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Ready, 100, "r")]);
    let queue = SummaryQueue::new(oracle.clone());
    let store = SnapshotMap::new();
    let auth = StaticAuthorizer::from_config(&AuthConfig {
        allow_all_reports: false,
        reporters: vec!["someone-else".into()],
        snapshot_creators: vec![],
    });
    let handler = ReportHandler::new(queue.clone(), Arc::new(store), Arc::new(auth));
    let caller = Caller::new("session-c", "org-Z");

    for loading in [
        LoadingDirective::Start,
        LoadingDirective::NoStart,
        LoadingDirective::ForceStop,
    ] {
        let err = handler
            .handle(&caller, &request(loading, SnapshotDirective::None, None))
            .unwrap_err();
        assert!(matches!(err, ReportError::Forbidden));
    }

    assert_eq!(queue.len(), 0);
    assert_eq!(oracle.advances.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Show with a never-issued id is not-found; after N creates, list()
/// returns exactly N distinct ids.
#[test]
fn test_show_unknown_and_list_counts() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Ready, 100, "r")]);
    let (handler, _, _) = make_handler(oracle, &["creator"]);
    let caller = Caller::new("creator", "org-X");

    let err = handler
        .handle(
            &caller,
            &request(
                LoadingDirective::NoStart,
                SnapshotDirective::Show,
                Some("never-issued"),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, ReportError::SnapshotNotFound(_)));

    for _ in 0..4 {
        handler
            .handle(
                &caller,
                &request(LoadingDirective::Start, SnapshotDirective::Create, None),
            )
            .unwrap();
    }
    let ids = handler.list_snapshots(&caller).unwrap();
    assert_eq!(ids.len(), 4);
    let distinct: std::collections::HashSet<_> = ids.into_iter().collect();
    assert_eq!(distinct.len(), 4);
}

/// Force-stop mid-computation: scope gone, a later NoStart is a no-op,
/// and a later Start begins fresh.
#[test]
fn test_force_stop_then_fresh_start() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Processing, 60, "")]);
    let (handler, queue, _) = make_handler(oracle, &[]);
    let caller = Caller::new("session-a", "org-X");

    live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::Start, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(queue.len(), 1);

    let r = live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::ForceStop, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(r.status, ReportStatus::Stopped);
    assert_eq!(queue.len(), 0);

    let r = live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::NoStart, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(r.status, ReportStatus::Waiting);
    assert_eq!(queue.len(), 0);

    live(
        handler
            .handle(
                &caller,
                &request(LoadingDirective::Start, SnapshotDirective::None, None),
            )
            .unwrap(),
    );
    assert_eq!(queue.len(), 1);
}

/// Two sessions in the same org are distinct scopes; the same session
/// re-polling shares one.
#[test]
fn test_scope_identity_covers_session_and_org() {
    let oracle = ScriptedOracle::new(&[(ReportStatus::Processing, 10, "")]);
    let (handler, queue, _) = make_handler(oracle, &[]);

    let a = Caller::new("session-a", "org-X");
    let b = Caller::new("session-b", "org-X");

    let req = request(LoadingDirective::Start, SnapshotDirective::None, None);
    handler.handle(&a, &req).unwrap();
    handler.handle(&a, &req).unwrap();
    handler.handle(&b, &req).unwrap();

    assert_eq!(queue.len(), 2);
}
