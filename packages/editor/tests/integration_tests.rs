//! Integration tests for editor crate

use annotate_editor::geometry::Point;
use annotate_editor::{
    Document, DocumentStore, Edit, EditSession, EditorError, FixedDelay, HandleAction, MemoryStore, NoRetry,
    SaveStatus, StoreError, Value, MOVE_THROTTLE,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, Semaphore};

const FRAME: &str = r#"{
    "name": "f1",
    "keywords": ["street"],
    "frame": {"path": "street/f1.png", "width": 800, "height": 600},
    "annotations": []
}"#;

fn frame() -> Document {
    Document::from_json(FRAME).unwrap()
}

/// Store that holds every write until released, recording document names
struct GatedStore {
    names: Mutex<Vec<String>>,
    started: Notify,
    release: Semaphore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failures_left: AtomicU32,
}

impl GatedStore {
    fn new() -> Self {
        Self::failing(0)
    }

    fn failing(times: u32) -> Self {
        Self {
            names: Mutex::new(Vec::new()),
            started: Notify::new(),
            release: Semaphore::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failures_left: AtomicU32::new(times),
        }
    }

    fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

impl DocumentStore for GatedStore {
    async fn store(&self, _identifier: &str, document: &Document) -> Result<(), StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        let permit = self.release.acquire().await.unwrap();
        permit.forget();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Rejected("backend unavailable".to_string()));
        }

        self.names
            .lock()
            .unwrap()
            .push(document.name().unwrap_or_default().to_string());
        Ok(())
    }
}

/// Store that fails a fixed number of times, then succeeds immediately
#[derive(Default)]
struct FlakyStore {
    failures_left: AtomicU32,
    calls: AtomicU32,
    inner: MemoryStore,
}

impl DocumentStore for FlakyStore {
    async fn store(&self, identifier: &str, document: &Document) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.store(identifier, document).await
    }
}

#[test]
fn test_two_annotations_single_selection() {
    let mut session = EditSession::new("street/f1.json", Document::default());

    assert_eq!(session.add_annotation().unwrap(), 0);
    assert_eq!(session.add_annotation().unwrap(), 1);

    session
        .apply_edit("$.annotations.0.isSelected", Edit::Set(Value::Bool(true)))
        .unwrap();
    session
        .apply_edit("$.annotations.1.isSelected", Edit::Set(Value::Bool(true)))
        .unwrap();

    assert_eq!(session.document().selected_indices(), vec![1]);
    assert_eq!(
        session.document().get("$.annotations.0.isSelected").unwrap(),
        Some(&Value::Bool(false))
    );
}

#[test]
fn test_ids_continue_from_loaded_document() {
    let doc = Document::from_json(r#"{"annotations": [{"id": 7}, {"id": 3}]}"#).unwrap();
    let mut session = EditSession::new("x.json", doc);

    assert_eq!(session.add_annotation().unwrap(), 8);
    session.delete_annotation(0).unwrap();
    assert_eq!(session.add_annotation().unwrap(), 9);
}

#[test]
fn test_property_panel_workflow() {
    let mut session = EditSession::new("street/f1.json", frame());
    session.add_annotation().unwrap();

    let added = session.add_property("$.annotations.0.attributes").unwrap();
    session
        .apply_edit(&added.to_string(), Edit::Rename("plate".into()))
        .unwrap();
    session
        .apply_edit("$.annotations.0.attributes.plate", Edit::Input("1234".into()))
        .unwrap();
    session
        .apply_edit("$.annotations.0.attributes.occluded", Edit::Input("true".into()))
        .unwrap();

    let annotation = session.document().annotation(0).unwrap();
    assert_eq!(annotation.attributes.get("plate"), Some(&Value::Int(1234)));
    assert_eq!(annotation.attributes.get("occluded"), Some(&Value::Bool(true)));
    assert_eq!(annotation.attributes.get("name"), None);

    let err = session
        .apply_edit("$.annotations.0.bounding_box.width", Edit::Rename("w".into()))
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(_)));
}

#[test]
fn test_drag_at_zoom_edits_unscaled_box() {
    let mut session = EditSession::new("street/f1.json", frame());
    session.add_annotation().unwrap();
    // 800 wide frame shown 1000 wide
    session.on_wheel(-2000.0, true, false);
    assert_eq!(session.growth().x, 1.25);

    let start = Instant::now();
    session
        .begin_drag(0, HandleAction::BottomRight, Point::new(500.0, 500.0))
        .unwrap();
    assert!(session.drag_to(Point::new(525.0, 550.0), start).unwrap());
    // Throttled
    assert!(!session.drag_to(Point::new(600.0, 600.0), start + Duration::from_millis(10)).unwrap());
    session.end_drag().unwrap();

    let annotation = session.document().annotation(0).unwrap();
    assert_eq!(annotation.bounding_box.width, 220.0);
    assert_eq!(annotation.bounding_box.height, 240.0);
    assert!(!annotation.is_selected);
    assert_eq!(
        session.document().get("$.annotations.0.bounding_box.width").unwrap(),
        Some(&Value::Int(220))
    );
}

#[test]
fn test_click_without_motion_toggles_selection() {
    let mut session = EditSession::new("street/f1.json", frame());
    session.add_annotation().unwrap();
    session.add_annotation().unwrap();
    session.select(0).unwrap();

    session.begin_drag(1, HandleAction::Move, Point::new(10.0, 10.0)).unwrap();
    assert!(!session.drag_to(Point::new(10.2, 10.0), Instant::now()).unwrap());
    session.end_drag().unwrap();

    assert_eq!(session.document().selected_indices(), vec![1]);
}

#[test]
fn test_drag_round_trip_is_identity() {
    let mut session = EditSession::new("street/f1.json", frame());
    session.add_annotation().unwrap();
    let before = session.document().annotation(0).unwrap().bounding_box;

    let start = Instant::now();
    session
        .begin_drag(0, HandleAction::BottomRight, Point::new(0.0, 0.0))
        .unwrap();
    session.drag_to(Point::new(30.0, -12.0), start).unwrap();
    session.drag_to(Point::new(0.0, 0.0), start + MOVE_THROTTLE).unwrap();
    session.end_drag().unwrap();

    assert_eq!(session.document().annotation(0).unwrap().bounding_box, before);
}

#[tokio::test]
async fn test_repeated_edit_persists_once() {
    let store = Arc::new(MemoryStore::new());
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), NoRetry);

    session.apply_edit("$.name", Edit::Input("renamed".into())).unwrap();
    session.apply_edit("$.name", Edit::Input("renamed".into())).unwrap();

    let report = session.flush().await.unwrap();
    assert_eq!(report.requests, 1);
    assert_eq!(report.writes, 1);
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test]
async fn test_final_stored_state_matches_session() {
    let store = Arc::new(MemoryStore::new());
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), NoRetry);

    for _ in 0..5 {
        session.add_annotation().unwrap();
    }
    session.select(3).unwrap();
    session.add_keyword("night").unwrap();

    let report = session.flush().await.unwrap();
    assert_eq!(report.last_written, Some(session.version()));

    let latest = store.latest();
    assert_eq!(latest.get("street/f1.json"), Some(session.document()));
}

#[tokio::test]
async fn test_coalescing_skips_intermediate_snapshot() {
    let store = Arc::new(GatedStore::new());
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), NoRetry);

    session.apply_edit("$.name", Edit::Input("D1".into())).unwrap();
    store.started.notified().await;
    assert_eq!(session.save_status(), SaveStatus::Writing { version: 1 });

    session.apply_edit("$.name", Edit::Input("D2".into())).unwrap();
    session.apply_edit("$.name", Edit::Input("D3".into())).unwrap();

    store.release.add_permits(10);
    let report = session.flush().await.unwrap();

    assert_eq!(store.names(), vec!["D1", "D3"]);
    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(report.requests, 3);
    assert_eq!(report.writes, 2);
    assert_eq!(report.last_written, Some(3));
    assert_eq!(session.save_status(), SaveStatus::Idle);
}

#[tokio::test]
async fn test_failure_is_surfaced_without_retry() {
    let store = Arc::new(FlakyStore {
        failures_left: AtomicU32::new(1),
        ..FlakyStore::default()
    });
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), NoRetry);

    session.apply_edit("$.name", Edit::Input("first".into())).unwrap();
    let report = session.flush().await.unwrap();

    assert_eq!(report.writes, 0);
    assert_eq!(report.last_error.as_ref().map(|e| e.version), Some(1));
    assert!(matches!(session.save_status(), SaveStatus::Failed { version: 1, .. }));

    // The next edit carries the latest state
    session.apply_edit("$.name", Edit::Input("second".into())).unwrap();
    let report = session.flush().await.unwrap();

    assert_eq!(report.writes, 1);
    assert_eq!(report.last_error, None);
    assert_eq!(store.inner.latest()["street/f1.json"].name(), Some("second"));
}

#[tokio::test]
async fn test_fixed_delay_retries_until_success() {
    let store = Arc::new(FlakyStore {
        failures_left: AtomicU32::new(2),
        ..FlakyStore::default()
    });
    let policy = FixedDelay {
        attempts: 3,
        delay: Duration::from_millis(5),
    };
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), policy);

    session.add_keyword("retry").unwrap();
    let report = session.flush().await.unwrap();

    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.writes, 1);
    assert_eq!(report.last_written, Some(1));
    assert_eq!(report.last_error, None);
}

#[tokio::test]
async fn test_fixed_delay_gives_up() {
    let store = Arc::new(FlakyStore {
        failures_left: AtomicU32::new(10),
        ..FlakyStore::default()
    });
    let policy = FixedDelay {
        attempts: 1,
        delay: Duration::from_millis(1),
    };
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), policy);

    session.add_keyword("retry").unwrap();
    let report = session.flush().await.unwrap();

    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.writes, 0);
    assert!(report.last_error.is_some());
}

#[tokio::test]
async fn test_newer_snapshot_supersedes_failed_write() {
    let store = Arc::new(GatedStore::failing(1));
    let policy = FixedDelay {
        attempts: 5,
        delay: Duration::from_secs(60),
    };
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), policy);

    session.apply_edit("$.name", Edit::Input("D1".into())).unwrap();
    store.started.notified().await;
    session.apply_edit("$.name", Edit::Input("D2".into())).unwrap();

    store.release.add_permits(10);
    let report = session.close().await.unwrap();

    // D1 failed but D2 was pending, so D1 is never retried
    assert_eq!(store.names(), vec!["D2"]);
    assert_eq!(report.last_written, Some(2));
}

#[tokio::test]
async fn test_edits_during_backoff_write_immediately() {
    let store = Arc::new(GatedStore::failing(1));
    let policy = FixedDelay {
        attempts: 5,
        delay: Duration::from_secs(60),
    };
    let mut session = EditSession::with_store("street/f1.json", frame(), Arc::clone(&store), policy);
    session.apply_edit("$.name", Edit::Input("D1".into())).unwrap();
    store.started.notified().await;
    store.release.add_permits(10);

    // Wait for the failure to be reported
    let mut status = session.subscribe_status().expect("session has a store");
    status
        .wait_for(|s| matches!(s, SaveStatus::Failed { .. }))
        .await
        .unwrap();

    session.apply_edit("$.name", Edit::Input("D2".into())).unwrap();
    let report = session.flush().await.unwrap();

    assert_eq!(store.names(), vec!["D2"]);
    assert_eq!(report.last_written, Some(2));
}
