use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;

use callbridge::{Config, Event, EventKind, ExecutorError, Hub, Subscribe};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    async fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().await.iter().map(|e| e.kind).collect()
    }

    async fn find(&self, kind: EventKind) -> Option<Event> {
        self.events
            .lock()
            .await
            .iter()
            .find(|e| e.kind == kind)
            .cloned()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.events.lock().await.push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn hub_with(cfg: Config) -> (Arc<Hub>, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let hub = Hub::builder(cfg)
        .with_subscribers(vec![Arc::clone(&rec) as Arc<dyn Subscribe>])
        .build();
    (hub, rec)
}

#[tokio::test]
async fn registry_lifecycle_reaches_subscribers() -> anyhow::Result<()> {
    let (hub, rec) = hub_with(Config::default());
    let connections = hub.registry::<String, u8>("connections");

    let handle = connections.enqueue("dev-1".to_string(), || {}).await;
    connections.complete("dev-1", Ok(3)).await?;
    assert_eq!(handle.await?, 3);

    hub.shutdown().await;

    assert_eq!(
        rec.kinds().await,
        vec![
            EventKind::ExecutorCreated,
            EventKind::JobQueued,
            EventKind::JobStarted,
            EventKind::JobResolved,
            EventKind::ExecutorRemoved,
        ]
    );
    let removed = rec.find(EventKind::ExecutorRemoved).await.unwrap();
    assert_eq!(removed.scope.as_deref(), Some("connections"));
    assert_eq!(removed.key.as_deref(), Some("\"dev-1\""));
    Ok(())
}

#[tokio::test]
async fn stray_callbacks_are_reported_not_fatal() -> anyhow::Result<()> {
    let (hub, rec) = hub_with(Config::default());
    let gatt = hub.serial::<u8>("gatt");
    let connections = hub.registry::<String, u8>("connections");

    assert!(matches!(
        gatt.complete(Ok(1)).await,
        Err(ExecutorError::NoJobToExecute)
    ));
    assert!(matches!(
        connections.complete("ghost", Ok(1)).await,
        Err(ExecutorError::ExecutorNotFound)
    ));

    // Both executors keep working afterwards.
    let handle = gatt.enqueue(|| {}).await;
    gatt.complete(Ok(2)).await?;
    assert_eq!(handle.await?, 2);

    hub.shutdown().await;

    let unmatched = rec.find(EventKind::UnmatchedCompletion).await.unwrap();
    assert_eq!(unmatched.scope.as_deref(), Some("gatt"));
    assert!(unmatched.is_anomaly());

    let missing = rec.find(EventKind::ExecutorNotFound).await.unwrap();
    assert_eq!(missing.key.as_deref(), Some("\"ghost\""));
    Ok(())
}

#[tokio::test]
async fn stream_lifecycle_reaches_subscribers() {
    let (hub, rec) = hub_with(Config::default());
    let scan = hub.data_stream::<u32>("scan");

    let mut stream = scan.create(|| async { Ok(()) }, || async { Ok(()) });
    scan.send(1);
    assert_eq!(stream.next().await.unwrap().unwrap(), 1);

    scan.finish().await;
    assert!(stream.next().await.is_none());
    assert!(!scan.send(2));

    hub.shutdown().await;

    let kinds = rec.kinds().await;
    assert!(kinds.contains(&EventKind::StreamStarted));
    assert!(kinds.contains(&EventKind::StreamTerminated));
    assert!(kinds.contains(&EventKind::StreamValueDropped));
}

#[tokio::test]
async fn handles_survive_drop_when_cancel_on_drop_is_off() -> anyhow::Result<()> {
    let (hub, _rec) = hub_with(Config {
        cancel_on_drop: false,
        ..Config::default()
    });
    let gatt = hub.serial::<u8>("gatt");

    let first = gatt.enqueue(|| {}).await;
    let id = first.id();
    drop(first);
    tokio::task::yield_now().await;

    assert_eq!(gatt.current().await, Some(id));
    gatt.complete(Ok(0)).await?;
    assert!(!gatt.has_work().await);

    hub.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn dropped_handle_cancels_by_default() {
    let (hub, rec) = hub_with(Config::default());
    let gatt = hub.serial::<u8>("gatt");

    let first = gatt.enqueue(|| {}).await;
    let second = gatt.enqueue(|| {}).await;
    drop(first);

    for _ in 0..50 {
        if gatt.current().await == Some(second.id()) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(gatt.current().await, Some(second.id()));

    hub.shutdown().await;
    assert!(rec.kinds().await.contains(&EventKind::JobCancelled));
}

#[tokio::test]
async fn callback_slot_conflict_is_published() {
    let (hub, rec) = hub_with(Config::default());
    let delegate = hub.callback_slot::<&'static str>("delegate");

    let guard = delegate.claim("scanner").unwrap();
    assert!(matches!(
        delegate.claim("pairing"),
        Err(ExecutorError::SlotOccupied { .. })
    ));
    drop(guard);
    let _guard = delegate.claim("pairing").unwrap();

    hub.shutdown().await;
    let conflict = rec.find(EventKind::SlotConflict).await.unwrap();
    assert_eq!(conflict.reason.as_deref(), Some("\"scanner\""));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let (hub, _rec) = hub_with(Config::default());
    hub.shutdown().await;
    hub.shutdown().await;
    assert_eq!(hub.config().bus_capacity, 1024);
}
