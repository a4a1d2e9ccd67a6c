//! # Example: device_adapter
//!
//! Demonstrates a complete adapter over a simulated callback-based device SDK,
//! wired through a [`Hub`] with the built-in [`LogWriter`].
//!
//! Shows how to:
//! - Own the SDK delegate exclusively with a [`CallbackSlot`].
//! - Route per-peripheral callbacks to an [`ExecutorRegistry`].
//! - Expose notifications as a [`DataStream`](callbridge::DataStream).
//! - Observe stray callbacks and lifecycle events in the log.
//!
//! ## Flow
//! ```text
//! Adapter::connect(id) ──► registry.submit(id, sdk.connect) ──► SdkEvent::Connected(id)
//!                                                                   └─► registry.complete(id)
//! Adapter::notifications() ──► bridge.create(start, stop) ◄── SdkEvent::Notify(v)
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example device_adapter --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use callbridge::{
    CallbackSlot, Config, DataStreamBridge, ExecutorError, ExecutorRegistry, Hub, LogWriter,
    SlotGuard, Subscribe,
};
use futures::StreamExt;
use tokio::sync::mpsc;

/// Callbacks the simulated SDK delivers.
#[derive(Debug)]
enum SdkEvent {
    Connected(String),
    ConnectFailed(String, &'static str),
    Notify(u8),
}

/// Commands the simulated SDK accepts.
#[derive(Debug)]
enum SdkCommand {
    Connect(String),
    StartNotify,
    StopNotify,
}

/// Simulated SDK: answers commands with callbacks on another task.
fn spawn_sdk(
    mut commands: mpsc::UnboundedReceiver<SdkCommand>,
    callbacks: mpsc::UnboundedSender<SdkEvent>,
) {
    tokio::spawn(async move {
        let mut notifying = None;
        while let Some(cmd) = commands.recv().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
            match cmd {
                SdkCommand::Connect(id) if id.starts_with("bad") => {
                    let _ = callbacks.send(SdkEvent::ConnectFailed(id, "out of range"));
                }
                SdkCommand::Connect(id) => {
                    let _ = callbacks.send(SdkEvent::Connected(id));
                }
                SdkCommand::StartNotify => {
                    let tx = callbacks.clone();
                    notifying = Some(tokio::spawn(async move {
                        for v in (0..=u8::MAX).cycle() {
                            tokio::time::sleep(Duration::from_millis(3)).await;
                            if tx.send(SdkEvent::Notify(v)).is_err() {
                                break;
                            }
                        }
                    }));
                }
                SdkCommand::StopNotify => {
                    if let Some(task) = notifying.take() {
                        task.abort();
                    }
                }
            }
        }
    });
}

struct Adapter {
    sdk: mpsc::UnboundedSender<SdkCommand>,
    connections: ExecutorRegistry<String, ()>,
    notifications: DataStreamBridge<u8>,
    _delegate: SlotGuard<&'static str>,
}

impl Adapter {
    fn new(hub: &Hub, delegate: &CallbackSlot<&'static str>) -> Result<Arc<Self>, ExecutorError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (cb_tx, cb_rx) = mpsc::unbounded_channel();
        spawn_sdk(cmd_rx, cb_tx);

        let adapter = Arc::new(Self {
            sdk: cmd_tx,
            connections: hub.registry("connections"),
            notifications: hub.data_stream("notifications"),
            _delegate: delegate.claim("adapter")?,
        });
        tokio::spawn(Self::dispatch(Arc::clone(&adapter), cb_rx));
        Ok(adapter)
    }

    /// Routes every SDK callback to the executor waiting for it.
    async fn dispatch(self: Arc<Self>, mut callbacks: mpsc::UnboundedReceiver<SdkEvent>) {
        while let Some(ev) = callbacks.recv().await {
            match ev {
                SdkEvent::Connected(id) => {
                    let _ = self.connections.complete(&id, Ok(())).await;
                }
                SdkEvent::ConnectFailed(id, why) => {
                    let _ = self.connections.complete(&id, Err(ExecutorError::msg(why))).await;
                }
                SdkEvent::Notify(v) => {
                    self.notifications.send(v);
                }
            }
        }
    }

    async fn connect(&self, id: &str) -> Result<(), ExecutorError> {
        let sdk = self.sdk.clone();
        let cmd = SdkCommand::Connect(id.to_string());
        self.connections
            .submit(id.to_string(), move || {
                let _ = sdk.send(cmd);
            })
            .await
    }

    fn notifications(&self) -> callbridge::DataStream<u8> {
        let (start, stop) = (self.sdk.clone(), self.sdk.clone());
        self.notifications.create(
            move || async move {
                start
                    .send(SdkCommand::StartNotify)
                    .map_err(|_| ExecutorError::msg("sdk gone"))
            },
            move || async move {
                stop.send(SdkCommand::StopNotify)
                    .map_err(|_| ExecutorError::msg("sdk gone"))
            },
        )
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let hub = Hub::builder(Config::default()).with_subscribers(subs).build();
    let delegate = hub.callback_slot("sdk-delegate");

    let adapter = Adapter::new(&hub, &delegate)?;
    if let Err(e) = Adapter::new(&hub, &delegate) {
        println!("[main] second adapter refused: {e}");
    }

    adapter.connect("thermo").await?;
    if let Err(e) = adapter.connect("bad-sensor").await {
        println!("[main] connect failed: {e}");
    }

    let readings: Vec<u8> = adapter
        .notifications()
        .take(4)
        .filter_map(|res| async move { res.ok() })
        .collect()
        .await;
    println!("[main] readings {readings:?}");

    tokio::time::sleep(Duration::from_millis(20)).await;
    hub.shutdown().await;
    Ok(())
}
