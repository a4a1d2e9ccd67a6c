//! # Example: scan_stream
//!
//! Demonstrates a [`DataStreamBridge`] turning scan-result callbacks into a
//! `Stream`.
//!
//! Shows how to:
//! - Start scanning lazily when the stream is first polled (`on_start`).
//! - Push callback values with `send`.
//! - Stop scanning exactly once when the consumer stops listening (`on_termination`).
//! - Reject a second concurrent scan with `OperationInProgress`.
//!
//! ## Run
//! ```bash
//! cargo run --example scan_stream
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use callbridge::DataStreamBridge;
use futures::StreamExt;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let scans: DataStreamBridge<String> = DataStreamBridge::new();
    let scanning = Arc::new(AtomicBool::new(false));

    let (start_flag, stop_flag) = (Arc::clone(&scanning), Arc::clone(&scanning));
    let stream = scans.create(
        move || async move {
            println!("[radio] scan started");
            start_flag.store(true, Ordering::SeqCst);
            Ok(())
        },
        move || async move {
            println!("[radio] scan stopped");
            stop_flag.store(false, Ordering::SeqCst);
            Ok(())
        },
    );

    // Advertisement callbacks from the radio.
    let radio = scans.clone();
    let flag = Arc::clone(&scanning);
    tokio::spawn(async move {
        let mut n = 0;
        loop {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if flag.load(Ordering::SeqCst) {
                n += 1;
                radio.send(format!("peripheral-{n}"));
            }
        }
    });

    // A second scan while the first is running is refused.
    let mut rejected = scans.create(|| async { Ok(()) }, || async { Ok(()) });
    if let Some(Err(e)) = rejected.next().await {
        println!("[main] second scan refused: {e}");
    }

    // Take three results, then drop the stream: the scan stops by itself.
    let found: Vec<String> = stream
        .take(3)
        .filter_map(|res| async move { res.ok() })
        .collect()
        .await;
    println!("[main] found {found:?}");

    tokio::time::sleep(Duration::from_millis(10)).await;
    println!("[main] still scanning: {}", scanning.load(Ordering::SeqCst));
}
