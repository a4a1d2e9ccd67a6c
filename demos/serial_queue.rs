//! # Example: serial_queue
//!
//! Demonstrates a single [`SerialExecutor`] serializing requests to a device
//! that answers through a callback.
//!
//! Shows how to:
//! - Queue several requests while one is in flight.
//! - Resolve the executing request from a callback with `complete`.
//! - Observe that triggers run strictly one at a time, in submission order.
//!
//! ## Flow
//! ```text
//! submit(read A) ──► trigger A ──► device ──(20ms)──► callback ──► complete(Ok(A))
//! submit(read B) ──► queued ─────────────────────────────────────► trigger B ──► ...
//! submit(read C) ──► queued ───────────────────────────────────────────────────► ...
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example serial_queue
//! ```

use std::time::Duration;

use callbridge::SerialExecutor;
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let exec: SerialExecutor<String> = SerialExecutor::new();

    // Requests the simulated device has accepted.
    let (device_tx, mut device_rx) = mpsc::unbounded_channel::<&'static str>();

    // Device: answers each request after a short delay, via the executor callback.
    let callback = exec.clone();
    let device = tokio::spawn(async move {
        while let Some(register) = device_rx.recv().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
            println!("[device] answering read of {register}");
            if let Err(e) = callback.complete(Ok(format!("{register}=0x2a"))).await {
                println!("[device] stray answer: {e}");
            }
        }
    });

    let mut handles = Vec::new();
    for register in ["battery", "firmware", "serial"] {
        let tx = device_tx.clone();
        let handle = exec
            .enqueue(move || {
                println!("[trigger] read {register}");
                let _ = tx.send(register);
            })
            .await;
        handles.push(handle);
    }
    println!("[main] queued {} reads", exec.pending().await);

    for handle in handles {
        println!("[main] got {}", handle.await?);
    }

    drop(device_tx);
    let _ = device.await;
    Ok(())
}
