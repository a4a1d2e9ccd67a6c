//! # Example: keyed_registry
//!
//! Demonstrates an [`ExecutorRegistry`] keyed by peripheral id: connections to
//! the same peripheral are serialized, different peripherals proceed in parallel.
//!
//! Shows how to:
//! - Submit work for several keys concurrently.
//! - Route callbacks back with `complete(key, result)`.
//! - Watch idle executors disappear from the registry.
//!
//! ## Run
//! ```bash
//! cargo run --example keyed_registry
//! ```

use std::time::Duration;

use callbridge::ExecutorRegistry;
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let connections: ExecutorRegistry<String, u16> = ExecutorRegistry::new();
    let (radio_tx, mut radio_rx) = mpsc::unbounded_channel::<String>();

    // Radio: reports each connection attempt with an MTU, keyed by peripheral.
    let callbacks = connections.clone();
    let radio = tokio::spawn(async move {
        let mut mtu = 23;
        while let Some(peripheral) = radio_rx.recv().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
            mtu += 10;
            let _ = callbacks.complete(&peripheral, Ok(mtu)).await;
        }
    });

    let mut handles = Vec::new();
    for peripheral in ["heart-rate", "thermo", "heart-rate"] {
        let tx = radio_tx.clone();
        let key = peripheral.to_string();
        let handle = connections
            .enqueue(key.clone(), move || {
                println!("[trigger] connect {key}");
                let _ = tx.send(key);
            })
            .await;
        handles.push((peripheral, handle));
    }

    let mut keys = connections.keys().await;
    keys.sort();
    println!("[main] active keys: {keys:?}");
    println!("[main] heart-rate pending: {}", connections.pending("heart-rate").await);

    for (peripheral, handle) in handles {
        println!("[main] {peripheral} connected, mtu={}", handle.await?);
    }
    println!("[main] registry empty: {}", connections.is_empty().await);

    // Late callback for a peripheral nobody is waiting on.
    match connections.complete("ghost", Ok(0)).await {
        Err(e) => println!("[main] stray callback rejected: {e}"),
        Ok(()) => println!("[main] unexpected match"),
    }

    drop(radio_tx);
    let _ = radio.await;
    Ok(())
}
