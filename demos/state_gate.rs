//! # Example: state_gate
//!
//! Demonstrates waiting for an external state change with `broadcast`.
//!
//! Several tasks wait for the adapter to become powered on. Each waiter submits
//! a job with a no-op trigger; when the power-state callback fires, a single
//! `broadcast` resolves every waiter with the same value.
//!
//! ## Flow
//! ```text
//! waiter 1 ──submit(noop)──┐
//! waiter 2 ──submit(noop)──┼──► SerialExecutor ◄── broadcast(Ok(PoweredOn)) ◄── state callback
//! waiter 3 ──submit(noop)──┘
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example state_gate
//! ```

use std::time::Duration;

use callbridge::SerialExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterState {
    PoweredOn,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let gate: SerialExecutor<AdapterState> = SerialExecutor::new();

    let mut waiters = Vec::new();
    for id in 1..=3 {
        let gate = gate.clone();
        waiters.push(tokio::spawn(async move {
            let state = gate.submit(|| {}).await;
            println!("[waiter {id}] adapter is {state:?}");
        }));
    }

    // Let every waiter enqueue before the adapter powers on.
    while gate.pending().await < 3 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let resolved = gate.broadcast(Ok(AdapterState::PoweredOn)).await;
    println!("[adapter] powered on, released {resolved} waiters");

    for w in waiters {
        let _ = w.await;
    }
}
