//! Logging setup and the metric names recorded by the client.
//!
//! Metrics go through the `metrics` facade; nothing is exported unless the host
//! application installs a recorder.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

pub(crate) fn record_connected_chains(count: usize) {
    gauge!("idrx.pool.connected_chains", count as f64);
}

pub(crate) fn record_dial_failure(chain_id: u64) {
    counter!("idrx.pool.dial_failures", 1, "chain_id" => chain_id.to_string());
}

pub(crate) fn record_failover(chain_id: u64) {
    counter!("idrx.pool.failovers", 1, "chain_id" => chain_id.to_string());
}

pub(crate) fn record_pool_exhausted(chain_id: u64) {
    counter!("idrx.pool.exhausted", 1, "chain_id" => chain_id.to_string());
}

pub(crate) fn record_transaction_sent(chain_id: u64, operation: &'static str) {
    counter!("idrx.tx.sent", 1,
        "chain_id" => chain_id.to_string(),
        "operation" => operation
    );
}

pub(crate) fn record_confirmation(chain_id: u64, outcome: &'static str, waited: Duration) {
    counter!("idrx.tx.confirmations", 1,
        "chain_id" => chain_id.to_string(),
        "outcome" => outcome
    );
    histogram!("idrx.tx.confirmation.duration",
        waited.as_secs_f64(),
        "chain_id" => chain_id.to_string()
    );
}

pub(crate) fn record_bridge_outcome(source_chain_id: u64, destination_chain_id: u64, outcome: &'static str) {
    counter!("idrx.bridge.operations", 1,
        "source_chain_id" => source_chain_id.to_string(),
        "destination_chain_id" => destination_chain_id.to_string(),
        "outcome" => outcome
    );
}
