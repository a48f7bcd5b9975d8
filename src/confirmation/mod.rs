/*!
# Transaction Confirmation

[`TransactionWaiter`] suspends the caller until a submitted transaction is included
(success or revert), its deadline passes, or the caller cancels.

Timing comes from the chain's nominal block time: the deadline is ten blocks, never
less than a minute, and the receipt is polled twice per block. Polling is the only
cadence; between ticks the task sleeps on the runtime timer.
*/

mod error;
mod source;

pub use error::ConfirmationError;
pub use source::ReceiptSource;

use ethers::types::{TransactionReceipt, H256, U64};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::NetworkRegistry;
use crate::telemetry;

/// Deadline and poll cadence for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub deadline: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    /// Blocks to wait before giving up
    pub const DEADLINE_BLOCKS: u32 = 10;
    pub const MIN_DEADLINE: Duration = Duration::from_secs(60);
    /// Floor for chains that report a zero block time
    pub const MIN_INTERVAL: Duration = Duration::from_millis(250);

    pub fn for_block_time(block_time: Duration) -> Self {
        Self {
            deadline: (block_time * Self::DEADLINE_BLOCKS).max(Self::MIN_DEADLINE),
            interval: (block_time / 2).max(Self::MIN_INTERVAL),
        }
    }
}

/// Outcome of a single receipt lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationState {
    Pending,
    Confirmed(Box<TransactionReceipt>),
    Reverted(Box<TransactionReceipt>),
}

impl ConfirmationState {
    /// Classify a receipt lookup.
    ///
    /// Only an explicit success status (EIP-658) confirms. A receipt without a
    /// status field (pre-Byzantium, state root only) carries no outcome and is
    /// treated as reverted, so a bridge step never advances on an unknown result.
    pub fn from_receipt(receipt: Option<TransactionReceipt>) -> Self {
        match receipt {
            None => ConfirmationState::Pending,
            Some(receipt) if receipt.status == Some(U64::from(1)) => {
                ConfirmationState::Confirmed(Box::new(receipt))
            }
            Some(receipt) => ConfirmationState::Reverted(Box::new(receipt)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Pending)
    }
}

/// Polls a [`ReceiptSource`] until a transaction reaches a terminal state
#[derive(Clone)]
pub struct TransactionWaiter {
    source: Arc<dyn ReceiptSource>,
    registry: Arc<NetworkRegistry>,
}

impl TransactionWaiter {
    pub fn new(source: Arc<dyn ReceiptSource>, registry: Arc<NetworkRegistry>) -> Self {
        Self { source, registry }
    }

    /// Policy derived from the chain's block time
    pub fn policy_for(&self, chain_id: u64) -> Result<WaitPolicy, ConfirmationError> {
        self.registry
            .descriptor(chain_id)
            .map(|descriptor| WaitPolicy::for_block_time(descriptor.block_time))
            .map_err(|_| ConfirmationError::ChainNotSupported { chain_id })
    }

    /// Wait for `hash` on `chain_id` using the chain's policy.
    ///
    /// Returns the receipt on success. A failed receipt, the deadline and
    /// cancellation are reported as distinct errors.
    pub async fn wait(
        &self,
        chain_id: u64,
        hash: H256,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ConfirmationError> {
        let policy = self.policy_for(chain_id)?;
        self.wait_with_policy(chain_id, hash, policy, cancel).await
    }

    /// Whether `hash` is mined or pending on `chain_id`; `false` once a node has
    /// dropped it
    pub async fn is_known(&self, chain_id: u64, hash: H256) -> Result<bool, ConfirmationError> {
        self.source
            .is_known(chain_id, hash)
            .await
            .map_err(|source| ConfirmationError::Unavailable {
                chain_id,
                hash,
                source,
            })
    }

    pub async fn wait_with_policy(
        &self,
        chain_id: u64,
        hash: H256,
        policy: WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ConfirmationError> {
        let started = Instant::now();
        let deadline = sleep(policy.deadline);
        tokio::pin!(deadline);

        let mut ticker = interval_at(started + policy.interval, policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(chain_id, tx_hash = ?hash, ?policy, "waiting for confirmation");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    telemetry::record_confirmation(chain_id, "cancelled", started.elapsed());
                    info!(chain_id, tx_hash = ?hash, "confirmation wait cancelled");
                    return Err(ConfirmationError::Cancelled { chain_id, hash });
                }
                _ = &mut deadline => {
                    telemetry::record_confirmation(chain_id, "timed_out", started.elapsed());
                    warn!(chain_id, tx_hash = ?hash, waited = ?policy.deadline, "confirmation timed out");
                    return Err(ConfirmationError::TimedOut {
                        chain_id,
                        hash,
                        waited: policy.deadline,
                    });
                }
                _ = ticker.tick() => {}
            }

            let lookup = tokio::select! {
                biased;
                _ = cancel.cancelled() => continue,
                _ = &mut deadline => continue,
                lookup = self.source.receipt(chain_id, hash) => lookup,
            };

            let receipt = match lookup {
                Ok(receipt) => receipt,
                Err(err) if err.is_retryable() => {
                    // The next tick tries again, possibly on another endpoint
                    debug!(chain_id, tx_hash = ?hash, error = %err, "receipt lookup failed");
                    continue;
                }
                Err(err) => {
                    telemetry::record_confirmation(chain_id, "unavailable", started.elapsed());
                    warn!(chain_id, tx_hash = ?hash, error = %err, "receipt lookup unavailable");
                    return Err(ConfirmationError::Unavailable {
                        chain_id,
                        hash,
                        source: err,
                    });
                }
            };

            match ConfirmationState::from_receipt(receipt) {
                ConfirmationState::Pending => {}
                ConfirmationState::Confirmed(receipt) => {
                    telemetry::record_confirmation(chain_id, "confirmed", started.elapsed());
                    info!(
                        chain_id,
                        tx_hash = ?hash,
                        block = ?receipt.block_number,
                        "transaction confirmed"
                    );
                    return Ok(*receipt);
                }
                ConfirmationState::Reverted(receipt) => {
                    telemetry::record_confirmation(chain_id, "reverted", started.elapsed());
                    warn!(
                        chain_id,
                        tx_hash = ?hash,
                        block = ?receipt.block_number,
                        "transaction reverted"
                    );
                    return Err(ConfirmationError::Reverted {
                        chain_id,
                        hash,
                        block_number: receipt.block_number.map(|n| n.as_u64()),
                        receipt,
                    });
                }
            }
        }
    }
}
