use ethers::types::{TransactionReceipt, H256};
use std::time::Duration;
use thiserror::Error;

use crate::network::NetworkError;

/// Terminal failures of a confirmation wait
#[derive(Debug, Error, Clone)]
pub enum ConfirmationError {
    /// The registry does not know the chain, so no timing can be derived
    #[error("chain {chain_id} is not supported")]
    ChainNotSupported { chain_id: u64 },

    /// Included, with a failure status
    #[error("chain {chain_id}: transaction {hash:?} reverted in block {block_number:?}")]
    Reverted {
        chain_id: u64,
        hash: H256,
        block_number: Option<u64>,
        receipt: Box<TransactionReceipt>,
    },

    /// No receipt before the deadline
    #[error("chain {chain_id}: transaction {hash:?} not confirmed within {waited:?}")]
    TimedOut {
        chain_id: u64,
        hash: H256,
        waited: Duration,
    },

    /// The caller's cancellation token fired first
    #[error("chain {chain_id}: wait for transaction {hash:?} was cancelled")]
    Cancelled { chain_id: u64, hash: H256 },

    /// Receipts can no longer be looked up (pool closed, chain not connected)
    #[error("chain {chain_id}: cannot look up transaction {hash:?}: {source}")]
    Unavailable {
        chain_id: u64,
        hash: H256,
        #[source]
        source: NetworkError,
    },
}

impl ConfirmationError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfirmationError::TimedOut { .. })
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            ConfirmationError::ChainNotSupported { chain_id }
            | ConfirmationError::Reverted { chain_id, .. }
            | ConfirmationError::TimedOut { chain_id, .. }
            | ConfirmationError::Cancelled { chain_id, .. }
            | ConfirmationError::Unavailable { chain_id, .. } => *chain_id,
        }
    }
}
