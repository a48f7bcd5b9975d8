use std::time::Duration;
use thiserror::Error;

/// Connection-level errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The chain has no connection set (unknown, undeployed, or never dialed)
    #[error("chain {chain_id} is not connected")]
    ChainNotConnected { chain_id: u64 },

    /// Every held connection failed its liveness probe
    #[error("chain {chain_id}: no available connection, {attempted} endpoint probe(s) failed")]
    NoAvailableConnection { chain_id: u64, attempted: usize },

    /// Initialization could not reach a single endpoint of a deployed network
    #[error("network {network} (chain {chain_id}): none of {attempted} endpoint(s) answered")]
    NoEndpointsReachable {
        network: String,
        chain_id: u64,
        attempted: usize,
    },

    /// Endpoint URI could not be turned into a client
    #[error("failed to dial {endpoint}: {message}")]
    DialFailed { endpoint: String, message: String },

    /// JSON-RPC call failed
    #[error("{endpoint}: {method} failed: {message}")]
    Rpc {
        endpoint: String,
        method: &'static str,
        message: String,
    },

    /// JSON-RPC call exceeded its deadline
    #[error("{endpoint}: {method} timed out after {after:?}")]
    Timeout {
        endpoint: String,
        method: &'static str,
        after: Duration,
    },

    /// The pool was closed; the connection must not be used
    #[error("connection pool is closed")]
    PoolClosed,
}

impl NetworkError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::NoAvailableConnection { .. }
                | NetworkError::Rpc { .. }
                | NetworkError::Timeout { .. }
        )
    }
}
