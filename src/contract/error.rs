use thiserror::Error;

use crate::network::NetworkError;

/// Contract binding errors. Every variant names the chain it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("chain {chain_id}: token contract is not deployed")]
    NotDeployed { chain_id: u64 },

    #[error("chain {chain_id}: no contract bound")]
    NotBound { chain_id: u64 },

    /// Signer bound to one chain while the node reports another
    #[error("chain ID mismatch: signer expects chain {expected}, node reports chain {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    /// The contract rejected the caller for lack of a role
    #[error("chain {chain_id}: {operation} unauthorized: {reason}")]
    Unauthorized {
        chain_id: u64,
        operation: &'static str,
        reason: String,
    },

    /// The contract reverted the call
    #[error("chain {chain_id}: {operation} reverted: {reason}")]
    Reverted {
        chain_id: u64,
        operation: &'static str,
        reason: String,
    },

    #[error("chain {chain_id}: {operation} failed: {source}")]
    Network {
        chain_id: u64,
        operation: &'static str,
        #[source]
        source: NetworkError,
    },

    /// Encoding, signing or node-side failure that is not a revert
    #[error("chain {chain_id}: {operation} failed: {message}")]
    Call {
        chain_id: u64,
        operation: &'static str,
        message: String,
    },

    #[error("invalid signer key: {0}")]
    InvalidKey(String),
}

impl ContractError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ContractError::Network { source, .. } => source.is_retryable(),
            ContractError::Call { .. } => true,
            _ => false,
        }
    }

    /// Chain the error came from, when it is tied to one
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            ContractError::NotDeployed { chain_id }
            | ContractError::NotBound { chain_id }
            | ContractError::Unauthorized { chain_id, .. }
            | ContractError::Reverted { chain_id, .. }
            | ContractError::Network { chain_id, .. }
            | ContractError::Call { chain_id, .. } => Some(*chain_id),
            ContractError::ChainIdMismatch { expected, .. } => Some(*expected),
            ContractError::InvalidKey(_) => None,
        }
    }

    /// Map a decoded revert reason, splitting out access-control rejections
    pub fn from_revert(chain_id: u64, operation: &'static str, reason: String) -> Self {
        const ROLE_MARKERS: [&str; 3] = ["AccessControl", "missing role", "Unauthorized"];

        if ROLE_MARKERS.iter().any(|marker| reason.contains(marker)) {
            ContractError::Unauthorized {
                chain_id,
                operation,
                reason,
            }
        } else {
            ContractError::Reverted {
                chain_id,
                operation,
                reason,
            }
        }
    }
}
