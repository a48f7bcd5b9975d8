use ethers::types::U256;
use thiserror::Error;

use super::nonce::NonceError;
use super::PendingMint;
use crate::amount::AmountError;
use crate::confirmation::ConfirmationError;
use crate::contract::{ContractError, TxHandle};

/// Why a mint after a confirmed burn did not complete
#[derive(Debug, Error, Clone)]
pub enum MintFailure {
    /// The used-nonce check could not be answered; never mint blind
    #[error("nonce check failed: {0}")]
    NonceCheck(#[source] ContractError),

    /// Signing or submission was rejected
    #[error("mint rejected: {0}")]
    Rejected(#[source] ContractError),

    /// Included with a failure status
    #[error("mint {mint_tx} reverted")]
    Reverted { mint_tx: TxHandle },

    /// Submitted, but not confirmed (deadline or cancellation)
    #[error("mint {mint_tx} not confirmed: {source}")]
    Unconfirmed {
        mint_tx: TxHandle,
        #[source]
        source: ConfirmationError,
    },

    /// Cancelled before the mint was submitted
    #[error("cancelled before mint was submitted")]
    Cancelled,
}

/// Bridge operation errors.
///
/// Everything before [`BridgeError::PartialBridgeFailure`] means no value moved.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    #[error("chain {0} is not supported")]
    ChainNotSupported(u64),

    #[error("source and destination are both chain {0}")]
    SameChain(u64),

    #[error("bridge amount must be non-zero")]
    ZeroAmount,

    #[error("amount not representable on chain {chain_id}: {source}")]
    InvalidAmount {
        chain_id: u64,
        #[source]
        source: AmountError,
    },

    /// The chain has no usable contract binding
    #[error("chain {chain_id} unavailable: {source}")]
    Unavailable {
        chain_id: u64,
        #[source]
        source: ContractError,
    },

    #[error("cancelled before burn was submitted")]
    Cancelled,

    #[error("burn on chain {chain_id} failed: {source}")]
    BurnFailed {
        chain_id: u64,
        #[source]
        source: ContractError,
    },

    #[error("burn {burn_tx} reverted")]
    BurnReverted { burn_tx: TxHandle },

    /// Submitted, but not seen on chain before the deadline, cancellation or loss
    /// of the pool. The burn may still land; check `burn_tx` before burning again.
    #[error("burn {burn_tx} not confirmed: {source}")]
    BurnUnconfirmed {
        burn_tx: TxHandle,
        #[source]
        source: ConfirmationError,
    },

    /// Burn confirmed, but its receipt did not yield a nonce
    #[error("burn {burn_tx} confirmed but no bridge nonce could be extracted: {source}")]
    NonceExtractionFailed {
        burn_tx: TxHandle,
        #[source]
        source: NonceError,
    },

    /// The destination already minted this `(source chain, nonce)` pair
    #[error("nonce {nonce} from chain {source_chain_id} already used on chain {destination_chain_id}")]
    NonceAlreadyUsed {
        source_chain_id: u64,
        destination_chain_id: u64,
        nonce: U256,
    },

    /// Burned on the source, not yet minted on the destination
    #[error(
        "burn {} confirmed with nonce {}, mint on chain {} pending: {cause}",
        pending.burn_tx, pending.nonce, pending.request.destination_chain_id
    )]
    PartialBridgeFailure {
        pending: Box<PendingMint>,
        #[source]
        cause: MintFailure,
    },
}

impl BridgeError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::BurnFailed { source, .. } => source.is_retryable(),
            BridgeError::BurnUnconfirmed { source, .. } => source.is_retryable(),
            BridgeError::PartialBridgeFailure { .. } => true,
            BridgeError::Unavailable { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Resume point when the burn went through but the mint did not
    pub fn pending_mint(&self) -> Option<&PendingMint> {
        match self {
            BridgeError::PartialBridgeFailure { pending, .. } => Some(pending),
            _ => None,
        }
    }
}
