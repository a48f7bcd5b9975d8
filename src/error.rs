/*!
# Error Module

Crate-level error type. Each area keeps its own `thiserror` enum
([`RegistryError`], [`NetworkError`], [`ContractError`], [`ConfirmationError`],
[`AmountError`], [`BridgeError`], [`ConfigError`]); [`Error`] wraps them so the client
facade can return one type, and [`Error::is_retryable`] tells a caller whether trying
the same call again can succeed.

Bridge errors are never flattened: a [`BridgeError::PartialBridgeFailure`] keeps the
nonce and burn transaction needed to resume.
*/

use thiserror::Error;

use crate::amount::AmountError;
use crate::bridge::BridgeError;
use crate::config::ConfigError;
use crate::confirmation::ConfirmationError;
use crate::contract::ContractError;
use crate::network::NetworkError;
use crate::registry::RegistryError;

/// Core client error type
#[derive(Error, Debug)]
pub enum Error {
    /// Registry lookup or validation error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Connection error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Contract call error
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// Confirmation wait error
    #[error("Confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    /// Amount parsing or conversion error
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    /// Bridge operation error
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Registry(_) => false,
            Error::Network(e) => e.is_retryable(),
            Error::Contract(e) => e.is_retryable(),
            Error::Confirmation(e) => e.is_retryable(),
            Error::Amount(_) => false,
            Error::Bridge(e) => e.is_retryable(),
            Error::Config(_) => false,
        }
    }

    /// The resume point of a bridge that burned but did not mint
    pub fn pending_mint(&self) -> Option<&crate::bridge::PendingMint> {
        match self {
            Error::Bridge(e) => e.pending_mint(),
            _ => None,
        }
    }
}
