use ethers::contract::{parse_log, EthEvent};
use ethers::types::{Address, TransactionReceipt, U256};
use thiserror::Error;

use crate::contract::abi::BurnBridgeFilter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceError {
    #[error("receipt carries no BurnBridge event from {contract:?}")]
    NoBurnEvent { contract: Address },

    #[error("receipt carries {count} BurnBridge events from {contract:?}")]
    AmbiguousBurnEvents { contract: Address, count: usize },

    #[error("BurnBridge event could not be decoded: {0}")]
    Undecodable(String),

    #[error("BurnBridge event targets chain {actual}, expected {expected}")]
    DestinationMismatch { expected: u64, actual: U256 },
}

/// Find the single `BurnBridge` event emitted by `contract` in `receipt`.
///
/// The event must name `destination_chain_id`. No fallback value is ever produced.
pub fn extract_burn_event(
    receipt: &TransactionReceipt,
    contract: Address,
    destination_chain_id: u64,
) -> Result<BurnBridgeFilter, NonceError> {
    let topic = BurnBridgeFilter::signature();
    let mut events = receipt
        .logs
        .iter()
        .filter(|log| log.address == contract && log.topics.first() == Some(&topic));

    let log = events.next().ok_or(NonceError::NoBurnEvent { contract })?;
    let extra = events.count();
    if extra > 0 {
        return Err(NonceError::AmbiguousBurnEvents {
            contract,
            count: extra + 1,
        });
    }

    let event: BurnBridgeFilter =
        parse_log(log.clone()).map_err(|err| NonceError::Undecodable(err.to_string()))?;

    if event.to_chain_id != U256::from(destination_chain_id) {
        return Err(NonceError::DestinationMismatch {
            expected: destination_chain_id,
            actual: event.to_chain_id,
        });
    }

    Ok(event)
}

/// The bridge nonce assigned to the burn in `receipt`
pub fn extract_bridge_nonce(
    receipt: &TransactionReceipt,
    contract: Address,
    destination_chain_id: u64,
) -> Result<U256, NonceError> {
    extract_burn_event(receipt, contract, destination_chain_id).map(|event| event.bridge_nonce)
}
