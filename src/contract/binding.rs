use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{ContractError, TransactionSigner};
use crate::network::PooledConnection;
use crate::registry::NetworkDescriptor;

/// A submitted, not yet confirmed, transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub chain_id: u64,
    pub hash: H256,
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.hash, self.chain_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    /// Precision reported by the contract itself
    pub decimals: u8,
}

/// Bridge fee configuration. Fees are in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFeeInfo {
    pub recipient: Address,
    pub burn_bridge_fee: u64,
    pub mint_bridge_fee: u64,
}

/// The token contract on one chain.
///
/// Reads are plain calls. Writes need a [`TransactionSigner`] bound to the same
/// chain and return as soon as the node accepted the transaction.
#[async_trait]
pub trait TokenContract: Send + Sync {
    fn chain_id(&self) -> u64;

    fn address(&self) -> Address;

    async fn balance_of(&self, account: Address) -> Result<U256, ContractError>;

    async fn total_supply(&self) -> Result<U256, ContractError>;

    async fn token_info(&self) -> Result<TokenInfo, ContractError>;

    /// Number of bridge burns recorded so far on this chain
    async fn bridge_nonce_counter(&self) -> Result<U256, ContractError>;

    /// Whether `(source_chain_id, nonce)` was already minted on this chain
    async fn is_nonce_used(&self, source_chain_id: u64, nonce: U256)
        -> Result<bool, ContractError>;

    async fn blacklist_status(&self, account: Address) -> Result<bool, ContractError>;

    async fn platform_fee_info(&self) -> Result<PlatformFeeInfo, ContractError>;

    async fn transfer(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHandle, ContractError>;

    /// Requires the minter role; a missing role surfaces as `Unauthorized`
    async fn mint(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHandle, ContractError>;

    async fn burn(&self, signer: &TransactionSigner, amount: U256)
        -> Result<TxHandle, ContractError>;

    /// Burn linked to a fiat redemption reference (bank account number)
    async fn burn_with_reference(
        &self,
        signer: &TransactionSigner,
        amount: U256,
        reference: &str,
    ) -> Result<TxHandle, ContractError>;

    async fn burn_for_bridge(
        &self,
        signer: &TransactionSigner,
        amount: U256,
        destination_chain_id: u64,
    ) -> Result<TxHandle, ContractError>;

    async fn mint_for_bridge(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<TxHandle, ContractError>;
}

/// Binds a [`TokenContract`] to a pooled connection
#[async_trait]
pub trait ContractFactory: Send + Sync {
    async fn bind(
        &self,
        descriptor: &NetworkDescriptor,
        connection: &PooledConnection,
    ) -> Result<Arc<dyn TokenContract>, ContractError>;
}
