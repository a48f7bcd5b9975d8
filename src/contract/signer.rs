use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use std::fmt;
use std::sync::Arc;

use super::ContractError;
use crate::network::{ConnectionPool, PooledConnection};
use crate::registry::{GasPolicy, NetworkDescriptor, NetworkRegistry};

/// Parse a hex private key, with or without a `0x` prefix
pub fn wallet_from_key(key: &str) -> Result<LocalWallet, ContractError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>()
        .map_err(|err| ContractError::InvalidKey(err.to_string()))
}

/// A wallet bound to one chain whose ID was confirmed by the node itself
#[derive(Clone)]
pub struct TransactionSigner {
    wallet: LocalWallet,
    chain_id: u64,
    gas: GasPolicy,
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("address", &self.wallet.address())
            .field("chain_id", &self.chain_id)
            .field("gas", &self.gas)
            .finish()
    }
}

impl TransactionSigner {
    /// Bind `wallet` to the descriptor's chain after asking `connection` which
    /// chain it actually serves.
    pub async fn bind(
        wallet: &LocalWallet,
        descriptor: &NetworkDescriptor,
        connection: &PooledConnection,
    ) -> Result<Self, ContractError> {
        let actual =
            connection
                .remote_chain_id()
                .await
                .map_err(|source| ContractError::Network {
                    chain_id: descriptor.chain_id,
                    operation: "bind_signer",
                    source,
                })?;

        if actual != descriptor.chain_id {
            return Err(ContractError::ChainIdMismatch {
                expected: descriptor.chain_id,
                actual,
            });
        }

        Ok(Self {
            wallet: wallet.clone().with_chain_id(actual),
            chain_id: actual,
            gas: descriptor.gas,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn gas_policy(&self) -> GasPolicy {
        self.gas
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    /// The node's suggested price, capped by the network maximum if one is set
    pub fn cap_gas_price(&self, suggested: U256) -> U256 {
        match self.gas.max_gas_price {
            Some(max) => suggested.min(U256::from(max)),
            None => suggested,
        }
    }

    /// Reject use against a contract on a different chain
    pub fn ensure_chain(&self, chain_id: u64) -> Result<(), ContractError> {
        if self.chain_id == chain_id {
            Ok(())
        } else {
            Err(ContractError::ChainIdMismatch {
                expected: chain_id,
                actual: self.chain_id,
            })
        }
    }
}

/// Binds the client wallet to a chain on demand, over a probed connection
#[derive(Clone)]
pub struct SignerProvider {
    wallet: LocalWallet,
    registry: Arc<NetworkRegistry>,
    pool: Arc<ConnectionPool>,
}

impl fmt::Debug for SignerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerProvider")
            .field("address", &self.wallet.address())
            .finish()
    }
}

impl SignerProvider {
    pub fn new(
        wallet: LocalWallet,
        registry: Arc<NetworkRegistry>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            wallet,
            registry,
            pool,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// A signer for `chain_id`, verified against the node's reported chain ID
    pub async fn for_chain(&self, chain_id: u64) -> Result<TransactionSigner, ContractError> {
        let descriptor = self
            .registry
            .descriptor(chain_id)
            .map_err(|_| ContractError::NotBound { chain_id })?;
        let connection = self
            .pool
            .acquire(chain_id)
            .await
            .map_err(|source| ContractError::Network {
                chain_id,
                operation: "bind_signer",
                source,
            })?;
        TransactionSigner::bind(&self.wallet, descriptor, &connection).await
    }
}
