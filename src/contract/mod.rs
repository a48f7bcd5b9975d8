/*!
# Token Contract Binding

One typed handle per chain for the deployed token contract, bound at startup to the
first endpoint that connected for that chain.

- [`TokenContract`] is the call surface shared by every chain: reads, signed writes,
  and the bridge burn/mint pair.
- [`TransactionSigner`] carries the wallet after the node confirmed the chain ID, so a
  signer for chain X can never be used against a node on chain Y.
- [`EvmContractFactory`] binds ethers-generated contracts; tests bind in-memory fakes
  through the same [`ContractFactory`] seam.

Writes simulate the call first so a revert reason, including a missing minter role,
comes back as [`ContractError::Reverted`] / [`ContractError::Unauthorized`] before any
gas is spent.
*/

pub mod abi;
pub mod binding;
pub mod error;
pub mod evm;
pub mod signer;

pub use binding::{ContractFactory, PlatformFeeInfo, TokenContract, TokenInfo, TxHandle};
pub use error::ContractError;
pub use evm::{EvmContractFactory, EvmTokenContract};
pub use signer::{wallet_from_key, SignerProvider, TransactionSigner};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::network::ConnectionPool;
use crate::registry::NetworkRegistry;

/// Chain ID to bound contract. Keys are fixed once binding completes.
#[derive(Default)]
pub struct ContractSet {
    contracts: RwLock<HashMap<u64, Arc<dyn TokenContract>>>,
}

impl ContractSet {
    /// Bind one contract per connected chain, on that chain's primary connection
    pub async fn bind_all(
        registry: &NetworkRegistry,
        pool: &ConnectionPool,
        factory: &dyn ContractFactory,
    ) -> Result<Self, ContractError> {
        let mut contracts = HashMap::new();

        for chain_id in pool.connected_chains().await {
            let descriptor = registry
                .descriptor(chain_id)
                .map_err(|_| ContractError::NotDeployed { chain_id })?;
            let connection =
                pool.primary(chain_id)
                    .await
                    .map_err(|source| ContractError::Network {
                        chain_id,
                        operation: "bind",
                        source,
                    })?;
            let contract = factory.bind(descriptor, &connection).await?;
            contracts.insert(chain_id, contract);
        }

        info!(contracts = contracts.len(), "token contracts bound");
        Ok(Self {
            contracts: RwLock::new(contracts),
        })
    }

    pub fn get(&self, chain_id: u64) -> Result<Arc<dyn TokenContract>, ContractError> {
        self.contracts
            .read()
            .get(&chain_id)
            .cloned()
            .ok_or(ContractError::NotBound { chain_id })
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.contracts.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }

    /// Drop every handle
    pub fn clear(&self) {
        self.contracts.write().clear();
    }
}
