/*!
# Multi-Chain Client

[`MultiChainClient`] ties the pieces together: the network registry, the connection
pool, one contract binding per chain, the confirmation waiter and the bridge
orchestrator. Every operation is addressed by chain ID; [`MultiChainClient::network`]
gives the same surface addressed by network name.

```no_run
use idrx_multichain::{ClientConfig, MultiChainClient};
use idrx_multichain::registry::BASE_CHAIN_ID;

# async fn run() -> idrx_multichain::Result<()> {
let client = MultiChainClient::connect(ClientConfig::new("0x...")).await?;
let balance = client.balance_of(BASE_CHAIN_ID, client.address()).await?;
println!("{balance} IDRX");
client.close().await;
# Ok(())
# }
```
*/

use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, TransactionReceipt, H256, U256,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::amount::{DecimalAmount, TokenAmount};
use crate::bridge::{BridgeOperation, BridgeOrchestrator, BridgeRequest, PendingMint};
use crate::config::ClientConfig;
use crate::confirmation::{ReceiptSource, TransactionWaiter};
use crate::contract::{
    wallet_from_key, ContractFactory, ContractSet, EvmContractFactory, PlatformFeeInfo,
    SignerProvider, TokenContract, TokenInfo, TransactionSigner, TxHandle,
};
use crate::network::{ConnectionPool, Connector, HttpConnector};
use crate::registry::{NetworkDescriptor, NetworkRegistry};
use crate::telemetry;
use crate::Result;

/// Where a transaction stands, from a single lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Known to the node, not yet included
    Pending,
    Success { block_number: u64, gas_used: U256 },
    Failed { block_number: u64, gas_used: U256 },
    NotFound,
}

/// Summary of one registered network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
    pub block_time: Duration,
    pub contract_address: Option<Address>,
    pub decimals: u8,
    pub testnet: bool,
    pub connected: bool,
}

/// Builds a [`MultiChainClient`], optionally with a custom registry or transport
pub struct ClientBuilder {
    config: ClientConfig,
    registry: Option<NetworkRegistry>,
    connector: Option<Arc<dyn Connector>>,
    contract_factory: Option<Arc<dyn ContractFactory>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            registry: None,
            connector: None,
            contract_factory: None,
        }
    }

    /// Replace the compiled-in network table. Config overrides still apply on top.
    pub fn registry(mut self, registry: NetworkRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn contract_factory(mut self, factory: Arc<dyn ContractFactory>) -> Self {
        self.contract_factory = Some(factory);
        self
    }

    /// Dial every deployed network and bind its contract.
    ///
    /// Fails if any deployed network has no reachable endpoint.
    pub async fn connect(self) -> Result<MultiChainClient> {
        let config = self.config;
        config.validate()?;
        let wallet = wallet_from_key(config.private_key.expose_secret())?;

        let registry = match self.registry {
            Some(registry) => registry.with_overrides(
                config
                    .networks
                    .iter()
                    .map(|(name, descriptor)| (name.clone(), descriptor.clone())),
            )?,
            None => config.registry()?,
        };
        let registry = Arc::new(registry);

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(HttpConnector::new()));
        let factory = self
            .contract_factory
            .unwrap_or_else(|| Arc::new(EvmContractFactory));

        let pool = Arc::new(
            ConnectionPool::connect(&registry, connector.as_ref(), config.pool_config()).await?,
        );

        let contracts = match ContractSet::bind_all(&registry, &pool, factory.as_ref()).await {
            Ok(contracts) => Arc::new(contracts),
            Err(err) => {
                pool.close_all().await;
                return Err(err.into());
            }
        };

        let signers = SignerProvider::new(wallet, registry.clone(), pool.clone());
        let receipts: Arc<dyn ReceiptSource> = pool.clone();
        let waiter = TransactionWaiter::new(receipts, registry.clone());
        let bridge = BridgeOrchestrator::new(
            registry.clone(),
            contracts.clone(),
            signers.clone(),
            waiter.clone(),
        );

        telemetry::record_connected_chains(contracts.len());
        info!(
            address = ?signers.address(),
            chains = ?contracts.chain_ids(),
            "multi-chain client connected"
        );

        Ok(MultiChainClient {
            registry,
            pool,
            contracts,
            signers,
            waiter,
            bridge,
        })
    }
}

/// Token client over every network the contract is deployed on
pub struct MultiChainClient {
    registry: Arc<NetworkRegistry>,
    pool: Arc<ConnectionPool>,
    contracts: Arc<ContractSet>,
    signers: SignerProvider,
    waiter: TransactionWaiter,
    bridge: BridgeOrchestrator,
}

impl std::fmt::Debug for MultiChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiChainClient")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("signers", &self.signers)
            .finish_non_exhaustive()
    }
}

impl MultiChainClient {
    /// Connect over HTTP to the built-in networks plus the config's overrides
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).connect().await
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Signer address
    pub fn address(&self) -> Address {
        self.signers.address()
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn orchestrator(&self) -> &BridgeOrchestrator {
        &self.bridge
    }

    pub fn waiter(&self) -> &TransactionWaiter {
        &self.waiter
    }

    /// Same operations addressed by network name
    pub fn network(&self, name: &str) -> Result<Network<'_>> {
        let descriptor = self.registry.lookup_by_name(name)?;
        Ok(Network {
            client: self,
            chain_id: descriptor.chain_id,
        })
    }

    pub async fn connected_chains(&self) -> Vec<u64> {
        self.pool.connected_chains().await
    }

    pub async fn network_info(&self) -> Vec<NetworkInfo> {
        let connected = self.pool.connected_chains().await;
        self.registry
            .iter()
            .map(|(name, descriptor)| NetworkInfo {
                name: name.to_string(),
                chain_id: descriptor.chain_id,
                block_time: descriptor.block_time,
                contract_address: descriptor.contract_address,
                decimals: descriptor.decimals,
                testnet: descriptor.testnet,
                connected: connected.contains(&descriptor.chain_id),
            })
            .collect()
    }

    /// A signer for `chain_id`, after the node confirmed it serves that chain
    pub async fn signer(&self, chain_id: u64) -> Result<TransactionSigner> {
        Ok(self.signers.for_chain(chain_id).await?)
    }

    pub async fn balance_of(&self, chain_id: u64, account: Address) -> Result<TokenAmount> {
        let units = self.contract(chain_id)?.balance_of(account).await?;
        self.amount(chain_id, units)
    }

    pub async fn total_supply(&self, chain_id: u64) -> Result<TokenAmount> {
        let units = self.contract(chain_id)?.total_supply().await?;
        self.amount(chain_id, units)
    }

    pub async fn token_info(&self, chain_id: u64) -> Result<TokenInfo> {
        Ok(self.contract(chain_id)?.token_info().await?)
    }

    /// Bridge burns recorded on `chain_id` so far
    pub async fn bridge_nonce(&self, chain_id: u64) -> Result<U256> {
        Ok(self.contract(chain_id)?.bridge_nonce_counter().await?)
    }

    /// Whether `chain_id` already minted `(source_chain_id, nonce)`
    pub async fn is_nonce_used(
        &self,
        chain_id: u64,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<bool> {
        Ok(self
            .contract(chain_id)?
            .is_nonce_used(source_chain_id, nonce)
            .await?)
    }

    pub async fn platform_fee_info(&self, chain_id: u64) -> Result<PlatformFeeInfo> {
        Ok(self.contract(chain_id)?.platform_fee_info().await?)
    }

    pub async fn is_blacklisted(&self, chain_id: u64, account: Address) -> Result<bool> {
        Ok(self.contract(chain_id)?.blacklist_status(account).await?)
    }

    pub async fn transfer(
        &self,
        chain_id: u64,
        to: Address,
        amount: DecimalAmount,
    ) -> Result<TxHandle> {
        let (contract, signer, units) = self.prepare_write(chain_id, amount).await?;
        Ok(contract.transfer(&signer, to, units).await?)
    }

    /// Requires the minter role on `chain_id`
    pub async fn mint(
        &self,
        chain_id: u64,
        to: Address,
        amount: DecimalAmount,
    ) -> Result<TxHandle> {
        let (contract, signer, units) = self.prepare_write(chain_id, amount).await?;
        Ok(contract.mint(&signer, to, units).await?)
    }

    pub async fn burn(&self, chain_id: u64, amount: DecimalAmount) -> Result<TxHandle> {
        let (contract, signer, units) = self.prepare_write(chain_id, amount).await?;
        Ok(contract.burn(&signer, units).await?)
    }

    /// Burn for fiat redemption, linked to a bank account reference
    pub async fn burn_with_reference(
        &self,
        chain_id: u64,
        amount: DecimalAmount,
        reference: &str,
    ) -> Result<TxHandle> {
        let (contract, signer, units) = self.prepare_write(chain_id, amount).await?;
        Ok(contract
            .burn_with_reference(&signer, units, reference)
            .await?)
    }

    pub async fn bridge(
        &self,
        request: BridgeRequest,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation> {
        Ok(self.bridge.bridge(request, cancel).await?)
    }

    pub async fn resume_mint(
        &self,
        pending: PendingMint,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation> {
        Ok(self.bridge.resume_mint(pending, cancel).await?)
    }

    pub async fn complete_mint(
        &self,
        request: BridgeRequest,
        nonce: U256,
        burn_tx: TxHandle,
        cancel: &CancellationToken,
    ) -> Result<BridgeOperation> {
        Ok(self
            .bridge
            .complete_mint(request, nonce, burn_tx, cancel)
            .await?)
    }

    pub fn bridge_operation(&self, id: &Uuid) -> Option<BridgeOperation> {
        self.bridge.operation(id)
    }

    pub fn pending_mints(&self) -> Vec<PendingMint> {
        self.bridge.pending_mints()
    }

    pub fn forget_bridge_operation(&self, id: &Uuid) -> Option<BridgeOperation> {
        self.bridge.forget(id)
    }

    /// Drop finished bridge operations that owe no mint
    pub fn prune_bridge_operations(&self) -> usize {
        self.bridge.prune_finished()
    }

    pub async fn wait_for_transaction(
        &self,
        chain_id: u64,
        hash: H256,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt> {
        Ok(self.waiter.wait(chain_id, hash, cancel).await?)
    }

    /// One lookup, no waiting
    pub async fn transaction_status(
        &self,
        chain_id: u64,
        hash: H256,
    ) -> Result<TransactionStatus> {
        let connection = self.pool.acquire(chain_id).await?;

        if let Some(receipt) = connection.transaction_receipt(hash).await? {
            let block_number = receipt.block_number.map(|n| n.as_u64()).unwrap_or_default();
            let gas_used = receipt.gas_used.unwrap_or_default();
            return Ok(if receipt.status == Some(1u64.into()) {
                TransactionStatus::Success {
                    block_number,
                    gas_used,
                }
            } else {
                TransactionStatus::Failed {
                    block_number,
                    gas_used,
                }
            });
        }

        Ok(match connection.transaction(hash).await? {
            Some(_) => TransactionStatus::Pending,
            None => TransactionStatus::NotFound,
        })
    }

    pub async fn estimate_gas(&self, chain_id: u64, tx: &TypedTransaction) -> Result<U256> {
        let connection = self.pool.acquire(chain_id).await?;
        Ok(connection.estimate_gas(tx).await?)
    }

    /// Release every connection. Safe to call more than once.
    pub async fn close(&self) {
        self.pool.close_all().await;
        self.contracts.clear();
    }

    fn descriptor(&self, chain_id: u64) -> Result<&NetworkDescriptor> {
        Ok(self.registry.descriptor(chain_id)?)
    }

    fn contract(&self, chain_id: u64) -> Result<Arc<dyn TokenContract>> {
        self.descriptor(chain_id)?;
        Ok(self.contracts.get(chain_id)?)
    }

    fn amount(&self, chain_id: u64, units: U256) -> Result<TokenAmount> {
        let decimals = self.descriptor(chain_id)?.decimals;
        Ok(TokenAmount::from_base_units(units, decimals)?)
    }

    async fn prepare_write(
        &self,
        chain_id: u64,
        amount: DecimalAmount,
    ) -> Result<(Arc<dyn TokenContract>, TransactionSigner, U256)> {
        let decimals = self.descriptor(chain_id)?.decimals;
        let units = TokenAmount::new(amount, decimals)?.to_exact_base_units()?;
        let contract = self.contract(chain_id)?;
        let signer = self.signers.for_chain(chain_id).await?;
        Ok((contract, signer, units))
    }
}

/// Client operations pinned to one network, selected by name
#[derive(Clone, Copy)]
pub struct Network<'a> {
    client: &'a MultiChainClient,
    chain_id: u64,
}

impl<'a> Network<'a> {
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn descriptor(&self) -> Result<&'a NetworkDescriptor> {
        self.client.descriptor(self.chain_id)
    }

    pub async fn balance_of(&self, account: Address) -> Result<TokenAmount> {
        self.client.balance_of(self.chain_id, account).await
    }

    pub async fn total_supply(&self) -> Result<TokenAmount> {
        self.client.total_supply(self.chain_id).await
    }

    pub async fn token_info(&self) -> Result<TokenInfo> {
        self.client.token_info(self.chain_id).await
    }

    pub async fn bridge_nonce(&self) -> Result<U256> {
        self.client.bridge_nonce(self.chain_id).await
    }

    pub async fn is_nonce_used(&self, source_chain_id: u64, nonce: U256) -> Result<bool> {
        self.client
            .is_nonce_used(self.chain_id, source_chain_id, nonce)
            .await
    }

    pub async fn platform_fee_info(&self) -> Result<PlatformFeeInfo> {
        self.client.platform_fee_info(self.chain_id).await
    }

    pub async fn is_blacklisted(&self, account: Address) -> Result<bool> {
        self.client.is_blacklisted(self.chain_id, account).await
    }

    pub async fn transfer(&self, to: Address, amount: DecimalAmount) -> Result<TxHandle> {
        self.client.transfer(self.chain_id, to, amount).await
    }

    pub async fn mint(&self, to: Address, amount: DecimalAmount) -> Result<TxHandle> {
        self.client.mint(self.chain_id, to, amount).await
    }

    pub async fn burn(&self, amount: DecimalAmount) -> Result<TxHandle> {
        self.client.burn(self.chain_id, amount).await
    }

    pub async fn burn_with_reference(
        &self,
        amount: DecimalAmount,
        reference: &str,
    ) -> Result<TxHandle> {
        self.client
            .burn_with_reference(self.chain_id, amount, reference)
            .await
    }

    pub async fn transaction_status(&self, hash: H256) -> Result<TransactionStatus> {
        self.client.transaction_status(self.chain_id, hash).await
    }

    pub async fn wait_for_transaction(
        &self,
        hash: H256,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt> {
        self.client
            .wait_for_transaction(self.chain_id, hash, cancel)
            .await
    }
}
