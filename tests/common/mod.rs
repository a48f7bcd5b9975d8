//! Synthetic chains shared by the unit and integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::contract::EthEvent;
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Log, Transaction, TransactionReceipt, H256,
    U256,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idrx_multichain::contract::abi::BurnBridgeFilter;
use idrx_multichain::contract::{
    ContractError, ContractFactory, PlatformFeeInfo, TokenContract, TokenInfo, TransactionSigner,
    TxHandle,
};
use idrx_multichain::network::{ChainRpc, ConnectionPool, Connector, NetworkError, PoolConfig};
use idrx_multichain::registry::{GasPolicy, NetworkDescriptor, NetworkRegistry};
use idrx_multichain::{ClientConfig, MultiChainClient};

/// Well-known development key (address 0xf39F...2266)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_A: u64 = 1001;
pub const CHAIN_B: u64 = 1002;
pub const CHAIN_C: u64 = 1003;
pub const CHAIN_UNDEPLOYED: u64 = 1004;

pub const FIRST_BRIDGE_NONCE: u64 = 42;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn address(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn units(value: u64) -> U256 {
    U256::from(value)
}

fn descriptor(
    chain_id: u64,
    name: &str,
    endpoints: &[&str],
    contract: Option<Address>,
    decimals: u8,
) -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id,
        name: name.to_string(),
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        contract_address: contract,
        block_time: Duration::from_secs(2),
        gas: GasPolicy {
            gas_limit: 3_000_000,
            max_gas_price: Some(1_000_000_000),
        },
        decimals,
        testnet: true,
    }
}

/// ChainA and ChainB at 2 decimals, ChainC at 0, plus one network without a contract
pub fn test_registry() -> NetworkRegistry {
    NetworkRegistry::new(vec![
        (
            "ChainA",
            descriptor(
                CHAIN_A,
                "Chain A",
                &["http://a1.test", "http://a2.test"],
                Some(address(0xa1)),
                2,
            ),
        ),
        (
            "ChainB",
            descriptor(
                CHAIN_B,
                "Chain B",
                &["http://b1.test", "http://b2.test"],
                Some(address(0xb1)),
                2,
            ),
        ),
        (
            "ChainC",
            descriptor(CHAIN_C, "Chain C", &["http://c1.test"], Some(address(0xc1)), 0),
        ),
        (
            "Undeployed",
            descriptor(CHAIN_UNDEPLOYED, "Undeployed", &["http://d1.test"], None, 2),
        ),
    ])
    .expect("test registry is consistent")
}

pub fn receipt(hash: H256, success: bool, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(u64::from(success).into()),
        block_number: Some(7u64.into()),
        gas_used: Some(U256::from(21_000u64)),
        logs,
        ..Default::default()
    }
}

/// ABI-encoded `BurnBridge` log as the token contract emits it
pub fn burn_log(
    contract: Address,
    from: Address,
    amount: U256,
    to_chain_id: u64,
    nonce: U256,
) -> Log {
    let data = encode(&[
        Token::Uint(amount),
        Token::Uint(U256::from(to_chain_id)),
        Token::Uint(nonce),
        Token::Uint(U256::zero()),
        Token::Uint(U256::from(1_700_000_000u64)),
    ]);
    Log {
        address: contract,
        topics: vec![BurnBridgeFilter::signature(), H256::from(from)],
        data: data.into(),
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnMode {
    Confirm,
    Revert,
    /// Confirms, but the receipt carries no BurnBridge event
    NoEvent,
    /// Accepted, never mined
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintMode {
    Confirm,
    /// Rejected at submission (simulation revert)
    Reject,
    /// Mined with a failure status
    Revert,
    /// Accepted by the node but never mined until the test settles it
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeMint {
    pub to: Address,
    pub amount: U256,
    pub source_chain_id: u64,
    pub nonce: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeBurn {
    pub from: Address,
    pub amount: U256,
    pub destination_chain_id: u64,
}

struct ChainState {
    balances: HashMap<Address, U256>,
    total_supply: U256,
    receipts: HashMap<H256, TransactionReceipt>,
    pending: HashSet<H256>,
    used_nonces: HashSet<(u64, U256)>,
    next_nonce: U256,
    burn_mode: BurnMode,
    mint_mode: MintMode,
    nonce_check_fails: bool,
    minter: bool,
    burns: Vec<BridgeBurn>,
    mints: Vec<BridgeMint>,
    transfers: Vec<(Address, U256)>,
    tx_counter: u64,
}

/// In-memory chain: the token contract plus the receipts its nodes serve
pub struct FakeChain {
    pub chain_id: u64,
    pub contract: Address,
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new(chain_id: u64, contract: Address) -> Self {
        Self {
            chain_id,
            contract,
            state: Mutex::new(ChainState {
                balances: HashMap::new(),
                total_supply: U256::from(100_000_000u64),
                receipts: HashMap::new(),
                pending: HashSet::new(),
                used_nonces: HashSet::new(),
                next_nonce: U256::from(FIRST_BRIDGE_NONCE),
                burn_mode: BurnMode::Confirm,
                mint_mode: MintMode::Confirm,
                nonce_check_fails: false,
                minter: true,
                burns: Vec::new(),
                mints: Vec::new(),
                transfers: Vec::new(),
                tx_counter: 0,
            }),
        }
    }

    pub fn set_burn_mode(&self, mode: BurnMode) {
        self.state.lock().burn_mode = mode;
    }

    pub fn set_mint_mode(&self, mode: MintMode) {
        self.state.lock().mint_mode = mode;
    }

    pub fn set_nonce_check_fails(&self, fails: bool) {
        self.state.lock().nonce_check_fails = fails;
    }

    pub fn set_minter(&self, minter: bool) {
        self.state.lock().minter = minter;
    }

    pub fn set_balance(&self, account: Address, units: U256) {
        self.state.lock().balances.insert(account, units);
    }

    pub fn mark_nonce_used(&self, source_chain_id: u64, nonce: U256) {
        self.state.lock().used_nonces.insert((source_chain_id, nonce));
    }

    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        self.state
            .lock()
            .receipts
            .insert(receipt.transaction_hash, receipt);
    }

    pub fn insert_pending(&self, hash: H256) {
        self.state.lock().pending.insert(hash);
    }

    /// Mine a pending bridge mint successfully
    pub fn confirm_pending_mint(&self, hash: H256, source_chain_id: u64, nonce: U256) {
        let mut state = self.state.lock();
        state.pending.remove(&hash);
        state.used_nonces.insert((source_chain_id, nonce));
        state.receipts.insert(hash, receipt(hash, true, vec![]));
    }

    /// Forget a pending transaction, as a node evicting it from its mempool
    pub fn drop_pending(&self, hash: H256) {
        self.state.lock().pending.remove(&hash);
    }

    pub fn burns(&self) -> Vec<BridgeBurn> {
        self.state.lock().burns.clone()
    }

    pub fn mints(&self) -> Vec<BridgeMint> {
        self.state.lock().mints.clone()
    }

    pub fn transfers(&self) -> Vec<(Address, U256)> {
        self.state.lock().transfers.clone()
    }

    pub fn receipt(&self, hash: H256) -> Option<TransactionReceipt> {
        self.state.lock().receipts.get(&hash).cloned()
    }

    fn is_known(&self, hash: H256) -> bool {
        let state = self.state.lock();
        state.pending.contains(&hash) || state.receipts.contains_key(&hash)
    }

    fn next_hash(&self, state: &mut ChainState) -> H256 {
        state.tx_counter += 1;
        H256::from_low_u64_be((self.chain_id << 32) | state.tx_counter)
    }

    fn handle(&self, hash: H256) -> TxHandle {
        TxHandle {
            chain_id: self.chain_id,
            hash,
        }
    }

    fn confirm_plain(&self, signer: &TransactionSigner) -> Result<TxHandle, ContractError> {
        signer.ensure_chain(self.chain_id)?;
        let mut state = self.state.lock();
        let hash = self.next_hash(&mut state);
        state.receipts.insert(hash, receipt(hash, true, vec![]));
        Ok(self.handle(hash))
    }
}

#[async_trait]
impl TokenContract for FakeChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn address(&self) -> Address {
        self.contract
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ContractError> {
        Ok(self
            .state
            .lock()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        Ok(self.state.lock().total_supply)
    }

    async fn token_info(&self) -> Result<TokenInfo, ContractError> {
        Ok(TokenInfo {
            name: "IDRX".to_string(),
            symbol: "IDRX".to_string(),
            decimals: 2,
        })
    }

    async fn bridge_nonce_counter(&self) -> Result<U256, ContractError> {
        Ok(self.state.lock().next_nonce)
    }

    async fn is_nonce_used(
        &self,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<bool, ContractError> {
        let state = self.state.lock();
        if state.nonce_check_fails {
            return Err(ContractError::Network {
                chain_id: self.chain_id,
                operation: "fromChainNonceUsed",
                source: NetworkError::Rpc {
                    endpoint: "fake".to_string(),
                    method: "eth_call",
                    message: "connection reset".to_string(),
                },
            });
        }
        Ok(state.used_nonces.contains(&(source_chain_id, nonce)))
    }

    async fn blacklist_status(&self, account: Address) -> Result<bool, ContractError> {
        Ok(account == address(0xbb))
    }

    async fn platform_fee_info(&self) -> Result<PlatformFeeInfo, ContractError> {
        Ok(PlatformFeeInfo {
            recipient: address(0xfe),
            burn_bridge_fee: 10,
            mint_bridge_fee: 5,
        })
    }

    async fn transfer(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHandle, ContractError> {
        self.state.lock().transfers.push((to, amount));
        self.confirm_plain(signer)
    }

    async fn mint(
        &self,
        signer: &TransactionSigner,
        _to: Address,
        _amount: U256,
    ) -> Result<TxHandle, ContractError> {
        if !self.state.lock().minter {
            return Err(ContractError::from_revert(
                self.chain_id,
                "mint",
                "AccessControl: account is missing role MINTER_ROLE".to_string(),
            ));
        }
        self.confirm_plain(signer)
    }

    async fn burn(
        &self,
        signer: &TransactionSigner,
        _amount: U256,
    ) -> Result<TxHandle, ContractError> {
        self.confirm_plain(signer)
    }

    async fn burn_with_reference(
        &self,
        signer: &TransactionSigner,
        _amount: U256,
        _reference: &str,
    ) -> Result<TxHandle, ContractError> {
        self.confirm_plain(signer)
    }

    async fn burn_for_bridge(
        &self,
        signer: &TransactionSigner,
        amount: U256,
        destination_chain_id: u64,
    ) -> Result<TxHandle, ContractError> {
        signer.ensure_chain(self.chain_id)?;
        let mut state = self.state.lock();
        let hash = self.next_hash(&mut state);
        state.burns.push(BridgeBurn {
            from: signer.address(),
            amount,
            destination_chain_id,
        });

        match state.burn_mode {
            BurnMode::Confirm => {
                let nonce = state.next_nonce;
                state.next_nonce = nonce + 1;
                let log = burn_log(
                    self.contract,
                    signer.address(),
                    amount,
                    destination_chain_id,
                    nonce,
                );
                state.receipts.insert(hash, receipt(hash, true, vec![log]));
            }
            BurnMode::Revert => {
                state.receipts.insert(hash, receipt(hash, false, vec![]));
            }
            BurnMode::NoEvent => {
                state.receipts.insert(hash, receipt(hash, true, vec![]));
            }
            BurnMode::Pending => {
                state.pending.insert(hash);
            }
        }
        Ok(self.handle(hash))
    }

    async fn mint_for_bridge(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<TxHandle, ContractError> {
        signer.ensure_chain(self.chain_id)?;
        let mut state = self.state.lock();
        state.mints.push(BridgeMint {
            to,
            amount,
            source_chain_id,
            nonce,
        });

        if state.used_nonces.contains(&(source_chain_id, nonce)) {
            return Err(ContractError::from_revert(
                self.chain_id,
                "mintBridge",
                "nonce already used".to_string(),
            ));
        }

        match state.mint_mode {
            MintMode::Reject => Err(ContractError::from_revert(
                self.chain_id,
                "mintBridge",
                "AccessControl: account is missing role MINTER_ROLE".to_string(),
            )),
            MintMode::Revert => {
                let hash = self.next_hash(&mut state);
                state.receipts.insert(hash, receipt(hash, false, vec![]));
                Ok(self.handle(hash))
            }
            MintMode::Pending => {
                let hash = self.next_hash(&mut state);
                state.pending.insert(hash);
                Ok(self.handle(hash))
            }
            MintMode::Confirm => {
                let hash = self.next_hash(&mut state);
                state.used_nonces.insert((source_chain_id, nonce));
                state.receipts.insert(hash, receipt(hash, true, vec![]));
                Ok(self.handle(hash))
            }
        }
    }
}

/// One RPC node serving a [`FakeChain`]
pub struct FakeRpc {
    endpoint: String,
    chain: Arc<FakeChain>,
    reported_chain_id: AtomicU64,
    reachable: AtomicBool,
    alive: AtomicBool,
    closed: AtomicBool,
    latency: Mutex<Duration>,
    probes: AtomicUsize,
}

impl FakeRpc {
    pub fn new(endpoint: &str, chain: Arc<FakeChain>) -> Self {
        let chain_id = chain.chain_id;
        Self {
            endpoint: endpoint.to_string(),
            chain,
            reported_chain_id: AtomicU64::new(chain_id),
            reachable: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            probes: AtomicUsize::new(0),
        }
    }

    /// Refuse new dials
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fail every call on an established connection
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn report_chain_id(&self, chain_id: u64) {
        self.reported_chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    async fn answer(&self, method: &'static str) -> Result<(), NetworkError> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.is_closed() || !self.alive.load(Ordering::SeqCst) {
            return Err(NetworkError::Rpc {
                endpoint: self.endpoint.clone(),
                method,
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<u64, NetworkError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.answer("eth_chainId").await?;
        Ok(self.reported_chain_id.load(Ordering::SeqCst))
    }

    async fn block_number(&self) -> Result<u64, NetworkError> {
        self.answer("eth_blockNumber").await?;
        Ok(7)
    }

    async fn gas_price(&self) -> Result<U256, NetworkError> {
        self.answer("eth_gasPrice").await?;
        Ok(U256::from(2_000_000_000u64))
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256, NetworkError> {
        self.answer("eth_estimateGas").await?;
        Ok(U256::from(52_000u64))
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        self.answer("eth_getTransactionReceipt").await?;
        Ok(self.chain.receipt(hash))
    }

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, NetworkError> {
        self.answer("eth_getTransactionByHash").await?;
        Ok(self.chain.is_known(hash).then(|| Transaction {
            hash,
            ..Default::default()
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Dials [`FakeRpc`] nodes by endpoint
#[derive(Default)]
pub struct FakeConnector {
    nodes: HashMap<String, Arc<FakeRpc>>,
    dials: AtomicUsize,
}

impl FakeConnector {
    pub fn new(nodes: impl IntoIterator<Item = Arc<FakeRpc>>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|node| (node.endpoint.clone(), node))
                .collect(),
            dials: AtomicUsize::new(0),
        }
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn dial(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, NetworkError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(endpoint) {
            Some(node) if node.reachable.load(Ordering::SeqCst) => {
                let rpc: Arc<dyn ChainRpc> = node.clone();
                Ok(rpc)
            }
            _ => Err(NetworkError::DialFailed {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// Hands out the [`FakeChain`] registered for a chain ID
#[derive(Default)]
pub struct FakeContractFactory {
    chains: HashMap<u64, Arc<FakeChain>>,
}

#[async_trait]
impl ContractFactory for FakeContractFactory {
    async fn bind(
        &self,
        descriptor: &NetworkDescriptor,
        _connection: &idrx_multichain::network::PooledConnection,
    ) -> Result<Arc<dyn TokenContract>, ContractError> {
        let chain_id = descriptor.chain_id;
        let chain = self
            .chains
            .get(&chain_id)
            .cloned()
            .ok_or(ContractError::NotDeployed { chain_id })?;
        let contract: Arc<dyn TokenContract> = chain;
        Ok(contract)
    }
}

/// The test registry wired to fake chains and nodes
pub struct Fixture {
    pub registry: NetworkRegistry,
    pub chains: HashMap<u64, Arc<FakeChain>>,
    pub nodes: HashMap<String, Arc<FakeRpc>>,
    pub connector: Arc<FakeConnector>,
    pub factory: Arc<FakeContractFactory>,
}

impl Fixture {
    pub fn new() -> Self {
        let registry = test_registry();
        let mut chains = HashMap::new();
        let mut nodes = HashMap::new();

        for (_, descriptor) in registry.iter() {
            let contract = descriptor.contract_address.unwrap_or_default();
            let chain = Arc::new(FakeChain::new(descriptor.chain_id, contract));
            for endpoint in &descriptor.endpoints {
                nodes.insert(
                    endpoint.clone(),
                    Arc::new(FakeRpc::new(endpoint, chain.clone())),
                );
            }
            if descriptor.is_deployed() {
                chains.insert(descriptor.chain_id, chain);
            }
        }

        let connector = Arc::new(FakeConnector::new(nodes.values().cloned()));
        let factory = Arc::new(FakeContractFactory {
            chains: chains.clone(),
        });

        Self {
            registry,
            chains,
            nodes,
            connector,
            factory,
        }
    }

    pub fn chain(&self, chain_id: u64) -> &Arc<FakeChain> {
        &self.chains[&chain_id]
    }

    pub fn node(&self, endpoint: &str) -> &Arc<FakeRpc> {
        &self.nodes[endpoint]
    }

    pub fn pool_config() -> PoolConfig {
        PoolConfig {
            dial_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub async fn pool(&self) -> Result<ConnectionPool, NetworkError> {
        ConnectionPool::connect(&self.registry, self.connector.as_ref(), Self::pool_config()).await
    }

    pub async fn client(&self) -> idrx_multichain::Result<MultiChainClient> {
        MultiChainClient::builder(ClientConfig::new(TEST_KEY))
            .registry(self.registry.clone())
            .connector(self.connector.clone())
            .contract_factory(self.factory.clone())
            .connect()
            .await
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
