use ethers::types::{
    transaction::eip2718::TypedTransaction, Transaction, TransactionReceipt, H256, U256,
};
use futures::future::join_all;
use parking_lot::RwLock as SyncRwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ChainRpc, Connector, NetworkError};
use crate::registry::NetworkRegistry;
use crate::telemetry;

/// Pool timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Bound on dialing a single endpoint
    pub dial_timeout: Duration,
    /// Bound on the liveness probe run by `acquire`
    pub probe_timeout: Duration,
    /// Bound on every RPC issued through a pooled connection
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Counters kept by the pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    pub acquisitions: u64,
    pub failovers: u64,
    pub probe_failures: u64,
    pub exhausted: u64,
    pub dial_failures: u64,
}

/// A live connection handed out by [`ConnectionPool::acquire`].
///
/// Cloning is cheap. Every call fails with [`NetworkError::PoolClosed`] once the
/// owning pool has been closed, including calls already in flight.
#[derive(Clone)]
pub struct PooledConnection {
    chain_id: u64,
    rpc: Arc<dyn ChainRpc>,
    lifecycle: CancellationToken,
    request_timeout: Duration,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("chain_id", &self.chain_id)
            .field("endpoint", &self.rpc.endpoint())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PooledConnection {
    fn new(
        chain_id: u64,
        rpc: Arc<dyn ChainRpc>,
        lifecycle: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            chain_id,
            rpc,
            lifecycle,
            request_timeout,
        }
    }

    /// Chain this connection was registered under
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    /// Token cancelled when the owning pool closes
    pub fn lifecycle(&self) -> &CancellationToken {
        &self.lifecycle
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Chain ID reported by the remote node
    pub async fn remote_chain_id(&self) -> Result<u64, NetworkError> {
        self.guarded("eth_chainId", self.request_timeout, self.rpc.chain_id())
            .await
    }

    pub async fn block_number(&self) -> Result<u64, NetworkError> {
        self.guarded("eth_blockNumber", self.request_timeout, self.rpc.block_number())
            .await
    }

    pub async fn gas_price(&self) -> Result<U256, NetworkError> {
        self.guarded("eth_gasPrice", self.request_timeout, self.rpc.gas_price())
            .await
    }

    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, NetworkError> {
        self.guarded("eth_estimateGas", self.request_timeout, self.rpc.estimate_gas(tx))
            .await
    }

    pub async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        self.guarded(
            "eth_getTransactionReceipt",
            self.request_timeout,
            self.rpc.transaction_receipt(hash),
        )
        .await
    }

    pub async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, NetworkError> {
        self.guarded(
            "eth_getTransactionByHash",
            self.request_timeout,
            self.rpc.transaction(hash),
        )
        .await
    }

    /// Liveness probe: a chain ID query under `limit`
    pub(crate) async fn probe(&self, limit: Duration) -> Result<(), NetworkError> {
        self.guarded("eth_chainId", limit, self.rpc.chain_id())
            .await
            .map(|_| ())
    }

    async fn guarded<T, F>(
        &self,
        method: &'static str,
        limit: Duration,
        call: F,
    ) -> Result<T, NetworkError>
    where
        F: Future<Output = Result<T, NetworkError>>,
    {
        if self.is_closed() {
            return Err(NetworkError::PoolClosed);
        }

        tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => Err(NetworkError::PoolClosed),
            result = timeout(limit, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(NetworkError::Timeout {
                    endpoint: self.endpoint().to_string(),
                    method,
                    after: limit,
                }),
            },
        }
    }
}

struct ChainConnections {
    network: String,
    connections: Vec<PooledConnection>,
}

#[derive(Default)]
struct PoolState {
    chains: HashMap<u64, ChainConnections>,
    closed: bool,
}

/// Per-chain ordered connection sets with probe-based failover.
///
/// Reads (`acquire`) run concurrently; `close_all` takes the write side, so no
/// acquire ever observes a half-closed pool.
pub struct ConnectionPool {
    state: RwLock<PoolState>,
    config: PoolConfig,
    lifecycle: CancellationToken,
    metrics: SyncRwLock<PoolMetrics>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ConnectionPool {
    /// Dial every endpoint of every deployed network in `registry`.
    ///
    /// Endpoints are dialed concurrently; successes keep their configured order.
    /// Fails if any deployed network ends up with zero connections, after closing
    /// whatever was already dialed.
    pub async fn connect(
        registry: &NetworkRegistry,
        connector: &dyn Connector,
        config: PoolConfig,
    ) -> Result<Self, NetworkError> {
        let lifecycle = CancellationToken::new();
        let metrics = SyncRwLock::new(PoolMetrics::default());

        let networks: Vec<_> = registry.iter().filter(|(_, d)| d.is_dialable()).collect();

        let per_chain = networks.iter().map(|(name, descriptor)| async move {
            let dials = descriptor.endpoints.iter().map(|endpoint| async move {
                let result = match timeout(config.dial_timeout, connector.dial(endpoint)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(NetworkError::Timeout {
                        endpoint: endpoint.clone(),
                        method: "dial",
                        after: config.dial_timeout,
                    }),
                };
                (endpoint.as_str(), result)
            });
            (*name, descriptor, join_all(dials).await)
        });
        let dialed = join_all(per_chain).await;

        let mut chains = HashMap::new();
        let mut failure = None;

        for (name, descriptor, results) in dialed {
            let attempted = results.len();
            let mut connections = Vec::with_capacity(attempted);

            for (endpoint, result) in results {
                match result {
                    Ok(rpc) => connections.push(PooledConnection::new(
                        descriptor.chain_id,
                        rpc,
                        lifecycle.child_token(),
                        config.request_timeout,
                    )),
                    Err(err) => {
                        metrics.write().dial_failures += 1;
                        telemetry::record_dial_failure(descriptor.chain_id);
                        warn!(network = name, endpoint, error = %err, "endpoint dial failed");
                    }
                }
            }

            if connections.is_empty() {
                if failure.is_none() {
                    failure = Some(NetworkError::NoEndpointsReachable {
                        network: name.to_string(),
                        chain_id: descriptor.chain_id,
                        attempted,
                    });
                }
                continue;
            }

            info!(
                network = name,
                chain_id = descriptor.chain_id,
                connected = connections.len(),
                configured = attempted,
                "network connected"
            );
            chains.insert(
                descriptor.chain_id,
                ChainConnections {
                    network: name.to_string(),
                    connections,
                },
            );
        }

        if let Some(err) = failure {
            lifecycle.cancel();
            for chain in chains.into_values() {
                for connection in chain.connections {
                    connection.rpc.close().await;
                }
            }
            return Err(err);
        }

        Ok(Self {
            state: RwLock::new(PoolState {
                chains,
                closed: false,
            }),
            config,
            lifecycle,
            metrics,
        })
    }

    /// Return the first connection, in configured order, that answers a probe.
    pub async fn acquire(&self, chain_id: u64) -> Result<PooledConnection, NetworkError> {
        let state = self.state.read().await;
        if state.closed || self.is_closed() {
            return Err(NetworkError::PoolClosed);
        }

        let chain = state
            .chains
            .get(&chain_id)
            .ok_or(NetworkError::ChainNotConnected { chain_id })?;

        for (index, connection) in chain.connections.iter().enumerate() {
            match connection.probe(self.config.probe_timeout).await {
                Ok(()) => {
                    if self.is_closed() {
                        return Err(NetworkError::PoolClosed);
                    }
                    {
                        let mut metrics = self.metrics.write();
                        metrics.acquisitions += 1;
                        if index > 0 {
                            metrics.failovers += 1;
                        }
                    }
                    if index > 0 {
                        telemetry::record_failover(chain_id);
                        info!(
                            network = %chain.network,
                            endpoint = connection.endpoint(),
                            skipped = index,
                            "failed over to backup endpoint"
                        );
                    }
                    return Ok(connection.clone());
                }
                Err(NetworkError::PoolClosed) => return Err(NetworkError::PoolClosed),
                Err(err) => {
                    self.metrics.write().probe_failures += 1;
                    warn!(
                        network = %chain.network,
                        endpoint = connection.endpoint(),
                        error = %err,
                        "endpoint probe failed"
                    );
                }
            }
        }

        self.metrics.write().exhausted += 1;
        telemetry::record_pool_exhausted(chain_id);
        Err(NetworkError::NoAvailableConnection {
            chain_id,
            attempted: chain.connections.len(),
        })
    }

    /// First connection in configured order, without probing
    pub async fn primary(&self, chain_id: u64) -> Result<PooledConnection, NetworkError> {
        let state = self.state.read().await;
        if state.closed {
            return Err(NetworkError::PoolClosed);
        }
        state
            .chains
            .get(&chain_id)
            .and_then(|chain| chain.connections.first().cloned())
            .ok_or(NetworkError::ChainNotConnected { chain_id })
    }

    /// Chains that hold at least one connection, ascending
    pub async fn connected_chains(&self) -> Vec<u64> {
        let state = self.state.read().await;
        let mut chain_ids: Vec<u64> = state.chains.keys().copied().collect();
        chain_ids.sort_unstable();
        chain_ids
    }

    pub async fn is_connected(&self, chain_id: u64) -> bool {
        self.state.read().await.chains.contains_key(&chain_id)
    }

    /// Endpoints held for a chain, in configured order
    pub async fn endpoints(&self, chain_id: u64) -> Vec<String> {
        let state = self.state.read().await;
        state
            .chains
            .get(&chain_id)
            .map(|chain| {
                chain
                    .connections
                    .iter()
                    .map(|c| c.endpoint().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Close every connection. Safe to call more than once.
    pub async fn close_all(&self) {
        // Cancel first so in-flight probes stop holding the read side
        self.lifecycle.cancel();

        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        state.closed = true;

        let chains = std::mem::take(&mut state.chains);
        let mut closed = 0usize;
        for chain in chains.into_values() {
            for connection in chain.connections {
                connection.rpc.close().await;
                closed += 1;
            }
            debug!(network = %chain.network, "network connections closed");
        }
        info!(connections = closed, "connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.metrics.read().clone()
    }
}
