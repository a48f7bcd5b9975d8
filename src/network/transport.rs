use async_trait::async_trait;
use ethers::types::{
    transaction::eip2718::TypedTransaction, Transaction, TransactionReceipt, H256, U256,
};
use std::sync::Arc;

use super::NetworkError;

/// The standard chain JSON-RPC surface the client relies on.
///
/// Implementations are interchangeable within one chain; the pool picks among them.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// URI this connection was dialed from
    fn endpoint(&self) -> &str;

    /// `eth_chainId`, also used as the liveness probe
    async fn chain_id(&self) -> Result<u64, NetworkError>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> Result<u64, NetworkError>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<U256, NetworkError>;

    /// `eth_estimateGas`
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, NetworkError>;

    /// `eth_getTransactionReceipt`; `None` while the transaction is not mined
    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError>;

    /// `eth_getTransactionByHash`; `None` when the node does not know the hash
    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, NetworkError>;

    /// Release transport resources
    async fn close(&self) {}
}

/// Dials an endpoint URI into a live [`ChainRpc`]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection. Succeeds only if the endpoint answered.
    async fn dial(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, NetworkError>;
}
