use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Transaction, TransactionReceipt, H256, U256,
};
use std::sync::Arc;
use tracing::debug;

use super::{ChainRpc, Connector, NetworkError};

/// Dials HTTP JSON-RPC endpoints through an ethers provider
#[derive(Debug, Clone, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn dial(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, NetworkError> {
        let rpc = EthersRpc::new(endpoint)?;
        // An HTTP provider is lazy; ask for the chain ID so only answering endpoints count
        let chain_id = rpc.chain_id().await?;
        debug!(endpoint, chain_id, "endpoint answered");
        Ok(Arc::new(rpc))
    }
}

/// [`ChainRpc`] over an ethers HTTP provider
#[derive(Debug, Clone)]
pub struct EthersRpc {
    endpoint: String,
    provider: Provider<Http>,
}

impl EthersRpc {
    pub fn new(endpoint: &str) -> Result<Self, NetworkError> {
        let provider =
            Provider::<Http>::try_from(endpoint).map_err(|err| NetworkError::DialFailed {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            provider,
        })
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }

    fn rpc_error(&self, method: &'static str, err: ProviderError) -> NetworkError {
        NetworkError::Rpc {
            endpoint: self.endpoint.clone(),
            method,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ChainRpc for EthersRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<u64, NetworkError> {
        self.provider
            .get_chainid()
            .await
            .map(|id| id.low_u64())
            .map_err(|err| self.rpc_error("eth_chainId", err))
    }

    async fn block_number(&self) -> Result<u64, NetworkError> {
        self.provider
            .get_block_number()
            .await
            .map(|number| number.as_u64())
            .map_err(|err| self.rpc_error("eth_blockNumber", err))
    }

    async fn gas_price(&self) -> Result<U256, NetworkError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|err| self.rpc_error("eth_gasPrice", err))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, NetworkError> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(|err| self.rpc_error("eth_estimateGas", err))
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|err| self.rpc_error("eth_getTransactionReceipt", err))
    }

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, NetworkError> {
        self.provider
            .get_transaction(hash)
            .await
            .map_err(|err| self.rpc_error("eth_getTransactionByHash", err))
    }
}
