//! ethers-backed token contract.

use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::{ContractCall, ContractError as EthersContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, U256};
use std::future::Future;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info};

use super::abi::IdrxToken;
use super::{
    ContractError, ContractFactory, PlatformFeeInfo, TokenContract, TokenInfo, TransactionSigner,
    TxHandle,
};
use crate::network::{NetworkError, PooledConnection};
use crate::registry::NetworkDescriptor;
use crate::telemetry;

type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Builds [`EvmTokenContract`]s over HTTP providers
#[derive(Debug, Clone, Default)]
pub struct EvmContractFactory;

#[async_trait]
impl ContractFactory for EvmContractFactory {
    async fn bind(
        &self,
        descriptor: &NetworkDescriptor,
        connection: &PooledConnection,
    ) -> Result<Arc<dyn TokenContract>, ContractError> {
        let contract = EvmTokenContract::new(descriptor, connection.clone())?;
        Ok(Arc::new(contract))
    }
}

/// Token contract reached through the connection it was bound to
pub struct EvmTokenContract {
    chain_id: u64,
    address: Address,
    provider: Provider<Http>,
    reader: IdrxToken<Provider<Http>>,
    connection: PooledConnection,
}

impl EvmTokenContract {
    pub fn new(
        descriptor: &NetworkDescriptor,
        connection: PooledConnection,
    ) -> Result<Self, ContractError> {
        let chain_id = descriptor.chain_id;
        let address = descriptor
            .contract_address
            .ok_or(ContractError::NotDeployed { chain_id })?;

        let provider = Provider::<Http>::try_from(connection.endpoint()).map_err(|err| {
            ContractError::Network {
                chain_id,
                operation: "bind",
                source: NetworkError::DialFailed {
                    endpoint: connection.endpoint().to_string(),
                    message: err.to_string(),
                },
            }
        })?;
        let reader = IdrxToken::new(address, Arc::new(provider.clone()));

        debug!(chain_id, endpoint = connection.endpoint(), contract = ?address, "contract bound");
        Ok(Self {
            chain_id,
            address,
            provider,
            reader,
            connection,
        })
    }

    fn writer(&self, signer: &TransactionSigner) -> IdrxToken<SignedClient> {
        let client = SignerMiddleware::new(self.provider.clone(), signer.wallet().clone());
        IdrxToken::new(self.address, Arc::new(client))
    }

    fn network_error(&self, operation: &'static str, source: NetworkError) -> ContractError {
        ContractError::Network {
            chain_id: self.chain_id,
            operation,
            source,
        }
    }

    fn call_error<M: Middleware>(
        &self,
        operation: &'static str,
        err: EthersContractError<M>,
    ) -> ContractError {
        if let Some(reason) = err.decode_revert::<String>() {
            return ContractError::from_revert(self.chain_id, operation, reason);
        }
        if err.is_revert() {
            return ContractError::Reverted {
                chain_id: self.chain_id,
                operation,
                reason: "execution reverted".to_string(),
            };
        }
        ContractError::Call {
            chain_id: self.chain_id,
            operation,
            message: err.to_string(),
        }
    }

    /// Bound `call` by the request timeout and the pool lifecycle
    async fn guarded<T, F>(&self, operation: &'static str, call: F) -> Result<T, ContractError>
    where
        F: Future<Output = Result<T, ContractError>>,
    {
        if self.connection.is_closed() {
            return Err(self.network_error(operation, NetworkError::PoolClosed));
        }

        let limit = self.connection.request_timeout();
        tokio::select! {
            biased;
            _ = self.connection.lifecycle().cancelled() => {
                Err(self.network_error(operation, NetworkError::PoolClosed))
            }
            result = timeout(limit, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(self.network_error(operation, NetworkError::Timeout {
                    endpoint: self.connection.endpoint().to_string(),
                    method: operation,
                    after: limit,
                })),
            },
        }
    }

    async fn read<D>(
        &self,
        operation: &'static str,
        call: ContractCall<Provider<Http>, D>,
    ) -> Result<D, ContractError>
    where
        D: Detokenize + Send + Sync,
    {
        self.guarded(operation, async {
            call.call()
                .await
                .map_err(|err| self.call_error(operation, err))
        })
        .await
    }

    /// Simulate, then submit. Returns once the node accepted the transaction.
    async fn submit<D>(
        &self,
        signer: &TransactionSigner,
        operation: &'static str,
        call: ContractCall<SignedClient, D>,
    ) -> Result<TxHandle, ContractError>
    where
        D: Detokenize + Send + Sync,
    {
        signer.ensure_chain(self.chain_id)?;

        let suggested = self
            .connection
            .gas_price()
            .await
            .map_err(|source| self.network_error(operation, source))?;
        let gas = signer.gas_policy();
        let call = call
            .legacy()
            .from(signer.address())
            .gas(gas.gas_limit)
            .gas_price(signer.cap_gas_price(suggested));

        // Surface the revert reason before paying for it
        self.guarded(operation, async {
            call.call()
                .await
                .map(|_| ())
                .map_err(|err| self.call_error(operation, err))
        })
        .await?;

        let hash = self
            .guarded(operation, async {
                call.send()
                    .await
                    .map(|pending| pending.tx_hash())
                    .map_err(|err| self.call_error(operation, err))
            })
            .await?;

        telemetry::record_transaction_sent(self.chain_id, operation);
        info!(chain_id = self.chain_id, operation, tx_hash = ?hash, "transaction submitted");

        Ok(TxHandle {
            chain_id: self.chain_id,
            hash,
        })
    }
}

#[async_trait]
impl TokenContract for EvmTokenContract {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ContractError> {
        self.read("balanceOf", self.reader.balance_of(account)).await
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        self.read("totalSupply", self.reader.total_supply()).await
    }

    async fn token_info(&self) -> Result<TokenInfo, ContractError> {
        let name = self.read("name", self.reader.name()).await?;
        let symbol = self.read("symbol", self.reader.symbol()).await?;
        let decimals = self.read("decimals", self.reader.decimals()).await?;
        Ok(TokenInfo {
            name,
            symbol,
            decimals,
        })
    }

    async fn bridge_nonce_counter(&self) -> Result<U256, ContractError> {
        self.read("bridgeNonce", self.reader.bridge_nonce()).await
    }

    async fn is_nonce_used(
        &self,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<bool, ContractError> {
        let call = self
            .reader
            .from_chain_nonce_used(U256::from(source_chain_id), nonce);
        self.read("fromChainNonceUsed", call).await
    }

    async fn blacklist_status(&self, account: Address) -> Result<bool, ContractError> {
        self.read("getBlackListStatus", self.reader.get_black_list_status(account))
            .await
    }

    async fn platform_fee_info(&self) -> Result<PlatformFeeInfo, ContractError> {
        let (recipient, burn_bridge_fee, mint_bridge_fee) = self
            .read("getPlatformFeeInfo", self.reader.get_platform_fee_info())
            .await?;
        Ok(PlatformFeeInfo {
            recipient,
            burn_bridge_fee,
            mint_bridge_fee,
        })
    }

    async fn transfer(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHandle, ContractError> {
        let call = self.writer(signer).transfer(to, amount);
        self.submit(signer, "transfer", call).await
    }

    async fn mint(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
    ) -> Result<TxHandle, ContractError> {
        let call = self.writer(signer).mint(to, amount);
        self.submit(signer, "mint", call).await
    }

    async fn burn(
        &self,
        signer: &TransactionSigner,
        amount: U256,
    ) -> Result<TxHandle, ContractError> {
        let call = self.writer(signer).burn(amount);
        self.submit(signer, "burn", call).await
    }

    async fn burn_with_reference(
        &self,
        signer: &TransactionSigner,
        amount: U256,
        reference: &str,
    ) -> Result<TxHandle, ContractError> {
        let call = self
            .writer(signer)
            .burn_with_account_number(amount, reference.to_string());
        self.submit(signer, "burnWithAccountNumber", call).await
    }

    async fn burn_for_bridge(
        &self,
        signer: &TransactionSigner,
        amount: U256,
        destination_chain_id: u64,
    ) -> Result<TxHandle, ContractError> {
        let call = self
            .writer(signer)
            .burn_bridge(amount, U256::from(destination_chain_id));
        self.submit(signer, "burnBridge", call).await
    }

    async fn mint_for_bridge(
        &self,
        signer: &TransactionSigner,
        to: Address,
        amount: U256,
        source_chain_id: u64,
        nonce: U256,
    ) -> Result<TxHandle, ContractError> {
        let call = self
            .writer(signer)
            .mint_bridge(to, amount, U256::from(source_chain_id), nonce);
        self.submit(signer, "mintBridge", call).await
    }
}
