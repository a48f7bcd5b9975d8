use async_trait::async_trait;
use ethers::types::{TransactionReceipt, H256};

use crate::network::{ConnectionPool, NetworkError};

/// Where the waiter looks up receipts
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// `Ok(None)` while the transaction is not yet included
    async fn receipt(
        &self,
        chain_id: u64,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError>;

    /// Whether the chain knows `hash` at all, mined or still pending.
    ///
    /// Sources that cannot tell answer `true`, so callers keep waiting rather
    /// than resubmit.
    async fn is_known(&self, _chain_id: u64, _hash: H256) -> Result<bool, NetworkError> {
        Ok(true)
    }
}

#[async_trait]
impl ReceiptSource for ConnectionPool {
    async fn receipt(
        &self,
        chain_id: u64,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, NetworkError> {
        let connection = self.acquire(chain_id).await?;
        connection.transaction_receipt(hash).await
    }

    async fn is_known(&self, chain_id: u64, hash: H256) -> Result<bool, NetworkError> {
        let connection = self.acquire(chain_id).await?;
        if connection.transaction_receipt(hash).await?.is_some() {
            return Ok(true);
        }
        Ok(connection.transaction(hash).await?.is_some())
    }
}
