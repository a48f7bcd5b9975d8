use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gas settings applied to every transaction submitted on a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
    /// Gas limit ceiling set on each transaction
    pub gas_limit: u64,
    /// Upper bound for the gas price in wei, if the network caps it
    pub max_gas_price: Option<u64>,
}

/// Static description of one network hosting the token contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// EIP-155 chain ID
    pub chain_id: u64,
    /// Human readable network name
    pub name: String,
    /// Redundant RPC endpoints, tried in order
    pub endpoints: Vec<String>,
    /// Deployed token contract. Networks without one are never dialed.
    pub contract_address: Option<Address>,
    /// Nominal block interval
    pub block_time: Duration,
    /// Gas policy for submitted transactions
    pub gas: GasPolicy,
    /// Fractional digits of the token's base unit on this network
    pub decimals: u8,
    /// Testnet flag
    pub testnet: bool,
}

impl NetworkDescriptor {
    /// Whether the token contract is deployed on this network
    pub fn is_deployed(&self) -> bool {
        self.contract_address.is_some()
    }

    /// Whether the client should dial this network at all
    pub fn is_dialable(&self) -> bool {
        self.is_deployed() && !self.endpoints.is_empty()
    }
}
