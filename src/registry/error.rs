use thiserror::Error;

/// Registry lookup and validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No network is registered under this chain ID
    #[error("chain {0} is not supported")]
    ChainNotSupported(u64),

    /// No network is registered under this name
    #[error("network {0} is not supported")]
    NetworkNotSupported(String),

    /// Two entries claim the same chain ID
    #[error("chain {chain_id} is registered twice ({first} and {second})")]
    DuplicateChainId {
        chain_id: u64,
        first: String,
        second: String,
    },

    /// Two entries share a network name
    #[error("network {0} is registered twice")]
    DuplicateNetwork(String),

    /// Descriptor fails a structural check
    #[error("network {network}: {reason}")]
    InvalidDescriptor { network: String, reason: String },
}
