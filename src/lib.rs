pub mod amount;
pub mod bridge;
pub mod client;
pub mod config;
pub mod confirmation;
pub mod contract;
pub mod network;
pub mod registry;
pub mod telemetry;

// Re-exports
pub use amount::{DecimalAmount, TokenAmount};
pub use bridge::{BridgeError, BridgeOperation, BridgeOrchestrator, BridgeRequest, PendingMint};
pub use client::{ClientBuilder, MultiChainClient, NetworkInfo, TransactionStatus};
pub use config::{ClientConfig, SecretString};
pub use confirmation::{TransactionWaiter, WaitPolicy};
pub use contract::{TokenContract, TransactionSigner, TxHandle};
pub use network::{ConnectionPool, PooledConnection};
pub use registry::{NetworkDescriptor, NetworkRegistry};

// Core types
pub type Result<T> = std::result::Result<T, Error>;
pub use error::Error;

pub mod error;
