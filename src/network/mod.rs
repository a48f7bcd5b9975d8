/*!
Chain connectivity.

A [`ConnectionPool`] holds, per chain, the ordered set of endpoints that answered
at startup. [`ConnectionPool::acquire`] walks that order with a short liveness
probe and hands back the first live connection, so a dead primary endpoint
fails over to its backups without caller involvement.

The RPC surface sits behind [`ChainRpc`] / [`Connector`]; [`HttpConnector`] is
the ethers-backed implementation.
*/

pub mod error;
pub mod pool;
pub mod provider;
pub mod transport;

pub use error::NetworkError;
pub use pool::{ConnectionPool, PoolConfig, PoolMetrics, PooledConnection};
pub use provider::{EthersRpc, HttpConnector};
pub use transport::{ChainRpc, Connector};
