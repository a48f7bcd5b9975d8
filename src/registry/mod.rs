/*!
# Network Registry

Read-only catalogue of the networks the token contract is deployed on.

Each [`NetworkDescriptor`] carries the chain identity, the redundant RPC endpoints,
the contract address, the nominal block time, the gas policy and the decimal precision
of the token on that network. The registry is keyed both by network name and by chain
ID; construction rejects any table where the two keys would not resolve to the same
descriptor.

The registry holds no connection state. It parameterizes the connection pool, the
confirmation waiter and the bridge orchestrator, and can be replaced by a synthetic
table in tests.

```rust
use idrx_multichain::registry::{NetworkRegistry, BASE_CHAIN_ID, BASE_MAINNET};

let registry = NetworkRegistry::builtin();
let (descriptor, name) = registry.lookup_by_chain_id(BASE_CHAIN_ID).unwrap();
assert_eq!(name, BASE_MAINNET);
assert_eq!(descriptor.decimals, 2);

// Unknown chains fall back to the majority precision
assert_eq!(registry.decimals_for(999_999), 2);
```
*/

mod builtin;
mod descriptor;
mod error;

pub use builtin::*;
pub use descriptor::{GasPolicy, NetworkDescriptor};
pub use error::RegistryError;

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Precision reported for chains the registry does not know
pub const DEFAULT_DECIMALS: u8 = 2;

/// Largest precision whose scale factor fits a 256-bit integer
pub const MAX_DECIMALS: u8 = 77;

static BUILTIN: Lazy<NetworkRegistry> = Lazy::new(|| {
    NetworkRegistry::new(builtin_networks())
        .unwrap_or_else(|err| panic!("built-in network table is inconsistent: {err}"))
});

/// Network catalogue keyed by name and chain ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    by_name: BTreeMap<String, NetworkDescriptor>,
    by_chain: HashMap<u64, String>,
}

impl NetworkRegistry {
    /// Build a registry from `(network name, descriptor)` pairs
    pub fn new<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, NetworkDescriptor)>,
        S: Into<String>,
    {
        let mut by_name = BTreeMap::new();
        let mut by_chain: HashMap<u64, String> = HashMap::new();

        for (name, descriptor) in entries {
            let name = name.into();
            validate_descriptor(&name, &descriptor)?;

            if by_name.contains_key(&name) {
                return Err(RegistryError::DuplicateNetwork(name));
            }
            if let Some(first) = by_chain.get(&descriptor.chain_id) {
                return Err(RegistryError::DuplicateChainId {
                    chain_id: descriptor.chain_id,
                    first: first.clone(),
                    second: name,
                });
            }

            by_chain.insert(descriptor.chain_id, name.clone());
            by_name.insert(name, descriptor);
        }

        Ok(Self { by_name, by_chain })
    }

    /// The compiled-in deployment table
    pub fn builtin() -> &'static NetworkRegistry {
        &BUILTIN
    }

    /// New registry where `entries` replace same-named networks or are appended
    pub fn with_overrides<I, S>(&self, entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, NetworkDescriptor)>,
        S: Into<String>,
    {
        let mut merged = self.by_name.clone();
        for (name, descriptor) in entries {
            merged.insert(name.into(), descriptor);
        }
        Self::new(merged)
    }

    /// Look up a network by name
    pub fn lookup_by_name(&self, name: &str) -> Result<&NetworkDescriptor, RegistryError> {
        self.by_name
            .get(name)
            .ok_or_else(|| RegistryError::NetworkNotSupported(name.to_string()))
    }

    /// Look up a network by chain ID, returning its descriptor and name
    pub fn lookup_by_chain_id(
        &self,
        chain_id: u64,
    ) -> Result<(&NetworkDescriptor, &str), RegistryError> {
        self.by_chain
            .get(&chain_id)
            .and_then(|name| {
                self.by_name
                    .get_key_value(name)
                    .map(|(name, descriptor)| (descriptor, name.as_str()))
            })
            .ok_or(RegistryError::ChainNotSupported(chain_id))
    }

    /// Descriptor for a chain ID
    pub fn descriptor(&self, chain_id: u64) -> Result<&NetworkDescriptor, RegistryError> {
        self.lookup_by_chain_id(chain_id).map(|(descriptor, _)| descriptor)
    }

    /// Names of all registered networks
    pub fn list_supported(&self) -> BTreeSet<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Chain IDs of all registered networks
    pub fn list_chain_ids(&self) -> BTreeSet<u64> {
        self.by_chain.keys().copied().collect()
    }

    /// Token precision on a chain, or [`DEFAULT_DECIMALS`] for unknown chains
    pub fn decimals_for(&self, chain_id: u64) -> u8 {
        self.descriptor(chain_id)
            .map(|descriptor| descriptor.decimals)
            .unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn is_network_supported(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        self.by_chain.contains_key(&chain_id)
    }

    /// Network name registered for a chain ID
    pub fn network_name(&self, chain_id: u64) -> Option<&str> {
        self.by_chain.get(&chain_id).map(String::as_str)
    }

    /// All `(name, descriptor)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NetworkDescriptor)> {
        self.by_name
            .iter()
            .map(|(name, descriptor)| (name.as_str(), descriptor))
    }

    /// Non-testnet networks
    pub fn mainnets(&self) -> impl Iterator<Item = (&str, &NetworkDescriptor)> {
        self.iter().filter(|(_, descriptor)| !descriptor.testnet)
    }

    /// Networks with a deployed contract and at least one endpoint
    pub fn deployed(&self) -> impl Iterator<Item = (&str, &NetworkDescriptor)> {
        self.iter().filter(|(_, descriptor)| descriptor.is_dialable())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn validate_descriptor(name: &str, descriptor: &NetworkDescriptor) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidDescriptor {
        network: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("network name is empty"));
    }
    if descriptor.decimals > MAX_DECIMALS {
        return Err(invalid("decimal precision exceeds 77 digits"));
    }
    if descriptor.endpoints.iter().any(|e| e.trim().is_empty()) {
        return Err(invalid("endpoint URI is empty"));
    }
    Ok(())
}
