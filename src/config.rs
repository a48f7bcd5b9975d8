/*!
# Client Configuration

The only required input is the signer key. Timeouts default to 30s for requests and
endpoint dials and 5s for the liveness probe. Networks may be added or overridden by
name on top of the compiled-in table.

```rust
use idrx_multichain::config::ClientConfig;

let config = ClientConfig::from_json_str(r#"{ "private_key": "0xabc123" }"#).unwrap();
assert_eq!(config.request_timeout.as_secs(), 30);
assert_eq!(format!("{}", config.private_key), "[REDACTED]");
```
*/

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::network::PoolConfig;
use crate::registry::{NetworkDescriptor, NetworkRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("private key is empty")]
    MissingPrivateKey,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("probe timeout {probe:?} exceeds request timeout {request:?}")]
    ProbeExceedsRequest { probe: Duration, request: Duration },

    #[error("invalid network override: {0}")]
    Network(#[from] RegistryError),

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key material that is wiped on drop and never printed
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    pub fn new(secret: String) -> Self {
        Self { inner: secret }
    }

    /// Use sparingly
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretString")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(secret: &str) -> Self {
        Self::new(secret.to_string())
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hex signer key, `0x` prefix optional
    pub private_key: SecretString,
    /// Bound on every RPC call and on each endpoint dial
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Bound on the liveness probe before a connection is handed out
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: Duration,
    /// Extra or replacement networks, keyed by network name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkDescriptor>,
}

impl ClientConfig {
    pub fn new(private_key: impl Into<SecretString>) -> Self {
        Self {
            private_key: private_key.into(),
            request_timeout: default_request_timeout(),
            probe_timeout: default_probe_timeout(),
            networks: BTreeMap::new(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_network(mut self, name: impl Into<String>, descriptor: NetworkDescriptor) -> Self {
        self.networks.insert(name.into(), descriptor);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.private_key.is_empty() {
            return Err(ConfigError::MissingPrivateKey);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("request timeout"));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("probe timeout"));
        }
        if self.probe_timeout > self.request_timeout {
            return Err(ConfigError::ProbeExceedsRequest {
                probe: self.probe_timeout,
                request: self.request_timeout,
            });
        }
        Ok(())
    }

    /// Built-in networks with this config's overrides applied
    pub fn registry(&self) -> Result<NetworkRegistry, ConfigError> {
        let registry = NetworkRegistry::builtin().with_overrides(
            self.networks
                .iter()
                .map(|(name, descriptor)| (name.clone(), descriptor.clone())),
        )?;
        Ok(registry)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            dial_timeout: self.request_timeout,
            probe_timeout: self.probe_timeout,
            request_timeout: self.request_timeout,
        }
    }
}
