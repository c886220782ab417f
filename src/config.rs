//! Configuration for agora-verifier.

use serde::{Deserialize, Serialize};

/// Ethereum network used for purchase verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EthNetworkConfig {
    /// Ethereum mainnet.
    Mainnet,
    /// Sepolia testnet.
    #[default]
    Sepolia,
}

/// Chain access configuration.
///
/// Purchases require an RPC endpoint and a platform receiving address.
/// Both are optional at startup: when either is missing the transaction
/// verifier reports `ServiceUnavailable` instead of crashing, so the
/// rest of the platform keeps working with purchases disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Ethereum network for purchase verification.
    #[serde(default)]
    pub network: EthNetworkConfig,

    /// JSON-RPC endpoint URL (e.g. an Infura/Alchemy Sepolia URL).
    /// If not set, on-chain verification is disabled.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Platform address purchases must pay into (e.g. "0x...").
    /// If not set, purchases are disabled.
    #[serde(default)]
    pub receiving_address: Option<String>,

    /// Per-request timeout in seconds for chain queries.
    /// Timeouts surface as a retryable service-unavailable condition.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: EthNetworkConfig::default(),
            rpc_url: None,
            receiving_address: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Purchase policy configuration.
///
/// Amounts are decimal ETH strings; they are parsed into exact wei when
/// the policy is built, so a malformed value fails at startup rather
/// than during a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// ETH price of one token unit.
    #[serde(default = "default_unit_price")]
    pub unit_price_eth: String,

    /// Minimum token units per purchase.
    #[serde(default = "default_min_purchase")]
    pub min_purchase: u64,

    /// Maximum token units per purchase.
    #[serde(default = "default_max_purchase")]
    pub max_purchase: u64,

    /// Absolute tolerance in ETH for price and on-chain value
    /// comparisons, absorbing decimal-formatting noise from clients.
    #[serde(default = "default_tolerance")]
    pub tolerance_eth: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unit_price_eth: default_unit_price(),
            min_purchase: default_min_purchase(),
            max_purchase: default_max_purchase(),
            tolerance_eth: default_tolerance(),
        }
    }
}

/// Top-level verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Chain access configuration.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Purchase policy configuration.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Capacity of the in-process verified-transaction cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            policy: PolicyConfig::default(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl VerifierConfig {
    /// Create a Sepolia testnet configuration preset.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - JSON-RPC endpoint for Sepolia
    /// * `receiving_address` - Platform address purchases pay into
    #[must_use]
    pub fn testnet(rpc_url: &str, receiving_address: &str) -> Self {
        Self {
            chain: ChainConfig {
                network: EthNetworkConfig::Sepolia,
                rpc_url: Some(rpc_url.to_string()),
                receiving_address: Some(receiving_address.to_string()),
                request_timeout_secs: default_request_timeout(),
            },
            ..Self::default()
        }
    }

    /// Check if on-chain verification can be performed at all.
    #[must_use]
    pub fn chain_access_configured(&self) -> bool {
        self.chain.rpc_url.is_some() && self.chain.receiving_address.is_some()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

const fn default_request_timeout() -> u64 {
    30
}

fn default_unit_price() -> String {
    "0.001".to_string()
}

const fn default_min_purchase() -> u64 {
    1
}

const fn default_max_purchase() -> u64 {
    10_000
}

fn default_tolerance() -> String {
    "0.0001".to_string()
}

const fn default_cache_capacity() -> usize {
    10_000
}
