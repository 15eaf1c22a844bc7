//! Configuration for the Verdict governance agent.
//!
//! Settings are loaded once at startup from a YAML file (path taken from the
//! `VERDICT_CONFIG_FILE` environment variable) or assembled from individual
//! environment variables, and stay immutable for the process lifetime.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file: {0}")]
    FileReadError(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParseError(#[from] serde_yaml::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Supported blockchain networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Gnosis,
    Base,
    Mode,
}

impl Chain {
    /// All supported chains, in declaration order.
    pub const ALL: [Chain; 4] = [Chain::Ethereum, Chain::Gnosis, Chain::Base, Chain::Mode];

    /// Priority order for transaction submission, cheapest gas first.
    pub const COST_PRIORITY: [Chain; 4] =
        [Chain::Gnosis, Chain::Mode, Chain::Base, Chain::Ethereum];

    /// The network's chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Gnosis => 100,
            Chain::Base => 8453,
            Chain::Mode => 34443,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Gnosis => "gnosis",
            Chain::Base => "base",
            Chain::Mode => "mode",
        }
    }

    /// Default relay (transaction service) URL for the chain, if one is
    /// publicly operated.
    pub fn default_relay_url(&self) -> Option<&'static str> {
        match self {
            Chain::Ethereum => Some("https://safe-transaction-mainnet.safe.global"),
            Chain::Gnosis => Some("https://safe-transaction-gnosis-chain.safe.global"),
            Chain::Base => Some("https://safe-transaction-base.safe.global"),
            Chain::Mode => Some("https://safe-transaction-mode.safe.global"),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "gnosis" => Ok(Chain::Gnosis),
            "base" => Ok(Chain::Base),
            "mode" => Ok(Chain::Mode),
            other => Err(ConfigError::InvalidValue(
                "chain".to_string(),
                other.to_string(),
            )),
        }
    }
}

/// Per-chain endpoint configuration.
///
/// A chain is considered fully configured only when the multisig address,
/// the RPC endpoint and a relay service URL are all known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainEndpoint {
    /// Address of the agent's multisig wallet on this chain
    #[serde(default)]
    pub multisig_address: Option<Address>,
    /// JSON-RPC endpoint URL
    #[serde(default)]
    pub rpc_endpoint: Option<String>,
    /// Relay/transaction-service URL override
    #[serde(default)]
    pub relay_service_url: Option<String>,
}

/// Attestation registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Address of the canonical attestation registry (or its typed-data proxy)
    #[serde(default)]
    pub registry_address: Option<Address>,
    /// Schema identifier registered with the attestation registry
    #[serde(default)]
    pub schema_uid: Option<B256>,
    /// Optional tracking-wrapper contract that forwards to the registry
    #[serde(default)]
    pub wrapper_address: Option<Address>,
    /// Chain on which attestations are recorded
    #[serde(default = "default_attestation_chain")]
    pub chain: Chain,
    /// Fixed gas allowance for attestation transactions
    #[serde(default = "default_attestation_gas")]
    pub gas_limit: u64,
}

fn default_attestation_chain() -> Chain {
    Chain::Base
}

fn default_attestation_gas() -> u64 {
    1_000_000
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            registry_address: None,
            schema_uid: None,
            wrapper_address: None,
            chain: default_attestation_chain(),
            gas_limit: default_attestation_gas(),
        }
    }
}

/// Main agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Endpoint configuration per chain
    #[serde(default)]
    pub chains: HashMap<Chain, ChainEndpoint>,
    /// Attestation registry settings
    #[serde(default)]
    pub attestation: AttestationConfig,
    /// Directory containing the signing key file
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    /// Directory for checkpoint storage
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
}

fn default_key_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("store")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
            attestation: AttestationConfig::default(),
            key_dir: default_key_dir(),
            store_dir: default_store_dir(),
        }
    }
}

impl Settings {
    /// Load configuration, preferring the file named by `VERDICT_CONFIG_FILE`
    /// and falling back to per-chain environment variables.
    pub fn load() -> ConfigResult<Self> {
        if let Ok(path) = env::var("VERDICT_CONFIG_FILE") {
            return Self::from_file(&path);
        }
        Self::from_env()
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {}", path.display(), e)))?;
        let settings = serde_yaml::from_str(&contents)?;
        Ok(settings)
    }

    /// Build configuration from environment variables.
    ///
    /// Recognized variables, per chain (upper-cased chain name):
    /// `VERDICT_<CHAIN>_MULTISIG`, `VERDICT_<CHAIN>_RPC`,
    /// `VERDICT_<CHAIN>_RELAY_URL`; plus `VERDICT_REGISTRY_ADDRESS`,
    /// `VERDICT_SCHEMA_UID`, `VERDICT_WRAPPER_ADDRESS`,
    /// `VERDICT_ATTESTATION_CHAIN`, `VERDICT_KEY_DIR` and `VERDICT_STORE_DIR`.
    pub fn from_env() -> ConfigResult<Self> {
        let mut chains = HashMap::new();
        for chain in Chain::ALL {
            let prefix = format!("VERDICT_{}", chain.as_str().to_ascii_uppercase());
            let multisig_address =
                parse_env_address(&format!("{}_MULTISIG", prefix))?;
            let rpc_endpoint = env::var(format!("{}_RPC", prefix)).ok();
            let relay_service_url = env::var(format!("{}_RELAY_URL", prefix)).ok();
            if multisig_address.is_some() || rpc_endpoint.is_some() || relay_service_url.is_some() {
                chains.insert(
                    chain,
                    ChainEndpoint {
                        multisig_address,
                        rpc_endpoint,
                        relay_service_url,
                    },
                );
            }
        }

        let attestation = AttestationConfig {
            registry_address: parse_env_address("VERDICT_REGISTRY_ADDRESS")?,
            schema_uid: parse_env_b256("VERDICT_SCHEMA_UID")?,
            wrapper_address: parse_env_address("VERDICT_WRAPPER_ADDRESS")?,
            chain: match env::var("VERDICT_ATTESTATION_CHAIN") {
                Ok(value) => value.parse()?,
                Err(_) => default_attestation_chain(),
            },
            gas_limit: default_attestation_gas(),
        };

        Ok(Self {
            chains,
            attestation,
            key_dir: env::var("VERDICT_KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_key_dir()),
            store_dir: env::var("VERDICT_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_dir()),
        })
    }

    /// Endpoint configuration for a chain, if any was provided.
    pub fn endpoint(&self, chain: Chain) -> Option<&ChainEndpoint> {
        self.chains.get(&chain)
    }

    /// The multisig wallet address configured for a chain.
    pub fn multisig_address(&self, chain: Chain) -> Option<Address> {
        self.endpoint(chain).and_then(|e| e.multisig_address)
    }

    /// The RPC endpoint configured for a chain.
    pub fn rpc_endpoint(&self, chain: Chain) -> Option<&str> {
        self.endpoint(chain).and_then(|e| e.rpc_endpoint.as_deref())
    }

    /// Relay service URL for a chain: the configured override, or the
    /// default public service when one exists.
    pub fn relay_url(&self, chain: Chain) -> Option<String> {
        if let Some(url) = self
            .endpoint(chain)
            .and_then(|e| e.relay_service_url.clone())
        {
            return Some(url);
        }
        chain.default_relay_url().map(str::to_string)
    }

    /// Whether a chain has everything needed to submit multisig
    /// transactions: a multisig address, an RPC endpoint and a known relay
    /// service.
    pub fn is_chain_fully_configured(&self, chain: Chain) -> bool {
        self.multisig_address(chain).is_some()
            && self.rpc_endpoint(chain).is_some()
            && self.relay_url(chain).is_some()
    }
}

fn parse_env_address(name: &str) -> ConfigResult<Option<Address>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), value)),
        Err(_) => Ok(None),
    }
}

fn parse_env_b256(name: &str) -> ConfigResult<Option<B256>> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), value)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn endpoint(multisig: Option<&str>, rpc: Option<&str>) -> ChainEndpoint {
        ChainEndpoint {
            multisig_address: multisig.map(|a| a.parse().unwrap()),
            rpc_endpoint: rpc.map(str::to_string),
            relay_service_url: None,
        }
    }

    #[test]
    fn chain_parsing_round_trips() {
        for chain in Chain::ALL {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
        }
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn fully_configured_requires_all_three_fields() {
        let mut settings = Settings::default();
        settings.chains.insert(
            Chain::Gnosis,
            endpoint(
                Some("0x1111111111111111111111111111111111111111"),
                Some("https://rpc.gnosischain.com"),
            ),
        );
        // Relay URL falls back to the default public service.
        assert!(settings.is_chain_fully_configured(Chain::Gnosis));

        settings
            .chains
            .insert(Chain::Base, endpoint(None, Some("https://base.example")));
        assert!(!settings.is_chain_fully_configured(Chain::Base));

        settings.chains.insert(
            Chain::Mode,
            endpoint(Some("0x2222222222222222222222222222222222222222"), None),
        );
        assert!(!settings.is_chain_fully_configured(Chain::Mode));
        assert!(!settings.is_chain_fully_configured(Chain::Ethereum));
    }

    #[test]
    fn relay_url_override_wins_over_default() {
        let mut settings = Settings::default();
        settings.chains.insert(
            Chain::Base,
            ChainEndpoint {
                multisig_address: None,
                rpc_endpoint: None,
                relay_service_url: Some("https://relay.internal".to_string()),
            },
        );
        assert_eq!(
            settings.relay_url(Chain::Base).as_deref(),
            Some("https://relay.internal")
        );
        assert_eq!(
            settings.relay_url(Chain::Gnosis).as_deref(),
            Some("https://safe-transaction-gnosis-chain.safe.global")
        );
    }

    #[test]
    fn yaml_file_loads_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
chains:
  gnosis:
    multisig_address: "0x3333333333333333333333333333333333333333"
    rpc_endpoint: "https://rpc.gnosischain.com"
attestation:
  registry_address: "0x4444444444444444444444444444444444444444"
  schema_uid: "0x0101010101010101010101010101010101010101010101010101010101010101"
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.is_chain_fully_configured(Chain::Gnosis));
        assert_eq!(settings.attestation.chain, Chain::Base);
        assert_eq!(settings.attestation.gas_limit, 1_000_000);
        assert!(settings.attestation.wrapper_address.is_none());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Settings::from_file("/nonexistent/verdict.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
