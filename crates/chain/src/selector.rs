//! Chain selection.

use thiserror::Error;
use tracing::debug;

use verdict_config::{Chain, Settings};

/// No chain has a multisig address, RPC endpoint and relay service together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no valid chain configuration found")]
pub struct NoValidChainError;

/// Pick the cheapest fully-configured chain, walking the cost-priority list
/// lowest expected fees first.
///
/// With the closed [`Chain`] enum the priority list covers every supported
/// network, so there is no separate any-order fallback pass.
pub fn select_optimal_chain(settings: &Settings) -> Result<Chain, NoValidChainError> {
    for chain in Chain::COST_PRIORITY {
        if settings.is_chain_fully_configured(chain) {
            debug!(%chain, "selected optimal chain");
            return Ok(chain);
        }
    }
    Err(NoValidChainError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_config::ChainEndpoint;

    fn configured_endpoint() -> ChainEndpoint {
        ChainEndpoint {
            multisig_address: Some(
                "0x1111111111111111111111111111111111111111".parse().unwrap(),
            ),
            rpc_endpoint: Some("https://rpc.example".to_string()),
            relay_service_url: None,
        }
    }

    #[test]
    fn prefers_cheapest_configured_chain() {
        let mut settings = Settings::default();
        settings.chains.insert(Chain::Ethereum, configured_endpoint());
        settings.chains.insert(Chain::Base, configured_endpoint());
        assert_eq!(select_optimal_chain(&settings).unwrap(), Chain::Base);

        settings.chains.insert(Chain::Gnosis, configured_endpoint());
        assert_eq!(select_optimal_chain(&settings).unwrap(), Chain::Gnosis);
    }

    #[test]
    fn partially_configured_chains_are_skipped() {
        let mut settings = Settings::default();
        settings.chains.insert(
            Chain::Gnosis,
            ChainEndpoint {
                multisig_address: None,
                rpc_endpoint: Some("https://rpc.gnosischain.com".to_string()),
                relay_service_url: None,
            },
        );
        settings.chains.insert(Chain::Ethereum, configured_endpoint());
        assert_eq!(select_optimal_chain(&settings).unwrap(), Chain::Ethereum);
    }

    #[test]
    fn fails_when_nothing_is_configured() {
        let settings = Settings::default();
        assert_eq!(select_optimal_chain(&settings), Err(NoValidChainError));
    }
}
