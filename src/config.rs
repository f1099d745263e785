use anyhow::{anyhow, Result};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::collections::HashMap;
use std::env;
use url::Url;

use crate::transfer_form::{Destination, FormPolicy, SourceChain};
use crate::user_settings::UserSettings;

/// A predefined EVM network reachable through the interchain gateway.
///
/// `label` doubles as the gateway chain name passed to `sendToMany`.
#[derive(Clone, Debug)]
pub struct EvmNetwork {
    pub label: &'static str,
    pub chain_id: u64,
    pub native_token: &'static str,
    pub default_rpc: &'static str,
    pub explorer: &'static str,
}

impl EvmNetwork {
    pub const fn new(
        label: &'static str,
        chain_id: u64,
        native_token: &'static str,
        default_rpc: &'static str,
        explorer: &'static str,
    ) -> Self {
        Self {
            label,
            chain_id,
            native_token,
            default_rpc,
            explorer,
        }
    }
}

/// Testnets with a gateway deployment.
pub const NETWORKS: &[EvmNetwork] = &[
    EvmNetwork::new("Ethereum", 5, "ETH", "https://rpc.ankr.com/eth_goerli", "https://goerli.etherscan.io"),
    EvmNetwork::new("Avalanche", 43113, "AVAX", "https://api.avax-test.network/ext/bc/C/rpc", "https://testnet.snowtrace.io"),
    EvmNetwork::new("Polygon", 80001, "MATIC", "https://rpc-mumbai.maticvigil.com", "https://mumbai.polygonscan.com"),
    EvmNetwork::new("Fantom", 4002, "FTM", "https://rpc.testnet.fantom.network", "https://testnet.ftmscan.com"),
    EvmNetwork::new("Moonbeam", 1287, "DEV", "https://rpc.api.moonbase.moonbeam.network", "https://moonbase.moonscan.io"),
];

/// Chain the app starts on when nothing else is configured (Polygon Mumbai).
pub const DEFAULT_CHAIN_ID: u64 = 80001;

/// The only token the distribution contract accepts.
pub const DEFAULT_SUPPORTED_ASSET: &str = "aUSDC";

/// Native value attached to every distribution call to prepay cross-chain gas.
pub const DEFAULT_GAS_PAYMENT: &str = "0.01";

/// `{tx}` is replaced with the transaction hash.
pub const DEFAULT_EXPLORER_TX_TEMPLATE: &str = "https://testnet.axelarscan.io/gmp/{tx}";

pub const DEFAULT_MORALIS_API_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Prefix of the environment variables carrying per-chain distributor addresses.
const DISTRIBUTOR_ENV_PREFIX: &str = "DISTRIBUTOR_";

/// Find a network by chain ID
pub fn find_network_by_chain_id(chain_id: u64) -> Option<&'static EvmNetwork> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Parse an RPC endpoint, accepting only http(s) URLs with a host.
pub fn parse_rpc_url(rpc_url: &str) -> Result<Url> {
    let trimmed = rpc_url.trim();
    let url = Url::parse(trimmed).map_err(|e| anyhow!("Invalid RPC URL '{}': {}", trimmed, e))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(anyhow!("RPC URL '{}' must be an http(s) endpoint", trimmed)),
    }
}

/// Build an HTTP provider for `rpc_url`.
pub fn get_provider(rpc_url: &str) -> Result<Provider<Http>> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(Provider::new(Http::new(url)))
}

/// Compose the explorer link for a transaction hash.
pub fn compose_tx_explorer_url(template: &str, tx_hash: &str) -> String {
    if template.contains("{tx}") {
        template.replace("{tx}", tx_hash)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), tx_hash)
    }
}

/// Get the full URL to view an address on the chain's block explorer
pub fn get_address_explorer_url(chain_id: u64, address: &str) -> Option<String> {
    find_network_by_chain_id(chain_id).map(|n| format!("{}/address/{}", n.explorer, address))
}

/// Collect `DISTRIBUTOR_<chain_id>=0x...` pairs.
fn distributors_from_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<u64, Address> {
    let mut distributors = HashMap::new();
    for (key, value) in vars {
        let Some(chain) = key.strip_prefix(DISTRIBUTOR_ENV_PREFIX) else {
            continue;
        };
        match (chain.parse::<u64>(), value.trim().parse::<Address>()) {
            (Ok(chain_id), Ok(address)) => {
                distributors.insert(chain_id, address);
            }
            _ => tracing::warn!("Ignoring malformed distributor entry {}={}", key, value),
        }
    }
    distributors
}

/// A chain the registry knows, with its distribution contract if one is deployed.
#[derive(Clone, Debug)]
pub struct ChainEntry {
    pub network: &'static EvmNetwork,
    pub distributor: Option<Address>,
}

impl ChainEntry {
    /// The destination selection for this chain; chains without a distributor
    /// cannot receive transfers.
    pub fn as_destination(&self) -> Option<Destination> {
        self.distributor.map(|distributor| Destination {
            chain_name: self.network.label.to_string(),
            chain_id: self.network.chain_id,
            distributor,
        })
    }
}

/// Chain id to name and distribution contract lookup.
#[derive(Clone, Debug)]
pub struct ChainRegistry {
    entries: Vec<ChainEntry>,
}

impl ChainRegistry {
    pub fn new(distributors: &HashMap<u64, Address>) -> Self {
        let entries = NETWORKS
            .iter()
            .map(|network| ChainEntry {
                network,
                distributor: distributors.get(&network.chain_id).copied(),
            })
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, chain_id: u64) -> Option<&ChainEntry> {
        self.entries.iter().find(|e| e.network.chain_id == chain_id)
    }

    /// Resolve the source side of a transfer. A lookup miss leaves the
    /// distributor unset, which keeps submission disabled.
    pub fn source_chain(&self, chain_id: u64) -> SourceChain {
        match self.lookup(chain_id) {
            Some(entry) => SourceChain {
                chain_id,
                chain_name: entry.network.label.to_string(),
                distributor: entry.distributor,
            },
            None => SourceChain {
                chain_id,
                chain_name: "Unknown".to_string(),
                distributor: None,
            },
        }
    }

    /// Destinations selectable from `source_chain_id`; the source itself is never offered.
    pub fn destinations_from(&self, source_chain_id: u64) -> Vec<Destination> {
        self.entries
            .iter()
            .filter(|e| e.network.chain_id != source_chain_id)
            .filter_map(ChainEntry::as_destination)
            .collect()
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }
}

#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Signing key; without it the app is read-only and submission stays disabled.
    pub signer: Option<LocalWallet>,
    /// Address to show balances for when no signer is configured.
    pub watch_address: Option<Address>,
    pub moralis_api_key: Option<String>,
    pub moralis_api_url: String,
    pub gas_payment: U256,
    pub supported_asset: String,
    pub explorer_tx_template: String,
    pub distributors: HashMap<u64, Address>,
    pub hide_spam: bool,
}

impl Config {
    pub fn new(rpc_url: String, chain_id: u64) -> Self {
        let signer = env::var("WALLET_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .and_then(|key| match key.trim().parse::<LocalWallet>() {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    tracing::warn!("WALLET_PRIVATE_KEY is not a valid key: {}", e);
                    None
                }
            });

        let watch_address = env::var("WALLET_ADDRESS")
            .ok()
            .and_then(|a| a.trim().parse::<Address>().ok());

        let gas_payment = env::var("GAS_PAYMENT")
            .ok()
            .and_then(|v| ethers::utils::parse_ether(v.trim()).ok())
            .or_else(|| ethers::utils::parse_ether(DEFAULT_GAS_PAYMENT).ok())
            .unwrap_or_default();

        Self {
            rpc_url,
            chain_id,
            signer,
            watch_address,
            moralis_api_key: env::var("MORALIS_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            moralis_api_url: env::var("MORALIS_API_URL")
                .unwrap_or_else(|_| DEFAULT_MORALIS_API_URL.to_string()),
            gas_payment,
            supported_asset: env::var("SUPPORTED_ASSET")
                .unwrap_or_else(|_| DEFAULT_SUPPORTED_ASSET.to_string()),
            explorer_tx_template: env::var("EXPLORER_TX_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_TX_TEMPLATE.to_string()),
            distributors: distributors_from_vars(env::vars()),
            hide_spam: true,
        }
    }

    pub fn from_network(network: &EvmNetwork) -> Self {
        Self::new(network.default_rpc.to_string(), network.chain_id)
    }

    /// Overlay persisted user settings on top of the environment.
    pub fn apply_settings(&mut self, settings: &UserSettings) {
        if let Some(network) = find_network_by_chain_id(settings.selected_chain_id) {
            self.chain_id = network.chain_id;
            self.rpc_url = network.default_rpc.to_string();
        }
        if let Some(rpc) = settings.get_custom_rpc(self.chain_id) {
            self.rpc_url = rpc.clone();
        }
        for (chain_id, address) in settings.distributor_addresses() {
            self.distributors.insert(chain_id, address);
        }
        if let Some(payment) = settings
            .gas_payment
            .as_deref()
            .and_then(|p| ethers::utils::parse_ether(p.trim()).ok())
        {
            self.gas_payment = payment;
        }
        self.hide_spam = settings.hide_spam;
    }

    /// Switch the active chain, keeping wallet and API settings.
    pub fn switch_chain(&mut self, network: &EvmNetwork, settings: &UserSettings) {
        self.chain_id = network.chain_id;
        self.rpc_url = settings
            .get_custom_rpc(network.chain_id)
            .cloned()
            .unwrap_or_else(|| network.default_rpc.to_string());
    }

    /// The address whose balances are shown: the signer's if present.
    pub fn wallet_address(&self) -> Option<Address> {
        self.signer
            .as_ref()
            .map(|s| s.address())
            .or(self.watch_address)
    }

    pub fn native_token(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.native_token)
            .unwrap_or("ETH")
    }

    pub fn network_label(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.label)
            .unwrap_or("Unknown")
    }

    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(&self.distributors)
    }

    pub fn form_policy(&self) -> FormPolicy {
        FormPolicy {
            supported_asset: self.supported_asset.clone(),
            gas_payment: self.gas_payment,
            explorer_tx_template: self.explorer_tx_template.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        if let Some(network) = find_network_by_chain_id(DEFAULT_CHAIN_ID) {
            Self::from_network(network)
        } else {
            Self::new("https://rpc-mumbai.maticvigil.com".to_string(), DEFAULT_CHAIN_ID)
        }
    }
}
