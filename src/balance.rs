//! ERC20 balance lookup.
//!
//! Balances come from the Moralis wallet API rather than per-token RPC calls,
//! so one request returns every ERC20 the wallet holds on a chain.

use anyhow::{anyhow, Result};
use ethers::prelude::*;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info};

use crate::config::Config;
use crate::types::BalanceRow;
use crate::utils;

/// Supplies the ERC20 holdings of a wallet on a chain.
///
/// An empty result is a valid "no tokens" answer, not an error. Lookups run
/// on background threads, so the returned future must be `Send`.
pub trait BalanceSource {
    fn fetch_balances(
        &self,
        wallet: Address,
        chain_id: u64,
    ) -> impl Future<Output = Result<Vec<BalanceRow>>> + Send;
}

/// Decimals arrive as a number or a numeric string depending on the endpoint version.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum Decimals {
    Number(u64),
    Text(String),
}

impl Decimals {
    fn as_u8(&self) -> Result<u8> {
        let value = match self {
            Decimals::Number(n) => *n,
            Decimals::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("Invalid decimals '{}'", s))?,
        };
        u8::try_from(value).map_err(|_| anyhow!("Decimals {} out of range", value))
    }
}

/// One entry of `GET /{address}/erc20`.
#[derive(Deserialize, Debug, Clone)]
struct MoralisToken {
    token_address: String,
    symbol: Option<String>,
    name: Option<String>,
    logo: Option<String>,
    thumbnail: Option<String>,
    decimals: Option<Decimals>,
    balance: String,
    #[serde(default)]
    possible_spam: bool,
}

impl MoralisToken {
    fn into_row(self) -> Result<BalanceRow> {
        let token_address = self
            .token_address
            .parse::<Address>()
            .map_err(|_| anyhow!("Invalid token address '{}'", self.token_address))?;
        let decimals = match &self.decimals {
            Some(d) => d.as_u8()?,
            None => 18,
        };
        let raw = U256::from_dec_str(self.balance.trim())
            .map_err(|e| anyhow!("Invalid balance '{}': {}", self.balance, e))?;
        let symbol = self.symbol.unwrap_or_else(|| "???".to_string());

        Ok(BalanceRow {
            token_name: self.name.unwrap_or_else(|| symbol.clone()),
            token_symbol: symbol,
            token_address,
            human_readable_value: utils::format_token_units(raw, decimals),
            decimals,
            logo_ref: self.logo.or(self.thumbnail),
            possible_spam: self.possible_spam,
        })
    }
}

/// Parse a Moralis token list. Entries that cannot be read are skipped, and
/// spam-flagged tokens are dropped when `hide_spam` is set.
fn parse_token_list(body: &str, hide_spam: bool) -> Result<Vec<BalanceRow>> {
    let tokens: Vec<MoralisToken> = serde_json::from_str(body)?;
    let mut rows = Vec::with_capacity(tokens.len());
    for token in tokens {
        if hide_spam && token.possible_spam {
            debug!("Hiding spam token {}", token.token_address);
            continue;
        }
        let address = token.token_address.clone();
        match token.into_row() {
            Ok(row) => rows.push(row),
            Err(e) => debug!("Skipping token {}: {}", address, e),
        }
    }
    Ok(rows)
}

#[derive(Clone, Debug)]
pub struct MoralisBalanceSource {
    api_url: String,
    api_key: Option<String>,
    hide_spam: bool,
}

impl MoralisBalanceSource {
    pub fn new(api_url: String, api_key: Option<String>, hide_spam: bool) -> Self {
        Self {
            api_url,
            api_key,
            hide_spam,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.moralis_api_url.clone(),
            config.moralis_api_key.clone(),
            config.hide_spam,
        )
    }

    fn endpoint(&self, wallet: Address, chain_id: u64) -> String {
        format!(
            "{}/{:?}/erc20?chain={:#x}",
            self.api_url.trim_end_matches('/'),
            wallet,
            chain_id
        )
    }
}

impl BalanceSource for MoralisBalanceSource {
    async fn fetch_balances(&self, wallet: Address, chain_id: u64) -> Result<Vec<BalanceRow>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("MORALIS_API_KEY is not set"))?;

        let url = self.endpoint(wallet, chain_id);
        debug!("Fetching balances from {}", url);
        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header("X-API-Key", api_key)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("Balance API returned {}: {}", status, body));
        }

        let rows = parse_token_list(&body, self.hide_spam)?;
        info!(
            "Loaded {} ERC20 balances for {:?} on chain {}",
            rows.len(),
            wallet,
            chain_id
        );
        Ok(rows)
    }
}
