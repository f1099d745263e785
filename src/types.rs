//! Common types shared across modules.

use ethers::prelude::*;

/// One ERC20 holding of the active wallet on the active chain.
///
/// Rows arrive as a whole snapshot from a [`crate::balance::BalanceSource`]
/// and are never edited in place; a new query replaces the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub token_symbol: String,
    pub token_name: String,
    pub token_address: Address,
    pub human_readable_value: String,
    pub decimals: u8,
    pub logo_ref: Option<String>,
    pub possible_spam: bool,
}

impl BalanceRow {
    pub fn new(
        token_symbol: impl Into<String>,
        token_address: Address,
        human_readable_value: impl Into<String>,
        decimals: u8,
    ) -> Self {
        let token_symbol = token_symbol.into();
        Self {
            token_name: token_symbol.clone(),
            token_symbol,
            token_address,
            human_readable_value: human_readable_value.into(),
            decimals,
            logo_ref: None,
            possible_spam: false,
        }
    }
}
