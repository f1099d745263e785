use ethers::types::U256;
use anyhow::{anyhow, Result};

/// Separator between receiver addresses in the per-row input.
pub const RECEIVER_DELIMITER: char = ',';

pub fn format_ether(wei: U256) -> String {
    ethers::utils::format_units(wei, "ether").unwrap_or_else(|_| "0.0".to_string())
}

/// Format a raw token balance with the token's decimals, dropping trailing zeros.
pub fn format_token_units(raw: U256, decimals: u8) -> String {
    let formatted = ethers::utils::format_units(raw, decimals as u32)
        .unwrap_or_else(|_| raw.to_string());
    trim_fraction(&formatted)
}

fn trim_fraction(value: &str) -> String {
    if !value.contains('.') {
        return value.to_string();
    }
    let trimmed = value.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a decimal token amount string into base units for a token with `decimals`.
///
/// String parsing keeps full precision; the float value shown in the form is
/// never used for the on-chain amount.
///
/// # Errors
/// Returns an error if the string is empty, not a decimal number, or has more
/// fractional digits than the token supports.
pub fn parse_token_amount(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Token amount cannot be empty"));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(anyhow!(
                "Amount '{}' has more than {} decimal places",
                trimmed,
                decimals
            ));
        }
    }

    ethers::utils::parse_units(trimmed, decimals as u32)
        .map(|pu| pu.into())
        .map_err(|e| anyhow!("Invalid token amount '{}': {}", trimmed, e))
}

/// Parse the free-text amount field of a transfer row.
///
/// Anything that is not a finite, non-negative number is `None`. A `None`
/// amount can never be submitted, so garbage input never turns into a zero
/// transfer.
pub fn parse_amount_input(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Split raw receiver text into trimmed, non-empty entries, keeping their order.
pub fn split_receivers(raw: &str) -> Vec<String> {
    raw.split(RECEIVER_DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shorten a long identifier to `0x1234...abcdef` style for table cells.
pub fn ellipsis_text(text: &str, keep: usize) -> String {
    if text.len() <= keep * 2 + 3 || !text.is_ascii() {
        return text.to_string();
    }
    format!("{}...{}", &text[..keep], &text[text.len() - keep..])
}
