//! Conversions between human readable ether amounts and wei.

use crate::error::DappError;
use ethers::types::U256;
use ethers::utils::{self, parse_ether};

pub const ETHER_DECIMALS: usize = 18;

/// Formats a wei amount as decimal ether at full precision.
///
/// Trailing fractional zeros are dropped but at least one fractional digit
/// is kept, so `1_500_000_000_000_000_000` renders as `1.5` and one ether as
/// `1.0`.
pub fn format_ether(wei: U256) -> String {
    // always `<integer>.<18 digits>`
    let full = utils::format_ether(wei);
    let trimmed = full.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parses a user supplied ether amount into wei.
///
/// Negative amounts and anything that is not a plain decimal are rejected.
pub fn parse_amount(input: &str) -> Result<U256, DappError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DappError::InvalidInput("amount is required".into()));
    }
    if input.starts_with('-') {
        return Err(DappError::InvalidInput(
            "amount must not be negative".into(),
        ));
    }
    if !input.chars().all(|c| c.is_ascii_digit() || c == '.')
        || input.matches('.').count() > 1
        || input == "."
    {
        return Err(DappError::InvalidInput(format!(
            "invalid amount: {}",
            input
        )));
    }
    if let Some((_, fraction)) = input.split_once('.') {
        if fraction.len() > ETHER_DECIMALS {
            return Err(DappError::InvalidInput(format!(
                "amount has more than {} decimals",
                ETHER_DECIMALS
            )));
        }
    }

    parse_ether(input).map_err(|e| DappError::InvalidInput(format!("invalid amount: {}", e)))
}
