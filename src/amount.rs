//! Decimal ETH amounts as exact wei integers.
//!
//! Prices arrive from clients as decimal strings ("0.001", "0.100000")
//! and from the chain as wei quantities. All comparisons happen in wei
//! (`u128`) so no value ever rounds through a float.

use crate::error::{Error, Result};
use primitive_types::U256;

/// Wei per ETH (10^18).
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Number of decimal digits in one ETH.
const ETH_DECIMALS: usize = 18;

/// Parse a decimal ETH string into wei.
///
/// Accepts plain non-negative decimals like `"1"`, `"0.001"` or
/// `"0.100000"`. More than 18 fractional digits, signs, exponents and
/// empty parts are rejected.
///
/// # Errors
///
/// Returns [`Error::Amount`] if the string is not a well-formed decimal
/// or the value overflows.
pub fn parse_eth(value: &str) -> Result<u128> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Amount("empty amount string".to_string()));
    }

    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(Error::Amount(format!("invalid amount: {value}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::Amount(format!("invalid amount: {value}")));
    }
    if frac_part.len() > ETH_DECIMALS {
        return Err(Error::Amount(format!(
            "amount {value} has more than {ETH_DECIMALS} decimal places"
        )));
    }

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| Error::Amount(format!("amount too large: {value}")))?
    };

    // Pad the fraction out to 18 digits: "1" -> 100000000000000000 wei.
    let mut frac: u128 = 0;
    if !frac_part.is_empty() {
        frac = frac_part
            .parse()
            .map_err(|_| Error::Amount(format!("invalid amount: {value}")))?;
        for _ in frac_part.len()..ETH_DECIMALS {
            frac *= 10;
        }
    }

    whole
        .checked_mul(WEI_PER_ETH)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| Error::Amount(format!("amount too large: {value}")))
}

/// Format wei as a decimal ETH string with trailing zeros trimmed.
#[must_use]
pub fn format_eth(wei: u128) -> String {
    let whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Check whether two wei amounts are equal within an absolute tolerance.
///
/// The tolerance absorbs decimal-formatting noise from clients; it is
/// shared by the parameter validator and the transaction verifier.
#[must_use]
pub fn within_tolerance(a: u128, b: u128, tolerance: u128) -> bool {
    a.abs_diff(b) <= tolerance
}

/// Convert an on-chain `U256` value into wei.
///
/// Values beyond `u128` cannot correspond to any realistic payment and
/// fail closed as `None`.
#[must_use]
pub fn wei_from_u256(value: U256) -> Option<u128> {
    if value > U256::from(u128::MAX) {
        return None;
    }
    Some(value.as_u128())
}
