//! Purchase parameter validation.
//!
//! Pure, deterministic checks over the client's claimed purchase
//! parameters. Runs before any account lookup or network call so
//! obviously bad input fails fast and cheap.

use crate::amount::{self, format_eth, within_tolerance};
use crate::config::PolicyConfig;
use crate::error::{Error, Result};

/// Purchase policy with amounts resolved to exact wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchasePolicy {
    /// Wei price of one token unit.
    pub unit_price_wei: u128,
    /// Minimum token units per purchase.
    pub min_units: u64,
    /// Maximum token units per purchase.
    pub max_units: u64,
    /// Absolute comparison tolerance in wei, shared with the
    /// transaction verifier.
    pub tolerance_wei: u128,
}

impl PurchasePolicy {
    /// Build a policy from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured amounts are not
    /// well-formed decimals or the bounds are inverted.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let unit_price_wei = amount::parse_eth(&config.unit_price_eth)
            .map_err(|e| Error::Config(format!("unit_price_eth: {e}")))?;
        let tolerance_wei = amount::parse_eth(&config.tolerance_eth)
            .map_err(|e| Error::Config(format!("tolerance_eth: {e}")))?;
        if unit_price_wei == 0 {
            return Err(Error::Config("unit_price_eth must be positive".to_string()));
        }
        if config.min_purchase > config.max_purchase {
            return Err(Error::Config(format!(
                "min_purchase {} exceeds max_purchase {}",
                config.min_purchase, config.max_purchase
            )));
        }
        Ok(Self {
            unit_price_wei,
            min_units: config.min_purchase,
            max_units: config.max_purchase,
            tolerance_wei,
        })
    }

    /// The exact wei price of `units` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AboveMaximum`] if the multiplication overflows;
    /// any such amount is far beyond a permissible purchase anyway.
    pub fn expected_price_wei(&self, units: u64) -> Result<u128> {
        u128::from(units)
            .checked_mul(self.unit_price_wei)
            .ok_or(Error::AboveMaximum {
                amount: units,
                max: self.max_units,
            })
    }

    /// Validate a claimed purchase.
    ///
    /// Returns the expected price in wei for use by the transaction
    /// verifier, so the on-chain check compares against the policy
    /// price, never the client's claim.
    ///
    /// # Errors
    ///
    /// * [`Error::NotAPositiveInteger`] - zero units
    /// * [`Error::BelowMinimum`] / [`Error::AboveMaximum`] - out of bounds
    /// * [`Error::Amount`] - claimed price is not a well-formed decimal
    /// * [`Error::PriceMismatch`] - claimed price off by more than the
    ///   tolerance
    pub fn validate(&self, units: u64, claimed_price_eth: &str) -> Result<u128> {
        if units == 0 {
            return Err(Error::NotAPositiveInteger);
        }
        if units < self.min_units {
            return Err(Error::BelowMinimum {
                amount: units,
                min: self.min_units,
            });
        }
        if units > self.max_units {
            return Err(Error::AboveMaximum {
                amount: units,
                max: self.max_units,
            });
        }

        let expected = self.expected_price_wei(units)?;
        let claimed = amount::parse_eth(claimed_price_eth)?;
        if !within_tolerance(claimed, expected, self.tolerance_wei) {
            return Err(Error::PriceMismatch {
                claimed: format_eth(claimed),
                expected: format_eth(expected),
            });
        }
        Ok(expected)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn test_policy() -> PurchasePolicy {
        PurchasePolicy::from_config(&PolicyConfig {
            unit_price_eth: "0.001".to_string(),
            min_purchase: 10,
            max_purchase: 1000,
            tolerance_eth: "0.0001".to_string(),
        })
        .expect("valid policy")
    }

    #[test]
    fn test_accepts_exact_price() {
        let policy = test_policy();
        let expected = policy.validate(100, "0.1").expect("valid");
        assert_eq!(expected, amount::parse_eth("0.1").expect("parse"));
    }

    #[test]
    fn test_accepts_formatting_noise() {
        let policy = test_policy();
        assert!(policy.validate(100, "0.100000").is_ok());
        assert!(policy.validate(100, "0.10005").is_ok());
    }

    #[test]
    fn test_rejects_zero_units() {
        assert_eq!(
            test_policy().validate(0, "0"),
            Err(Error::NotAPositiveInteger)
        );
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let policy = test_policy();
        assert_eq!(
            policy.validate(5, "0.005"),
            Err(Error::BelowMinimum { amount: 5, min: 10 })
        );
        assert_eq!(
            policy.validate(5000, "5"),
            Err(Error::AboveMaximum {
                amount: 5000,
                max: 1000
            })
        );
    }

    #[test]
    fn test_rejects_price_mismatch() {
        let policy = test_policy();
        let result = policy.validate(100, "0.2");
        assert!(matches!(result, Err(Error::PriceMismatch { .. })));
        // Just beyond the tolerance.
        let result = policy.validate(100, "0.10011");
        assert!(matches!(result, Err(Error::PriceMismatch { .. })));
    }

    #[test]
    fn test_rejects_malformed_price() {
        let policy = test_policy();
        assert!(matches!(
            policy.validate(100, "ten"),
            Err(Error::Amount(_))
        ));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let policy = test_policy();
        assert!(policy.validate(10, "0.01").is_ok());
        assert!(policy.validate(1000, "1").is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(PurchasePolicy::from_config(&PolicyConfig {
            unit_price_eth: "0".to_string(),
            ..PolicyConfig::default()
        })
        .is_err());

        assert!(PurchasePolicy::from_config(&PolicyConfig {
            min_purchase: 100,
            max_purchase: 10,
            ..PolicyConfig::default()
        })
        .is_err());

        assert!(PurchasePolicy::from_config(&PolicyConfig {
            unit_price_eth: "nope".to_string(),
            ..PolicyConfig::default()
        })
        .is_err());
    }
}
