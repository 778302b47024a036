//! Protocol fee configuration and fee arithmetic.
//!
//! Fees are expressed in basis points (1 bps = 0.01%). A global default
//! applies to every merchant unless an explicit per-merchant override is
//! set. Both values are bounded by [`constants::MAX_FEE_BPS`] **at write
//! time** — reads never re-validate.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, AccountId, LedgerError, Result};

/// Compute the protocol fee: `floor(gross * bps / 10_000)`.
///
/// Rounding is always floor, so the protocol never loses the remainder and
/// the merchant never receives more than `gross - floor_fee`.
#[must_use]
pub fn fee_amount(gross: Decimal, bps: u32) -> Decimal {
    (gross * Decimal::from(bps) / Decimal::from(constants::BPS_DENOMINATOR)).floor()
}

/// Global default fee plus optional per-merchant overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    default_bps: u32,
    overrides: HashMap<AccountId, u32>,
}

impl FeeConfig {
    /// Create a fee config with the given default.
    ///
    /// # Errors
    /// Returns `FeeTooHigh` if `default_bps` exceeds the bound.
    pub fn new(default_bps: u32) -> Result<Self> {
        check_bound(default_bps)?;
        Ok(Self {
            default_bps,
            overrides: HashMap::new(),
        })
    }

    /// Replace the global default fee.
    ///
    /// # Errors
    /// Returns `FeeTooHigh` above the bound; the stored value is unchanged.
    pub fn set_default(&mut self, bps: u32) -> Result<()> {
        check_bound(bps)?;
        self.default_bps = bps;
        Ok(())
    }

    /// Set a per-merchant override.
    ///
    /// # Errors
    /// Returns `FeeTooHigh` above the bound; the stored value is unchanged.
    pub fn set_merchant(&mut self, merchant: AccountId, bps: u32) -> Result<()> {
        check_bound(bps)?;
        self.overrides.insert(merchant, bps);
        Ok(())
    }

    /// Remove a per-merchant override; the merchant falls back to the
    /// global default.
    pub fn clear_merchant(&mut self, merchant: AccountId) {
        self.overrides.remove(&merchant);
    }

    /// The fee applicable to this merchant: its override if set, else the
    /// global default.
    #[must_use]
    pub fn bps_for(&self, merchant: AccountId) -> u32 {
        self.overrides
            .get(&merchant)
            .copied()
            .unwrap_or(self.default_bps)
    }

    #[must_use]
    pub fn default_bps(&self) -> u32 {
        self.default_bps
    }

    #[must_use]
    pub fn merchant_override(&self, merchant: AccountId) -> Option<u32> {
        self.overrides.get(&merchant).copied()
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            default_bps: constants::DEFAULT_FEE_BPS,
            overrides: HashMap::new(),
        }
    }
}

fn check_bound(bps: u32) -> Result<()> {
    if bps > constants::MAX_FEE_BPS {
        return Err(LedgerError::FeeTooHigh {
            bps,
            max_bps: constants::MAX_FEE_BPS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_amount_floors() {
        // 150 * 33 / 10_000 = 0.495 → 0
        assert_eq!(fee_amount(Decimal::new(150, 0), 33), Decimal::ZERO);
        // 100 * 100 / 10_000 = 1
        assert_eq!(fee_amount(Decimal::new(100, 0), 100), Decimal::ONE);
        // 999 * 100 / 10_000 = 9.99 → 9
        assert_eq!(fee_amount(Decimal::new(999, 0), 100), Decimal::new(9, 0));
    }

    #[test]
    fn fee_amount_zero_bps_is_zero() {
        assert_eq!(fee_amount(Decimal::new(1_000_000, 0), 0), Decimal::ZERO);
    }

    #[test]
    fn fee_conservation_randomized() {
        // net + fee == gross for arbitrary gross/bps within bounds.
        for _ in 0..500 {
            let gross = Decimal::from(rand::random::<u32>() % 10_000_000);
            let bps = rand::random::<u32>() % (constants::MAX_FEE_BPS + 1);
            let fee = fee_amount(gross, bps);
            let net = gross - fee;
            assert_eq!(net + fee, gross);
            assert!(fee >= Decimal::ZERO);
            assert!(fee <= gross);
        }
    }

    #[test]
    fn override_takes_precedence() {
        let mut cfg = FeeConfig::new(100).unwrap();
        let merchant = AccountId::new();
        assert_eq!(cfg.bps_for(merchant), 100);

        cfg.set_merchant(merchant, 250).unwrap();
        assert_eq!(cfg.bps_for(merchant), 250);
        assert_eq!(cfg.merchant_override(merchant), Some(250));

        // Other merchants still see the default.
        assert_eq!(cfg.bps_for(AccountId::new()), 100);

        cfg.clear_merchant(merchant);
        assert_eq!(cfg.bps_for(merchant), 100);
    }

    #[test]
    fn bound_enforced_not_clamped() {
        let mut cfg = FeeConfig::new(100).unwrap();
        let merchant = AccountId::new();

        let err = cfg.set_default(1001).unwrap_err();
        assert!(matches!(err, LedgerError::FeeTooHigh { bps: 1001, .. }));
        assert_eq!(cfg.default_bps(), 100, "stored value unchanged");

        let err = cfg.set_merchant(merchant, 5000).unwrap_err();
        assert!(matches!(err, LedgerError::FeeTooHigh { .. }));
        assert_eq!(cfg.merchant_override(merchant), None);
    }

    #[test]
    fn bound_is_inclusive() {
        let mut cfg = FeeConfig::new(constants::MAX_FEE_BPS).unwrap();
        cfg.set_default(constants::MAX_FEE_BPS).unwrap();
        cfg.set_merchant(AccountId::new(), constants::MAX_FEE_BPS)
            .unwrap();
    }

    #[test]
    fn new_rejects_out_of_bound_default() {
        assert!(matches!(
            FeeConfig::new(1001),
            Err(LedgerError::FeeTooHigh { .. })
        ));
    }
}
