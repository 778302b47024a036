//! The custody boundary: where value enters and leaves the ledger.
//!
//! Settlement pulls the payer's funds into custody *before* crediting the
//! ledger; refunds and withdrawals commit the ledger debit *before*
//! pushing funds out. The [`AssetGateway`] trait is that boundary —
//! everything behind it is external and untrusted.

use rust_decimal::Decimal;

use crate::{AccountId, Result};

/// Moves fungible assets between external accounts and ledger custody.
///
/// Implementations must be all-or-nothing per call: a failed `pull` or
/// `push` leaves external balances exactly as they were. Insufficient
/// external funds surface as `InsufficientBalance`; any other refusal is
/// `TransferFailed`.
pub trait AssetGateway {
    /// Pull `amount` of `asset` from `from` into ledger custody.
    fn pull(&mut self, from: AccountId, asset: &str, amount: Decimal) -> Result<()>;

    /// Push `amount` of `asset` from ledger custody to `to`.
    fn push(&mut self, to: AccountId, asset: &str, amount: Decimal) -> Result<()>;
}

#[cfg(any(test, feature = "test-helpers"))]
mod in_memory {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use crate::{AccountId, Asset, LedgerError, Result};

    use super::AssetGateway;

    /// In-memory external custody simulator. **Never use in production.**
    ///
    /// Tracks per-(account, asset) external balances plus the total held
    /// in ledger custody per asset, so tests can assert that custody
    /// always equals the sum of ledger balances and service fees.
    #[derive(Debug, Default)]
    pub struct InMemoryGateway {
        balances: HashMap<(AccountId, Asset), Decimal>,
        custody: HashMap<Asset, Decimal>,
        /// Pushes of this asset fail with `TransferFailed`.
        failing_asset: Option<Asset>,
    }

    impl InMemoryGateway {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an external account balance.
        pub fn fund(&mut self, account: AccountId, asset: &str, amount: Decimal) {
            *self
                .balances
                .entry((account, asset.to_string()))
                .or_default() += amount;
        }

        /// External balance of an account.
        #[must_use]
        pub fn balance_of(&self, account: AccountId, asset: &str) -> Decimal {
            self.balances
                .get(&(account, asset.to_string()))
                .copied()
                .unwrap_or_default()
        }

        /// Total of `asset` currently held in ledger custody.
        #[must_use]
        pub fn custody_of(&self, asset: &str) -> Decimal {
            self.custody.get(asset).copied().unwrap_or_default()
        }

        /// Make pushes of `asset` fail, to exercise abort paths.
        pub fn set_failing_asset(&mut self, asset: Option<&str>) {
            self.failing_asset = asset.map(ToString::to_string);
        }
    }

    impl AssetGateway for InMemoryGateway {
        fn pull(&mut self, from: AccountId, asset: &str, amount: Decimal) -> Result<()> {
            let entry = self
                .balances
                .entry((from, asset.to_string()))
                .or_default();
            if *entry < amount {
                return Err(LedgerError::InsufficientBalance {
                    needed: amount,
                    available: *entry,
                });
            }
            *entry -= amount;
            *self.custody.entry(asset.to_string()).or_default() += amount;
            Ok(())
        }

        fn push(&mut self, to: AccountId, asset: &str, amount: Decimal) -> Result<()> {
            if self.failing_asset.as_deref() == Some(asset) {
                return Err(LedgerError::TransferFailed {
                    reason: format!("simulated failure pushing {asset}"),
                });
            }
            let custody = self.custody.entry(asset.to_string()).or_default();
            if *custody < amount {
                return Err(LedgerError::TransferFailed {
                    reason: format!("custody underflow pushing {asset}"),
                });
            }
            *custody -= amount;
            *self.balances.entry((to, asset.to_string())).or_default() += amount;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use in_memory::InMemoryGateway;
