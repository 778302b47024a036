//! Merchant withdrawals, treasury wallet lifecycle, and fee sweeps.
//!
//! All value-moving operations follow the debit path discipline: the
//! ledger debit and the withdrawal record commit *before* the external
//! transfer, inside the withdrawal guard family. A transfer can therefore
//! never observe a ledger that still shows the funds as available.

use std::collections::HashMap;

use chrono::Utc;
use payledger_settlement::ReentrancyGuard;
use payledger_store::LedgerStore;
use payledger_types::{
    AccountId, Asset, AssetGateway, AuditKind, AuditRecord, LedgerError, Result, Role,
    TreasuryWallet, WithdrawalKind, WithdrawalRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate view over treasury sweeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryStats {
    pub sweep_count: usize,
    pub totals_by_asset: HashMap<Asset, Decimal>,
}

/// The withdrawal/treasury seam the router dispatches through.
pub trait Withdrawals {
    /// Withdraw a merchant's full available balance of `asset` to the
    /// merchant itself. Returns the amount moved.
    fn withdraw(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
    ) -> Result<Decimal>;

    /// Withdraw `amount` of `asset` to an arbitrary recipient.
    fn withdraw_to(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
        recipient: AccountId,
    ) -> Result<()>;

    /// Withdraw every listed asset's full balance. Zero balances are
    /// skipped; a failing transfer aborts the whole call. Returns what
    /// was moved.
    fn withdraw_all(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        assets: &[String],
    ) -> Result<Vec<(Asset, Decimal)>>;

    /// Sweep the accumulated service-fee balance of `asset` to an active
    /// treasury wallet. Returns the amount swept.
    fn sweep_fees(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        asset: &str,
        wallet: AccountId,
    ) -> Result<Decimal>;

    /// Sweep several assets; zero-fee assets are skipped.
    fn sweep_all_fees(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        assets: &[String],
        wallet: AccountId,
    ) -> Result<Vec<(Asset, Decimal)>>;

    fn add_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        description: &str,
    ) -> Result<()>;

    /// Unlist a wallet from enumeration. Its record stays reachable by
    /// direct lookup.
    fn remove_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
    ) -> Result<()>;

    fn update_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        description: &str,
    ) -> Result<()>;

    fn set_wallet_active(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        active: bool,
    ) -> Result<()>;
}

/// Standard withdrawal & treasury manager.
pub struct WithdrawalManager {
    module_id: AccountId,
    guard: ReentrancyGuard,
}

impl WithdrawalManager {
    #[must_use]
    pub fn new(module_id: AccountId) -> Self {
        Self {
            module_id,
            guard: ReentrancyGuard::new("withdrawal"),
        }
    }

    #[must_use]
    pub fn module_id(&self) -> AccountId {
        self.module_id
    }

    /// Aggregate sweep statistics, computed from the append-only history.
    #[must_use]
    pub fn treasury_stats(store: &LedgerStore) -> TreasuryStats {
        TreasuryStats {
            sweep_count: store
                .withdrawals_by_kind(WithdrawalKind::TreasurySweep)
                .len(),
            totals_by_asset: store.withdrawal_totals_by_asset(Some(WithdrawalKind::TreasurySweep)),
        }
    }

    fn require_merchant_or_operator(
        store: &LedgerStore,
        caller: AccountId,
        merchant: AccountId,
    ) -> Result<()> {
        if caller == merchant || store.has_role(caller, Role::BackendOperator) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} is neither {merchant} nor a backend operator"),
        })
    }

    fn require_whitelisted_merchant(store: &LedgerStore, merchant: AccountId) -> Result<()> {
        if store.is_merchant_listed(merchant) {
            return Ok(());
        }
        Err(LedgerError::NotWhitelisted {
            subject: format!("merchant {merchant}"),
        })
    }

    fn require_treasury_manager(store: &LedgerStore, caller: AccountId) -> Result<()> {
        if store.has_role(caller, Role::TreasuryManager) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} lacks {}", Role::TreasuryManager),
        })
    }

    fn wallet_record(store: &LedgerStore, account: AccountId) -> Result<TreasuryWallet> {
        store
            .wallet(account)
            .cloned()
            .ok_or(LedgerError::WalletNotFound(account))
    }

    /// Debit → record → audit → transfer, for one merchant asset.
    fn withdraw_single(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
        recipient: AccountId,
    ) -> Result<()> {
        store.debit_balance(self.module_id, merchant, asset, amount)?;
        store.append_withdrawal(
            self.module_id,
            WithdrawalRecord {
                asset: asset.to_string(),
                amount,
                recipient,
                initiated_by: caller,
                kind: WithdrawalKind::Merchant,
                merchant: Some(merchant),
                invoice: None,
                at: Utc::now(),
            },
        )?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::Withdrawal,
                merchant.to_string(),
                caller,
                Some(asset.to_string()),
                Some(amount),
            ),
        )?;
        gateway.push(recipient, asset, amount)?;
        tracing::info!(
            merchant = %merchant,
            recipient = %recipient,
            asset,
            %amount,
            "withdrawal completed"
        );
        Ok(())
    }

    /// Debit service fee → record → audit → transfer, for one asset.
    fn sweep_single(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        asset: &str,
        amount: Decimal,
        wallet: AccountId,
    ) -> Result<()> {
        store.debit_service_fee(self.module_id, asset, amount)?;
        store.append_withdrawal(
            self.module_id,
            WithdrawalRecord {
                asset: asset.to_string(),
                amount,
                recipient: wallet,
                initiated_by: caller,
                kind: WithdrawalKind::TreasurySweep,
                merchant: None,
                invoice: None,
                at: Utc::now(),
            },
        )?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::TreasurySweep,
                wallet.to_string(),
                caller,
                Some(asset.to_string()),
                Some(amount),
            ),
        )?;
        gateway.push(wallet, asset, amount)?;
        tracing::info!(wallet = %wallet, asset, %amount, "service fees swept");
        Ok(())
    }

    fn withdraw_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
    ) -> Result<Decimal> {
        Self::require_merchant_or_operator(store, caller, merchant)?;
        Self::require_whitelisted_merchant(store, merchant)?;
        let amount = store.balance(merchant, asset);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                reason: format!("no {asset} balance to withdraw"),
            });
        }
        self.withdraw_single(store, gateway, caller, merchant, asset, amount, merchant)?;
        Ok(amount)
    }

    fn withdraw_to_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
        recipient: AccountId,
    ) -> Result<()> {
        Self::require_merchant_or_operator(store, caller, merchant)?;
        Self::require_whitelisted_merchant(store, merchant)?;
        if recipient.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                reason: format!("withdrawal amount {amount} must be positive"),
            });
        }
        let available = store.balance(merchant, asset);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.withdraw_single(store, gateway, caller, merchant, asset, amount, recipient)
    }

    fn withdraw_all_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        assets: &[String],
    ) -> Result<Vec<(Asset, Decimal)>> {
        Self::require_merchant_or_operator(store, caller, merchant)?;
        Self::require_whitelisted_merchant(store, merchant)?;
        let mut moved = Vec::new();
        for asset in assets {
            let amount = store.balance(merchant, asset);
            if amount <= Decimal::ZERO {
                // Best effort per asset: nothing to move is not a failure.
                continue;
            }
            self.withdraw_single(store, gateway, caller, merchant, asset, amount, merchant)?;
            moved.push((asset.clone(), amount));
        }
        Ok(moved)
    }

    fn sweep_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        asset: &str,
        wallet: AccountId,
    ) -> Result<Decimal> {
        Self::require_treasury_manager(store, caller)?;
        let record = Self::wallet_record(store, wallet)?;
        if !record.active {
            return Err(LedgerError::WalletInactive(wallet));
        }
        let amount = store.service_fee_balance(asset);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                reason: format!("no {asset} service fees to sweep"),
            });
        }
        self.sweep_single(store, gateway, caller, asset, amount, wallet)?;
        Ok(amount)
    }

    fn sweep_all_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        assets: &[String],
        wallet: AccountId,
    ) -> Result<Vec<(Asset, Decimal)>> {
        Self::require_treasury_manager(store, caller)?;
        let record = Self::wallet_record(store, wallet)?;
        if !record.active {
            return Err(LedgerError::WalletInactive(wallet));
        }
        let mut moved = Vec::new();
        for asset in assets {
            let amount = store.service_fee_balance(asset);
            if amount <= Decimal::ZERO {
                continue;
            }
            self.sweep_single(store, gateway, caller, asset, amount, wallet)?;
            moved.push((asset.clone(), amount));
        }
        Ok(moved)
    }
}

impl Withdrawals for WithdrawalManager {
    fn withdraw(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
    ) -> Result<Decimal> {
        self.guard.enter()?;
        let result = self.withdraw_inner(store, gateway, caller, merchant, asset);
        self.guard.leave();
        result
    }

    fn withdraw_to(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
        recipient: AccountId,
    ) -> Result<()> {
        self.guard.enter()?;
        let result =
            self.withdraw_to_inner(store, gateway, caller, merchant, asset, amount, recipient);
        self.guard.leave();
        result
    }

    fn withdraw_all(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        merchant: AccountId,
        assets: &[String],
    ) -> Result<Vec<(Asset, Decimal)>> {
        self.guard.enter()?;
        let result = self.withdraw_all_inner(store, gateway, caller, merchant, assets);
        self.guard.leave();
        result
    }

    fn sweep_fees(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        asset: &str,
        wallet: AccountId,
    ) -> Result<Decimal> {
        self.guard.enter()?;
        let result = self.sweep_inner(store, gateway, caller, asset, wallet);
        self.guard.leave();
        result
    }

    fn sweep_all_fees(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        assets: &[String],
        wallet: AccountId,
    ) -> Result<Vec<(Asset, Decimal)>> {
        self.guard.enter()?;
        let result = self.sweep_all_inner(store, gateway, caller, assets, wallet);
        self.guard.leave();
        result
    }

    fn add_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        description: &str,
    ) -> Result<()> {
        Self::require_treasury_manager(store, caller)?;
        if account.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if store.wallet(account).is_some() {
            return Err(LedgerError::InvalidRecipient);
        }
        store.put_wallet(
            self.module_id,
            TreasuryWallet {
                account,
                active: true,
                registered_at: Utc::now(),
                description: description.to_string(),
            },
        )?;
        tracing::info!(wallet = %account, description, "treasury wallet added");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::WalletAdded, account.to_string(), caller, None, None),
        )
    }

    fn remove_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
    ) -> Result<()> {
        Self::require_treasury_manager(store, caller)?;
        store.unlist_wallet(self.module_id, account)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::WalletRemoved, account.to_string(), caller, None, None),
        )
    }

    fn update_wallet(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        description: &str,
    ) -> Result<()> {
        Self::require_treasury_manager(store, caller)?;
        let mut record = Self::wallet_record(store, account)?;
        record.description = description.to_string();
        store.put_wallet(self.module_id, record)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::WalletUpdated, account.to_string(), caller, None, None),
        )
    }

    fn set_wallet_active(
        &mut self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        active: bool,
    ) -> Result<()> {
        Self::require_treasury_manager(store, caller)?;
        let mut record = Self::wallet_record(store, account)?;
        record.active = active;
        store.put_wallet(self.module_id, record)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::WalletUpdated, account.to_string(), caller, None, None),
        )
    }
}
