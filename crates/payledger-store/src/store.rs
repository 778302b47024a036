//! The Ledger Store — sole holder of durable state.
//!
//! Every mutating method takes the caller's identity as an explicit
//! parameter and requires it to be a member of the current authorized
//! mutator set; reads are unrestricted. Registering or deregistering a
//! mutator is an administrator-only operation that takes effect
//! immediately and bumps the ACL version.
//!
//! Mutations are single-field or single-record updates. Compound
//! invariants ("fee + net = gross") are enforced by the calling component
//! before issuing store calls, never here. Subtractions fail with
//! `InsufficientBalance` when the result would go negative; they never
//! saturate to zero silently.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use payledger_types::{
    AccountId, Asset, AuditKind, AuditRecord, CoreConfig, FeeConfig, Invoice, InvoiceId,
    LedgerError, Result, Role, TreasuryWallet, WithdrawalKind, WithdrawalRecord,
};
use rust_decimal::Decimal;

use crate::whitelist::Whitelist;

/// Authoritative state for the settlement core: balances, invoices,
/// whitelists, roles, fee config, withdrawal history, treasury wallets,
/// and the audit log.
pub struct LedgerStore {
    config: CoreConfig,

    // --- Authorized mutator ACL ---
    mutators: HashSet<AccountId>,
    acl_version: u64,

    // --- Registry state ---
    roles: HashSet<(AccountId, Role)>,
    paused: bool,
    fees: FeeConfig,
    asset_whitelist: Whitelist<Asset>,
    merchant_whitelist: Whitelist<AccountId>,
    merchant_assets: HashMap<AccountId, Whitelist<Asset>>,

    // --- Invoices ---
    invoices: HashMap<InvoiceId, Invoice>,
    /// Creation order, for recent-N queries.
    invoice_log: Vec<InvoiceId>,
    merchant_invoices: HashMap<AccountId, Vec<InvoiceId>>,

    // --- Balances ---
    balances: HashMap<(AccountId, Asset), Decimal>,
    service_fees: HashMap<Asset, Decimal>,

    // --- Withdrawal history (append-only) ---
    withdrawals: Vec<WithdrawalRecord>,
    merchant_withdrawal_idx: HashMap<AccountId, Vec<usize>>,
    wallet_withdrawal_idx: HashMap<AccountId, Vec<usize>>,

    // --- Treasury wallets ---
    wallets: HashMap<AccountId, TreasuryWallet>,
    wallet_list: Vec<AccountId>,

    // --- Audit log (append-only) ---
    audit: Vec<AuditRecord>,
}

impl LedgerStore {
    /// Create a store with `genesis_admin` holding `Administrator`.
    ///
    /// The genesis admin is the only identity that can bootstrap the
    /// mutator ACL; everything else flows from role grants it issues.
    ///
    /// # Errors
    /// Returns `FeeTooHigh` if the configured default fee is out of bound.
    pub fn new(genesis_admin: AccountId, config: CoreConfig) -> Result<Self> {
        let fees = FeeConfig::new(config.default_fee_bps)?;
        let mut roles = HashSet::new();
        roles.insert((genesis_admin, Role::Administrator));
        Ok(Self {
            config,
            mutators: HashSet::new(),
            acl_version: 0,
            roles,
            paused: false,
            fees,
            asset_whitelist: Whitelist::new(),
            merchant_whitelist: Whitelist::new(),
            merchant_assets: HashMap::new(),
            invoices: HashMap::new(),
            invoice_log: Vec::new(),
            merchant_invoices: HashMap::new(),
            balances: HashMap::new(),
            service_fees: HashMap::new(),
            withdrawals: Vec::new(),
            merchant_withdrawal_idx: HashMap::new(),
            wallet_withdrawal_idx: HashMap::new(),
            wallets: HashMap::new(),
            wallet_list: Vec::new(),
            audit: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // =====================================================================
    // Mutator ACL
    // =====================================================================

    fn authorize(&self, caller: AccountId) -> Result<()> {
        if self.mutators.contains(&caller) {
            return Ok(());
        }
        tracing::warn!(caller = %caller, "rejected store mutation from unregistered caller");
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} is not a registered mutator"),
        })
    }

    fn require_admin(&self, caller: AccountId) -> Result<()> {
        if self.has_role(caller, Role::Administrator) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} lacks {}", Role::Administrator),
        })
    }

    /// Register an authorized mutator. Administrator-only; takes effect
    /// immediately.
    pub fn register_mutator(&mut self, caller: AccountId, module: AccountId) -> Result<()> {
        self.require_admin(caller)?;
        if self.mutators.insert(module) {
            self.acl_version += 1;
            self.audit.push(AuditRecord::new(
                AuditKind::MutatorRegistered,
                module.to_string(),
                caller,
                None,
                None,
            ));
        }
        Ok(())
    }

    /// Deregister an authorized mutator. Administrator-only.
    pub fn deregister_mutator(&mut self, caller: AccountId, module: AccountId) -> Result<()> {
        self.require_admin(caller)?;
        if self.mutators.remove(&module) {
            self.acl_version += 1;
            self.audit.push(AuditRecord::new(
                AuditKind::MutatorDeregistered,
                module.to_string(),
                caller,
                None,
                None,
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_mutator(&self, account: AccountId) -> bool {
        self.mutators.contains(&account)
    }

    /// Monotonic version of the mutator set, bumped on every ACL change.
    #[must_use]
    pub fn acl_version(&self) -> u64 {
        self.acl_version
    }

    // =====================================================================
    // Roles / pause / fees (registry-owned state)
    // =====================================================================

    pub fn set_role(&mut self, caller: AccountId, account: AccountId, role: Role) -> Result<()> {
        self.authorize(caller)?;
        self.roles.insert((account, role));
        Ok(())
    }

    pub fn clear_role(&mut self, caller: AccountId, account: AccountId, role: Role) -> Result<()> {
        self.authorize(caller)?;
        self.roles.remove(&(account, role));
        Ok(())
    }

    #[must_use]
    pub fn has_role(&self, account: AccountId, role: Role) -> bool {
        self.roles.contains(&(account, role))
    }

    /// All roles held by `account`.
    #[must_use]
    pub fn roles_of(&self, account: AccountId) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_role(account, *role))
            .collect()
    }

    pub fn set_paused(&mut self, caller: AccountId, paused: bool) -> Result<()> {
        self.authorize(caller)?;
        self.paused = paused;
        Ok(())
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fee bound is enforced here, at write time; reads never re-validate.
    pub fn set_default_fee(&mut self, caller: AccountId, bps: u32) -> Result<()> {
        self.authorize(caller)?;
        self.fees.set_default(bps)
    }

    pub fn set_merchant_fee(
        &mut self,
        caller: AccountId,
        merchant: AccountId,
        bps: u32,
    ) -> Result<()> {
        self.authorize(caller)?;
        self.fees.set_merchant(merchant, bps)
    }

    pub fn clear_merchant_fee(&mut self, caller: AccountId, merchant: AccountId) -> Result<()> {
        self.authorize(caller)?;
        self.fees.clear_merchant(merchant);
        Ok(())
    }

    #[must_use]
    pub fn default_fee_bps(&self) -> u32 {
        self.fees.default_bps()
    }

    #[must_use]
    pub fn merchant_fee_override(&self, merchant: AccountId) -> Option<u32> {
        self.fees.merchant_override(merchant)
    }

    /// The fee that applies to this merchant right now.
    #[must_use]
    pub fn fee_bps_for(&self, merchant: AccountId) -> u32 {
        self.fees.bps_for(merchant)
    }

    // =====================================================================
    // Whitelists
    // =====================================================================

    pub fn set_asset_listed(&mut self, caller: AccountId, asset: &str, listed: bool) -> Result<()> {
        self.authorize(caller)?;
        if listed {
            self.asset_whitelist.insert(asset.to_string());
        } else {
            self.asset_whitelist.remove(&asset.to_string());
        }
        Ok(())
    }

    pub fn set_merchant_listed(
        &mut self,
        caller: AccountId,
        merchant: AccountId,
        listed: bool,
    ) -> Result<()> {
        self.authorize(caller)?;
        if listed {
            self.merchant_whitelist.insert(merchant);
        } else {
            self.merchant_whitelist.remove(&merchant);
        }
        Ok(())
    }

    pub fn set_merchant_asset_listed(
        &mut self,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        listed: bool,
    ) -> Result<()> {
        self.authorize(caller)?;
        let wl = self.merchant_assets.entry(merchant).or_default();
        if listed {
            wl.insert(asset.to_string());
        } else {
            wl.remove(&asset.to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn is_asset_listed(&self, asset: &str) -> bool {
        self.asset_whitelist.contains(&asset.to_string())
    }

    #[must_use]
    pub fn listed_assets(&self) -> &[Asset] {
        self.asset_whitelist.as_slice()
    }

    #[must_use]
    pub fn is_merchant_listed(&self, merchant: AccountId) -> bool {
        self.merchant_whitelist.contains(&merchant)
    }

    #[must_use]
    pub fn listed_merchants(&self) -> &[AccountId] {
        self.merchant_whitelist.as_slice()
    }

    #[must_use]
    pub fn is_merchant_asset_listed(&self, merchant: AccountId, asset: &str) -> bool {
        self.merchant_assets
            .get(&merchant)
            .is_some_and(|wl| wl.contains(&asset.to_string()))
    }

    #[must_use]
    pub fn merchant_listed_assets(&self, merchant: AccountId) -> &[Asset] {
        self.merchant_assets
            .get(&merchant)
            .map_or(&[], Whitelist::as_slice)
    }

    // =====================================================================
    // Invoices
    // =====================================================================

    /// Insert a new invoice and index it under its merchant.
    ///
    /// # Errors
    /// Returns `InvoiceAlreadyExists` on id collision; nothing changes.
    pub fn insert_invoice(&mut self, caller: AccountId, invoice: Invoice) -> Result<()> {
        self.authorize(caller)?;
        if self.invoices.contains_key(&invoice.id) {
            return Err(LedgerError::InvoiceAlreadyExists(invoice.id));
        }
        self.invoice_log.push(invoice.id);
        self.merchant_invoices
            .entry(invoice.merchant)
            .or_default()
            .push(invoice.id);
        self.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    /// Apply a single-record update to an existing invoice.
    ///
    /// # Errors
    /// `InvoiceNotFound` if the id is unknown, or whatever `f` returns.
    pub fn update_invoice<F>(&mut self, caller: AccountId, id: InvoiceId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Invoice) -> Result<()>,
    {
        self.authorize(caller)?;
        let invoice = self
            .invoices
            .get_mut(&id)
            .ok_or(LedgerError::InvoiceNotFound(id))?;
        f(invoice)
    }

    #[must_use]
    pub fn invoice(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.get(&id)
    }

    /// Invoice ids belonging to `merchant`, in creation order.
    #[must_use]
    pub fn merchant_invoice_ids(&self, merchant: AccountId) -> &[InvoiceId] {
        self.merchant_invoices
            .get(&merchant)
            .map_or(&[], Vec::as_slice)
    }

    /// All invoice ids in creation order.
    #[must_use]
    pub fn invoice_ids(&self) -> &[InvoiceId] {
        &self.invoice_log
    }

    #[must_use]
    pub fn invoice_count(&self) -> usize {
        self.invoices.len()
    }

    // =====================================================================
    // Balances
    // =====================================================================

    pub fn credit_balance(
        &mut self,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        self.authorize(caller)?;
        *self
            .balances
            .entry((merchant, asset.to_string()))
            .or_default() += amount;
        Ok(())
    }

    /// # Errors
    /// `InsufficientBalance` if the result would go negative; the balance
    /// is unchanged (never saturated).
    pub fn debit_balance(
        &mut self,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        self.authorize(caller)?;
        let entry = self
            .balances
            .entry((merchant, asset.to_string()))
            .or_default();
        if *entry < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: *entry,
            });
        }
        *entry -= amount;
        Ok(())
    }

    pub fn credit_service_fee(
        &mut self,
        caller: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        self.authorize(caller)?;
        *self.service_fees.entry(asset.to_string()).or_default() += amount;
        Ok(())
    }

    /// # Errors
    /// `InsufficientBalance` if the result would go negative.
    pub fn debit_service_fee(
        &mut self,
        caller: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        self.authorize(caller)?;
        let entry = self.service_fees.entry(asset.to_string()).or_default();
        if *entry < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: *entry,
            });
        }
        *entry -= amount;
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, merchant: AccountId, asset: &str) -> Decimal {
        self.balances
            .get(&(merchant, asset.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// All non-zero balances of a merchant.
    #[must_use]
    pub fn balances_of(&self, merchant: AccountId) -> Vec<(Asset, Decimal)> {
        self.balances
            .iter()
            .filter(|((acct, _), amount)| *acct == merchant && !amount.is_zero())
            .map(|((_, asset), amount)| (asset.clone(), *amount))
            .collect()
    }

    #[must_use]
    pub fn service_fee_balance(&self, asset: &str) -> Decimal {
        self.service_fees
            .get(&asset.to_string())
            .copied()
            .unwrap_or_default()
    }

    /// All non-zero service-fee balances.
    #[must_use]
    pub fn service_fee_balances(&self) -> Vec<(Asset, Decimal)> {
        self.service_fees
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect()
    }

    // =====================================================================
    // Withdrawal history
    // =====================================================================

    /// Append a withdrawal record and index it. Returns the record index.
    pub fn append_withdrawal(
        &mut self,
        caller: AccountId,
        record: WithdrawalRecord,
    ) -> Result<usize> {
        self.authorize(caller)?;
        let index = self.withdrawals.len();
        if let Some(merchant) = record.merchant {
            self.merchant_withdrawal_idx
                .entry(merchant)
                .or_default()
                .push(index);
        }
        if record.kind == WithdrawalKind::TreasurySweep {
            self.wallet_withdrawal_idx
                .entry(record.recipient)
                .or_default()
                .push(index);
        }
        self.withdrawals.push(record);
        Ok(index)
    }

    #[must_use]
    pub fn withdrawal_count(&self) -> usize {
        self.withdrawals.len()
    }

    #[must_use]
    pub fn withdrawal(&self, index: usize) -> Option<&WithdrawalRecord> {
        self.withdrawals.get(index)
    }

    /// The most recent `limit` records, newest first.
    #[must_use]
    pub fn recent_withdrawals(&self, limit: usize) -> Vec<&WithdrawalRecord> {
        self.withdrawals.iter().rev().take(limit).collect()
    }

    #[must_use]
    pub fn withdrawals_by_merchant(&self, merchant: AccountId) -> Vec<&WithdrawalRecord> {
        self.merchant_withdrawal_idx
            .get(&merchant)
            .map_or_else(Vec::new, |idxs| {
                idxs.iter().filter_map(|&i| self.withdrawals.get(i)).collect()
            })
    }

    #[must_use]
    pub fn withdrawals_by_wallet(&self, wallet: AccountId) -> Vec<&WithdrawalRecord> {
        self.wallet_withdrawal_idx
            .get(&wallet)
            .map_or_else(Vec::new, |idxs| {
                idxs.iter().filter_map(|&i| self.withdrawals.get(i)).collect()
            })
    }

    #[must_use]
    pub fn withdrawals_by_asset(&self, asset: &str) -> Vec<&WithdrawalRecord> {
        self.withdrawals
            .iter()
            .filter(|rec| rec.asset == asset)
            .collect()
    }

    #[must_use]
    pub fn withdrawals_by_kind(&self, kind: WithdrawalKind) -> Vec<&WithdrawalRecord> {
        self.withdrawals
            .iter()
            .filter(|rec| rec.kind == kind)
            .collect()
    }

    /// Records with `from <= at < to`.
    #[must_use]
    pub fn withdrawals_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<&WithdrawalRecord> {
        self.withdrawals
            .iter()
            .filter(|rec| rec.at >= from && rec.at < to)
            .collect()
    }

    /// Aggregate withdrawn totals per asset, optionally restricted to one
    /// kind.
    #[must_use]
    pub fn withdrawal_totals_by_asset(
        &self,
        kind: Option<WithdrawalKind>,
    ) -> HashMap<Asset, Decimal> {
        let mut totals: HashMap<Asset, Decimal> = HashMap::new();
        for rec in &self.withdrawals {
            if kind.is_some_and(|k| k != rec.kind) {
                continue;
            }
            *totals.entry(rec.asset.clone()).or_default() += rec.amount;
        }
        totals
    }

    // =====================================================================
    // Treasury wallets
    // =====================================================================

    /// Insert or update a wallet record. New wallets join the enumerable
    /// list; updating an unlisted wallet does not re-list it.
    pub fn put_wallet(&mut self, caller: AccountId, wallet: TreasuryWallet) -> Result<()> {
        self.authorize(caller)?;
        let account = wallet.account;
        if self.wallets.insert(account, wallet).is_none() {
            self.wallet_list.push(account);
        }
        Ok(())
    }

    /// Remove a wallet from enumeration. Its record stays reachable by
    /// direct lookup, so history references never dangle.
    pub fn unlist_wallet(&mut self, caller: AccountId, account: AccountId) -> Result<()> {
        self.authorize(caller)?;
        if !self.wallets.contains_key(&account) {
            return Err(LedgerError::WalletNotFound(account));
        }
        self.wallet_list.retain(|acct| *acct != account);
        Ok(())
    }

    #[must_use]
    pub fn wallet(&self, account: AccountId) -> Option<&TreasuryWallet> {
        self.wallets.get(&account)
    }

    /// All enumerable wallets, in registration order.
    #[must_use]
    pub fn listed_wallets(&self) -> Vec<&TreasuryWallet> {
        self.wallet_list
            .iter()
            .filter_map(|acct| self.wallets.get(acct))
            .collect()
    }

    /// Enumerable wallets currently accepting sweeps.
    #[must_use]
    pub fn active_wallets(&self) -> Vec<&TreasuryWallet> {
        self.listed_wallets()
            .into_iter()
            .filter(|w| w.active)
            .collect()
    }

    // =====================================================================
    // Audit log
    // =====================================================================

    pub fn append_audit(&mut self, caller: AccountId, record: AuditRecord) -> Result<()> {
        self.authorize(caller)?;
        self.audit.push(record);
        Ok(())
    }

    #[must_use]
    pub fn audit_count(&self) -> usize {
        self.audit.len()
    }

    #[must_use]
    pub fn audit_record(&self, index: usize) -> Option<&AuditRecord> {
        self.audit.get(index)
    }

    /// The most recent `limit` audit records, newest first.
    #[must_use]
    pub fn recent_audit(&self, limit: usize) -> Vec<&AuditRecord> {
        self.audit.iter().rev().take(limit).collect()
    }

    #[must_use]
    pub fn audit_by_kind(&self, kind: AuditKind) -> Vec<&AuditRecord> {
        self.audit.iter().filter(|rec| rec.kind == kind).collect()
    }

    #[must_use]
    pub fn audit_by_actor(&self, actor: AccountId) -> Vec<&AuditRecord> {
        self.audit.iter().filter(|rec| rec.actor == actor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payledger_types::PaymentOption;

    /// Store with one registered mutator, ready for state mutations.
    fn setup() -> (LedgerStore, AccountId, AccountId) {
        let admin = AccountId::new();
        let module = AccountId::new();
        let mut store = LedgerStore::new(admin, CoreConfig::default()).unwrap();
        store.register_mutator(admin, module).unwrap();
        (store, admin, module)
    }

    #[test]
    fn genesis_admin_has_role() {
        let admin = AccountId::new();
        let store = LedgerStore::new(admin, CoreConfig::default()).unwrap();
        assert!(store.has_role(admin, Role::Administrator));
        assert!(!store.has_role(AccountId::new(), Role::Administrator));
    }

    #[test]
    fn unregistered_caller_cannot_mutate() {
        let (mut store, _, _) = setup();
        let stranger = AccountId::new();
        let merchant = AccountId::new();

        let err = store
            .credit_balance(stranger, merchant, "USDC", Decimal::new(10, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
        assert_eq!(store.balance(merchant, "USDC"), Decimal::ZERO);
    }

    #[test]
    fn mutator_registration_is_admin_only() {
        let (mut store, _, module) = setup();
        let err = store.register_mutator(module, AccountId::new()).unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
    }

    #[test]
    fn acl_version_bumps_on_change_only() {
        let (mut store, admin, module) = setup();
        assert_eq!(store.acl_version(), 1);

        // Re-registering an existing mutator is not a change.
        store.register_mutator(admin, module).unwrap();
        assert_eq!(store.acl_version(), 1);

        store.deregister_mutator(admin, module).unwrap();
        assert_eq!(store.acl_version(), 2);
        assert!(!store.is_mutator(module));

        // Deregistering twice is not a change either.
        store.deregister_mutator(admin, module).unwrap();
        assert_eq!(store.acl_version(), 2);
    }

    #[test]
    fn deregistration_takes_effect_immediately() {
        let (mut store, admin, module) = setup();
        store
            .credit_balance(module, AccountId::new(), "USDC", Decimal::ONE)
            .unwrap();
        store.deregister_mutator(admin, module).unwrap();
        let err = store
            .credit_balance(module, AccountId::new(), "USDC", Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
    }

    #[test]
    fn balance_credit_debit() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();

        store
            .credit_balance(module, merchant, "USDC", Decimal::new(99, 0))
            .unwrap();
        assert_eq!(store.balance(merchant, "USDC"), Decimal::new(99, 0));

        store
            .debit_balance(module, merchant, "USDC", Decimal::new(60, 0))
            .unwrap();
        assert_eq!(store.balance(merchant, "USDC"), Decimal::new(39, 0));
    }

    #[test]
    fn debit_underflow_fails_without_saturating() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();
        store
            .credit_balance(module, merchant, "USDC", Decimal::new(99, 0))
            .unwrap();

        let err = store
            .debit_balance(module, merchant, "USDC", Decimal::new(200, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { needed, available }
                if needed == Decimal::new(200, 0) && available == Decimal::new(99, 0)
        ));
        assert_eq!(store.balance(merchant, "USDC"), Decimal::new(99, 0));
    }

    #[test]
    fn service_fee_accounting() {
        let (mut store, _, module) = setup();
        store
            .credit_service_fee(module, "USDC", Decimal::ONE)
            .unwrap();
        assert_eq!(store.service_fee_balance("USDC"), Decimal::ONE);

        let err = store
            .debit_service_fee(module, "USDC", Decimal::new(2, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        store
            .debit_service_fee(module, "USDC", Decimal::ONE)
            .unwrap();
        assert_eq!(store.service_fee_balance("USDC"), Decimal::ZERO);
        assert!(store.service_fee_balances().is_empty());
    }

    #[test]
    fn invoice_insert_and_duplicate() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();
        let invoice = Invoice::dummy(merchant, "USDC", Decimal::new(100, 0));
        let id = invoice.id;

        store.insert_invoice(module, invoice.clone()).unwrap();
        assert_eq!(store.invoice_count(), 1);
        assert_eq!(store.merchant_invoice_ids(merchant), &[id]);
        assert_eq!(store.invoice_ids(), &[id]);

        let err = store.insert_invoice(module, invoice).unwrap_err();
        assert!(matches!(err, LedgerError::InvoiceAlreadyExists(dup) if dup == id));
        assert_eq!(store.invoice_count(), 1);
    }

    #[test]
    fn update_invoice_not_found() {
        let (mut store, _, module) = setup();
        let err = store
            .update_invoice(module, InvoiceId::new(), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvoiceNotFound(_)));
    }

    #[test]
    fn update_invoice_applies_closure() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();
        let invoice = Invoice::new(
            InvoiceId::new(),
            merchant,
            vec![PaymentOption::new("USDC", Decimal::new(100, 0))],
            None,
        );
        let id = invoice.id;
        store.insert_invoice(module, invoice).unwrap();

        store
            .update_invoice(module, id, |inv| inv.mark_cancelled(Utc::now()))
            .unwrap();
        assert_eq!(
            store.invoice(id).unwrap().status,
            payledger_types::InvoiceStatus::Cancelled
        );
    }

    #[test]
    fn whitelist_flags_and_lists() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();

        store.set_asset_listed(module, "USDC", true).unwrap();
        store.set_merchant_listed(module, merchant, true).unwrap();
        store
            .set_merchant_asset_listed(module, merchant, "USDC", true)
            .unwrap();

        assert!(store.is_asset_listed("USDC"));
        assert!(store.is_merchant_listed(merchant));
        assert!(store.is_merchant_asset_listed(merchant, "USDC"));
        assert_eq!(store.listed_assets(), &["USDC".to_string()]);
        assert_eq!(store.merchant_listed_assets(merchant), &["USDC".to_string()]);

        store.set_asset_listed(module, "USDC", false).unwrap();
        assert!(!store.is_asset_listed("USDC"));
        assert!(store.listed_assets().is_empty());
        // Per-merchant listing is independent of the global flag.
        assert!(store.is_merchant_asset_listed(merchant, "USDC"));
    }

    #[test]
    fn withdrawal_indices() {
        let (mut store, _, module) = setup();
        let merchant = AccountId::new();
        let wallet = AccountId::new();

        let rec = WithdrawalRecord {
            asset: "USDC".to_string(),
            amount: Decimal::new(60, 0),
            recipient: merchant,
            initiated_by: merchant,
            kind: WithdrawalKind::Merchant,
            merchant: Some(merchant),
            invoice: None,
            at: Utc::now(),
        };
        let idx = store.append_withdrawal(module, rec).unwrap();
        assert_eq!(idx, 0);

        let sweep = WithdrawalRecord {
            asset: "USDC".to_string(),
            amount: Decimal::new(5, 0),
            recipient: wallet,
            initiated_by: AccountId::new(),
            kind: WithdrawalKind::TreasurySweep,
            merchant: None,
            invoice: None,
            at: Utc::now(),
        };
        store.append_withdrawal(module, sweep).unwrap();

        assert_eq!(store.withdrawal_count(), 2);
        assert_eq!(store.withdrawals_by_merchant(merchant).len(), 1);
        assert_eq!(store.withdrawals_by_wallet(wallet).len(), 1);
        assert_eq!(
            store.withdrawals_by_kind(WithdrawalKind::Merchant).len(),
            1
        );
        assert_eq!(store.withdrawals_by_asset("USDC").len(), 2);

        let totals = store.withdrawal_totals_by_asset(None);
        assert_eq!(totals["USDC"], Decimal::new(65, 0));
        let merchant_totals =
            store.withdrawal_totals_by_asset(Some(WithdrawalKind::Merchant));
        assert_eq!(merchant_totals["USDC"], Decimal::new(60, 0));
    }

    #[test]
    fn recent_withdrawals_newest_first() {
        let (mut store, _, module) = setup();
        for i in 1..=5 {
            let rec = WithdrawalRecord {
                asset: "USDC".to_string(),
                amount: Decimal::new(i, 0),
                recipient: AccountId::new(),
                initiated_by: AccountId::new(),
                kind: WithdrawalKind::Merchant,
                merchant: None,
                invoice: None,
                at: Utc::now(),
            };
            store.append_withdrawal(module, rec).unwrap();
        }
        let recent = store.recent_withdrawals(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].amount, Decimal::new(5, 0));
        assert_eq!(recent[1].amount, Decimal::new(4, 0));
    }

    #[test]
    fn wallet_unlist_keeps_record() {
        let (mut store, _, module) = setup();
        let account = AccountId::new();
        store
            .put_wallet(
                module,
                TreasuryWallet {
                    account,
                    active: true,
                    registered_at: Utc::now(),
                    description: "ops".to_string(),
                },
            )
            .unwrap();
        assert_eq!(store.listed_wallets().len(), 1);
        assert_eq!(store.active_wallets().len(), 1);

        store.unlist_wallet(module, account).unwrap();
        assert!(store.listed_wallets().is_empty());
        // Direct lookup still works.
        assert!(store.wallet(account).is_some());

        let err = store.unlist_wallet(module, AccountId::new()).unwrap_err();
        assert!(matches!(err, LedgerError::WalletNotFound(_)));
    }

    #[test]
    fn update_unlisted_wallet_does_not_relist() {
        let (mut store, _, module) = setup();
        let account = AccountId::new();
        let wallet = TreasuryWallet {
            account,
            active: true,
            registered_at: Utc::now(),
            description: "ops".to_string(),
        };
        store.put_wallet(module, wallet.clone()).unwrap();
        store.unlist_wallet(module, account).unwrap();

        let mut updated = wallet;
        updated.description = "ops (retired)".to_string();
        store.put_wallet(module, updated).unwrap();
        assert!(store.listed_wallets().is_empty());
        assert_eq!(
            store.wallet(account).unwrap().description,
            "ops (retired)"
        );
    }

    #[test]
    fn audit_append_and_queries() {
        let (mut store, _, module) = setup();
        let actor = AccountId::new();
        // setup() registered one mutator, which already audited.
        let baseline = store.audit_count();
        assert_eq!(
            store.audit_by_kind(AuditKind::MutatorRegistered).len(),
            1
        );

        store
            .append_audit(
                module,
                AuditRecord::new(AuditKind::Paused, "system", actor, None, None),
            )
            .unwrap();
        store
            .append_audit(
                module,
                AuditRecord::new(AuditKind::Unpaused, "system", actor, None, None),
            )
            .unwrap();

        assert_eq!(store.audit_count(), baseline + 2);
        assert_eq!(store.audit_by_kind(AuditKind::Paused).len(), 1);
        assert_eq!(store.audit_by_actor(actor).len(), 2);
        let recent = store.recent_audit(1);
        assert_eq!(recent[0].kind, AuditKind::Unpaused);
        assert!(store.audit_record(0).is_some());
        assert!(store.audit_record(9).is_none());
    }

    #[test]
    fn roles_of_enumerates() {
        let (mut store, admin, module) = setup();
        let account = AccountId::new();
        store.set_role(module, account, Role::Onboarding).unwrap();
        store
            .set_role(module, account, Role::TreasuryManager)
            .unwrap();
        assert_eq!(
            store.roles_of(account),
            vec![Role::Onboarding, Role::TreasuryManager]
        );
        assert_eq!(store.roles_of(admin), vec![Role::Administrator]);
    }
}
