//! The single external entry point.
//!
//! The router owns the store, the gateway, and one concrete
//! implementation per component seam, selected at construction. Every
//! mutating call goes through [`Router::execute`], which enforces the
//! global pause switch and forwards the original caller's identity to the
//! owning component. Reads bypass the dispatcher — they are unrestricted
//! and go straight to the store.

use payledger_invoicing::{InvoiceLifecycle, InvoiceManager, InvoiceStats};
use payledger_registry::AccessRegistry;
use payledger_settlement::{Settlement, SettlementEngine};
use payledger_store::LedgerStore;
use payledger_treasury::{TreasuryStats, WithdrawalManager, Withdrawals};
use payledger_types::{
    AccountId, AssetGateway, CoreConfig, Invoice, InvoiceId, LedgerError, Result,
};
use rust_decimal::Decimal;

use crate::ops::{Operation, Reply, Request};

/// The (unimplemented) yield-bearing deposit seam. No implementation
/// ships; routing a deposit with no module installed fails with
/// `ModuleUnavailable`.
pub trait DepositModule {
    fn deposit(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()>;
}

/// Routes every operation to its owning component.
pub struct Router<G: AssetGateway> {
    store: LedgerStore,
    gateway: G,
    registry: AccessRegistry,
    invoicing: Box<dyn InvoiceLifecycle>,
    settlement: Box<dyn Settlement>,
    withdrawals: Box<dyn Withdrawals>,
    deposit: Option<Box<dyn DepositModule>>,
}

impl<G: AssetGateway> Router<G> {
    /// Build a router wired to the standard component implementations.
    ///
    /// Each component gets a fresh module identity, registered as an
    /// authorized store mutator under the genesis admin's authority.
    ///
    /// # Errors
    /// Returns `FeeTooHigh` if the configured default fee is out of bound.
    pub fn with_standard_components(
        genesis_admin: AccountId,
        config: CoreConfig,
        gateway: G,
    ) -> Result<Self> {
        let mut store = LedgerStore::new(genesis_admin, config)?;
        let registry = AccessRegistry::new(AccountId::new());
        let invoicing = InvoiceManager::new(AccountId::new());
        let settlement = SettlementEngine::new(AccountId::new());
        let withdrawals = WithdrawalManager::new(AccountId::new());

        for module in [
            registry.module_id(),
            invoicing.module_id(),
            settlement.module_id(),
            withdrawals.module_id(),
        ] {
            store.register_mutator(genesis_admin, module)?;
        }

        Ok(Self {
            store,
            gateway,
            registry,
            invoicing: Box::new(invoicing),
            settlement: Box::new(settlement),
            withdrawals: Box::new(withdrawals),
            deposit: None,
        })
    }

    /// Install a deposit module after construction.
    pub fn install_deposit_module(&mut self, module: Box<dyn DepositModule>) {
        self.deposit = Some(module);
    }

    /// Execute one mutating operation on behalf of `req.caller`.
    ///
    /// While the system is paused every operation except `Unpause` fails
    /// with `SystemPaused` before reaching any component.
    pub fn execute(&mut self, req: Request) -> Result<Reply> {
        let Request { caller, op } = req;
        if self.store.is_paused() && !matches!(op, Operation::Unpause) {
            tracing::warn!(caller = %caller, op = op.name(), "operation rejected: system paused");
            return Err(LedgerError::SystemPaused);
        }
        tracing::debug!(caller = %caller, op = op.name(), "dispatching");

        let store = &mut self.store;
        match op {
            // --- Authorization & registry ---
            Operation::GrantRole { account, role } => {
                self.registry.grant_role(store, caller, account, role)?;
                Ok(Reply::Unit)
            }
            Operation::RevokeRole { account, role } => {
                self.registry.revoke_role(store, caller, account, role)?;
                Ok(Reply::Unit)
            }
            Operation::SetDefaultFee { bps } => {
                self.registry.set_default_fee(store, caller, bps)?;
                Ok(Reply::Unit)
            }
            Operation::SetMerchantFee { merchant, bps } => {
                self.registry.set_merchant_fee(store, caller, merchant, bps)?;
                Ok(Reply::Unit)
            }
            Operation::ClearMerchantFee { merchant } => {
                self.registry.clear_merchant_fee(store, caller, merchant)?;
                Ok(Reply::Unit)
            }
            Operation::SetAssetListed { asset, listed } => {
                self.registry.set_asset_listed(store, caller, &asset, listed)?;
                Ok(Reply::Unit)
            }
            Operation::SetAssetsListed { assets, listed } => {
                self.registry.set_assets_listed(store, caller, &assets, listed)?;
                Ok(Reply::Unit)
            }
            Operation::SetMerchantListed { merchant, listed } => {
                self.registry
                    .set_merchant_listed(store, caller, merchant, listed)?;
                Ok(Reply::Unit)
            }
            Operation::SetMerchantsListed { merchants, listed } => {
                self.registry
                    .set_merchants_listed(store, caller, &merchants, listed)?;
                Ok(Reply::Unit)
            }
            Operation::SetMerchantAssetListed {
                merchant,
                asset,
                listed,
            } => {
                self.registry
                    .set_merchant_asset_listed(store, caller, merchant, &asset, listed)?;
                Ok(Reply::Unit)
            }
            Operation::SetMerchantAssetsListed {
                merchant,
                assets,
                listed,
            } => {
                self.registry
                    .set_merchant_assets_listed(store, caller, merchant, &assets, listed)?;
                Ok(Reply::Unit)
            }
            Operation::Pause => {
                self.registry.pause(store, caller)?;
                Ok(Reply::Unit)
            }
            Operation::Unpause => {
                self.registry.unpause(store, caller)?;
                Ok(Reply::Unit)
            }

            // --- Invoices ---
            Operation::CreateInvoice {
                id,
                merchant,
                options,
                expires_at,
            } => {
                self.invoicing
                    .create_invoice(store, caller, id, merchant, options, expires_at)?;
                Ok(Reply::Unit)
            }
            Operation::CancelInvoice { id } => {
                self.invoicing.cancel_invoice(store, caller, id)?;
                Ok(Reply::Unit)
            }
            Operation::ExpireInvoice { id } => {
                self.invoicing.expire_invoice(store, caller, id)?;
                Ok(Reply::Unit)
            }

            // --- Payments ---
            Operation::PayInvoice { id, asset, amount } => self
                .settlement
                .pay_invoice(store, &mut self.gateway, caller, id, &asset, amount)
                .map(Reply::Payment),
            Operation::RefundInvoice { id } => {
                self.settlement
                    .refund_invoice(store, &mut self.gateway, caller, id)?;
                Ok(Reply::Unit)
            }

            // --- Withdrawals ---
            Operation::Withdraw { merchant, asset } => self
                .withdrawals
                .withdraw(store, &mut self.gateway, caller, merchant, &asset)
                .map(Reply::Amount),
            Operation::WithdrawAll { merchant, assets } => self
                .withdrawals
                .withdraw_all(store, &mut self.gateway, caller, merchant, &assets)
                .map(Reply::Moved),
            Operation::WithdrawTo {
                merchant,
                asset,
                amount,
                recipient,
            } => {
                self.withdrawals.withdraw_to(
                    store,
                    &mut self.gateway,
                    caller,
                    merchant,
                    &asset,
                    amount,
                    recipient,
                )?;
                Ok(Reply::Unit)
            }

            // --- Treasury ---
            Operation::AddWallet {
                account,
                description,
            } => {
                self.withdrawals
                    .add_wallet(store, caller, account, &description)?;
                Ok(Reply::Unit)
            }
            Operation::RemoveWallet { account } => {
                self.withdrawals.remove_wallet(store, caller, account)?;
                Ok(Reply::Unit)
            }
            Operation::UpdateWallet {
                account,
                description,
            } => {
                self.withdrawals
                    .update_wallet(store, caller, account, &description)?;
                Ok(Reply::Unit)
            }
            Operation::SetWalletActive { account, active } => {
                self.withdrawals
                    .set_wallet_active(store, caller, account, active)?;
                Ok(Reply::Unit)
            }
            Operation::SweepFees { asset, wallet } => self
                .withdrawals
                .sweep_fees(store, &mut self.gateway, caller, &asset, wallet)
                .map(Reply::Amount),
            Operation::SweepAllFees { assets, wallet } => self
                .withdrawals
                .sweep_all_fees(store, &mut self.gateway, caller, &assets, wallet)
                .map(Reply::Moved),

            // --- Deposit module ---
            Operation::Deposit { asset, amount } => match self.deposit.as_mut() {
                Some(module) => {
                    module.deposit(store, &mut self.gateway, caller, &asset, amount)?;
                    Ok(Reply::Unit)
                }
                None => Err(LedgerError::ModuleUnavailable { module: "deposit" }),
            },
        }
    }

    // =====================================================================
    // Reads (unrestricted)
    // =====================================================================

    /// Direct read access to the store; every query in the operation
    /// surface is reachable from here.
    #[must_use]
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    #[must_use]
    pub fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.store.invoice(id).cloned()
    }

    #[must_use]
    pub fn balance(&self, merchant: AccountId, asset: &str) -> Decimal {
        self.store.balance(merchant, asset)
    }

    /// Batch balance lookup, in request order.
    #[must_use]
    pub fn balances(&self, keys: &[(AccountId, String)]) -> Vec<Decimal> {
        keys.iter()
            .map(|(merchant, asset)| self.store.balance(*merchant, asset))
            .collect()
    }

    #[must_use]
    pub fn service_fee_balance(&self, asset: &str) -> Decimal {
        self.store.service_fee_balance(asset)
    }

    #[must_use]
    pub fn invoice_stats(&self, merchant: AccountId) -> InvoiceStats {
        InvoiceManager::stats(&self.store, merchant)
    }

    #[must_use]
    pub fn treasury_stats(&self) -> TreasuryStats {
        WithdrawalManager::treasury_stats(&self.store)
    }
}
