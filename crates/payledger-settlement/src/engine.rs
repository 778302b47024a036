//! The Payment Settlement Engine: pay and refund.
//!
//! Payment is *pull-then-credit*: the payer's funds enter custody before
//! any ledger credit, so a failed pull changes nothing. Refund is the
//! mirror image, *debit-then-push*: every ledger reversal commits before
//! the gross amount leaves custody, so an external transfer can never
//! observe a ledger that still shows the funds as available.
//!
//! Fee split: `fee = floor(gross * bps / 10_000)`, `net = gross - fee`,
//! with `bps` the merchant override if set, else the global default.

use chrono::Utc;
use payledger_registry::AccessRegistry;
use payledger_store::LedgerStore;
use payledger_types::{
    fee_amount, AccountId, Asset, AssetGateway, AuditKind, AuditRecord, InvoiceId, InvoiceStatus,
    LedgerError, Result, Role,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::guard::ReentrancyGuard;

/// Summary of a successful settlement, as returned to the caller and
/// mirrored into the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub invoice: InvoiceId,
    pub merchant: AccountId,
    pub asset: Asset,
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

/// The settlement seam the router dispatches through.
pub trait Settlement {
    fn pay_invoice(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        payer: AccountId,
        invoice_id: InvoiceId,
        asset: &str,
        amount: Decimal,
    ) -> Result<PaymentOutcome>;

    fn refund_invoice(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        invoice_id: InvoiceId,
    ) -> Result<()>;
}

/// Standard settlement engine.
pub struct SettlementEngine {
    module_id: AccountId,
    guard: ReentrancyGuard,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(module_id: AccountId) -> Self {
        Self {
            module_id,
            guard: ReentrancyGuard::new("settlement"),
        }
    }

    #[must_use]
    pub fn module_id(&self) -> AccountId {
        self.module_id
    }

    fn pay_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        payer: AccountId,
        invoice_id: InvoiceId,
        asset: &str,
        amount: Decimal,
    ) -> Result<PaymentOutcome> {
        let invoice = store
            .invoice(invoice_id)
            .ok_or(LedgerError::InvoiceNotFound(invoice_id))?;
        let merchant = invoice.merchant;
        let status = invoice.status;

        if status != InvoiceStatus::Pending {
            return Err(LedgerError::InvalidState {
                invoice: invoice_id,
                status,
            });
        }
        let now = Utc::now();
        if invoice.is_past_expiry(now) {
            // The stored status stays PENDING; only an explicit expire
            // call moves it.
            return Err(LedgerError::InvalidState {
                invoice: invoice_id,
                status,
            });
        }
        if invoice.matching_option(asset, amount).is_none() {
            return Err(LedgerError::PaymentMismatch {
                asset: asset.to_string(),
                amount,
            });
        }
        if !store.is_merchant_listed(merchant) {
            return Err(LedgerError::NotWhitelisted {
                subject: format!("merchant {merchant}"),
            });
        }
        if !AccessRegistry::is_asset_accepted(store, merchant, asset) {
            return Err(LedgerError::NotWhitelisted {
                subject: format!("asset {asset} for merchant {merchant}"),
            });
        }

        // Custody first: if the pull fails, nothing has changed.
        gateway.pull(payer, asset, amount)?;

        let bps = store.fee_bps_for(merchant);
        let fee = fee_amount(amount, bps);
        let net = amount - fee;

        // Ledger commit, all before any further external transfer.
        store.update_invoice(self.module_id, invoice_id, |inv| {
            inv.mark_paid(payer, asset, amount, fee, now)
        })?;
        store.credit_balance(self.module_id, merchant, asset, net)?;
        store.credit_service_fee(self.module_id, asset, fee)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::InvoicePaid,
                invoice_id.to_string(),
                payer,
                Some(asset.to_string()),
                Some(amount),
            ),
        )?;

        tracing::info!(
            invoice = %invoice_id,
            merchant = %merchant,
            payer = %payer,
            asset,
            %amount,
            %fee,
            fee_bps = bps,
            "payment settled"
        );

        Ok(PaymentOutcome {
            invoice: invoice_id,
            merchant,
            asset: asset.to_string(),
            gross: amount,
            fee,
            net,
        })
    }

    fn refund_inner(
        &self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        invoice_id: InvoiceId,
    ) -> Result<()> {
        if !store.has_role(caller, Role::BackendOperator) {
            return Err(LedgerError::NotAuthorized {
                reason: format!("{caller} lacks {}", Role::BackendOperator),
            });
        }

        let invoice = store
            .invoice(invoice_id)
            .ok_or(LedgerError::InvoiceNotFound(invoice_id))?;
        if invoice.status != InvoiceStatus::Paid {
            return Err(LedgerError::InvalidState {
                invoice: invoice_id,
                status: invoice.status,
            });
        }
        let merchant = invoice.merchant;
        // PAID guarantees the settlement fields are present.
        let payer = invoice
            .payer
            .ok_or_else(|| LedgerError::Internal("paid invoice missing payer".to_string()))?;
        let asset = invoice
            .paid_asset
            .clone()
            .ok_or_else(|| LedgerError::Internal("paid invoice missing asset".to_string()))?;
        let gross = invoice
            .paid_amount
            .ok_or_else(|| LedgerError::Internal("paid invoice missing amount".to_string()))?;
        let fee = invoice
            .fee
            .ok_or_else(|| LedgerError::Internal("paid invoice missing fee".to_string()))?;
        let net = gross - fee;

        // Pre-check both reversals so a partial debit can never commit.
        // Refund is only guaranteed before the merchant withdraws the
        // affected funds.
        let available = store.balance(merchant, &asset);
        if available < net {
            return Err(LedgerError::InsufficientBalance {
                needed: net,
                available,
            });
        }
        let fee_available = store.service_fee_balance(&asset);
        if fee_available < fee {
            return Err(LedgerError::InsufficientBalance {
                needed: fee,
                available: fee_available,
            });
        }

        // Ledger reversal commits before the funds leave custody.
        let now = Utc::now();
        store.debit_balance(self.module_id, merchant, &asset, net)?;
        store.debit_service_fee(self.module_id, &asset, fee)?;
        store.update_invoice(self.module_id, invoice_id, |inv| inv.mark_refunded(now))?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::InvoiceRefunded,
                invoice_id.to_string(),
                caller,
                Some(asset.clone()),
                Some(gross),
            ),
        )?;

        gateway.push(payer, &asset, gross)?;

        tracing::info!(
            invoice = %invoice_id,
            merchant = %merchant,
            payer = %payer,
            asset = %asset,
            %gross,
            "payment refunded"
        );
        Ok(())
    }
}

impl Settlement for SettlementEngine {
    fn pay_invoice(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        payer: AccountId,
        invoice_id: InvoiceId,
        asset: &str,
        amount: Decimal,
    ) -> Result<PaymentOutcome> {
        self.guard.enter()?;
        let result = self.pay_inner(store, gateway, payer, invoice_id, asset, amount);
        self.guard.leave();
        result
    }

    fn refund_invoice(
        &mut self,
        store: &mut LedgerStore,
        gateway: &mut dyn AssetGateway,
        caller: AccountId,
        invoice_id: InvoiceId,
    ) -> Result<()> {
        self.guard.enter()?;
        let result = self.refund_inner(store, gateway, caller, invoice_id);
        self.guard.leave();
        result
    }
}
