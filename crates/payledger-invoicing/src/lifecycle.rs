//! Invoice lifecycle: creation, cancellation, expiry, and queries.
//!
//! Creation validates the option list and both whitelist layers before
//! anything is stored. Cancel and expire only ever move an invoice out of
//! `PENDING`; calling them on an invoice that already left `PENDING`
//! fails with `InvalidState` rather than silently succeeding. Expiry is
//! data-driven: the expire call must *observe* `now >= expires_at`,
//! nothing schedules it.

use chrono::{DateTime, Utc};
use payledger_registry::AccessRegistry;
use payledger_store::LedgerStore;
use payledger_types::{
    AccountId, AuditKind, AuditRecord, Invoice, InvoiceId, InvoiceStatus, LedgerError,
    PaymentOption, Result, Role,
};
use serde::{Deserialize, Serialize};

/// Per-merchant invoice counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStats {
    pub total: usize,
    pub pending: usize,
    pub paid: usize,
    pub refunded: usize,
    pub expired: usize,
    pub cancelled: usize,
}

/// The invoice lifecycle seam the router dispatches through.
pub trait InvoiceLifecycle {
    fn create_invoice(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        id: InvoiceId,
        merchant: AccountId,
        options: Vec<PaymentOption>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    fn cancel_invoice(&self, store: &mut LedgerStore, caller: AccountId, id: InvoiceId)
        -> Result<()>;

    fn expire_invoice(&self, store: &mut LedgerStore, caller: AccountId, id: InvoiceId)
        -> Result<()>;
}

/// Standard lifecycle manager.
pub struct InvoiceManager {
    module_id: AccountId,
}

impl InvoiceManager {
    #[must_use]
    pub fn new(module_id: AccountId) -> Self {
        Self { module_id }
    }

    #[must_use]
    pub fn module_id(&self) -> AccountId {
        self.module_id
    }

    /// Merchant self-service or a Backend-Operator acting on its behalf.
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

    fn validate_options(store: &LedgerStore, merchant: AccountId, options: &[PaymentOption]) -> Result<()> {
        if options.is_empty() {
            return Err(LedgerError::InvalidAmount {
                reason: "payment option list is empty".to_string(),
            });
        }
        if options.len() > store.config().max_payment_options {
            return Err(LedgerError::InvalidAmount {
                reason: format!(
                    "{} payment options exceed the limit of {}",
                    options.len(),
                    store.config().max_payment_options
                ),
            });
        }
        for (i, opt) in options.iter().enumerate() {
            if opt.amount <= rust_decimal::Decimal::ZERO {
                return Err(LedgerError::InvalidAmount {
                    reason: format!("option {} has non-positive amount {}", opt.asset, opt.amount),
                });
            }
            if options[..i].iter().any(|prev| prev.asset == opt.asset) {
                return Err(LedgerError::InvalidAmount {
                    reason: format!("asset {} listed twice", opt.asset),
                });
            }
            if !AccessRegistry::is_asset_accepted(store, merchant, &opt.asset) {
                return Err(LedgerError::NotWhitelisted {
                    subject: format!("asset {} for merchant {merchant}", opt.asset),
                });
            }
        }
        Ok(())
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// All invoices of a merchant, in creation order.
    #[must_use]
    pub fn invoices_by_merchant(store: &LedgerStore, merchant: AccountId) -> Vec<Invoice> {
        store
            .merchant_invoice_ids(merchant)
            .iter()
            .filter_map(|id| store.invoice(*id))
            .cloned()
            .collect()
    }

    /// A merchant's invoices currently in `status`.
    #[must_use]
    pub fn invoices_by_status(
        store: &LedgerStore,
        merchant: AccountId,
        status: InvoiceStatus,
    ) -> Vec<Invoice> {
        store
            .merchant_invoice_ids(merchant)
            .iter()
            .filter_map(|id| store.invoice(*id))
            .filter(|inv| inv.status == status)
            .cloned()
            .collect()
    }

    /// The `limit` most recently created invoices, newest first.
    #[must_use]
    pub fn recent_invoices(store: &LedgerStore, limit: usize) -> Vec<Invoice> {
        store
            .invoice_ids()
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| store.invoice(*id))
            .cloned()
            .collect()
    }

    /// Batch lookup; unknown ids are skipped.
    #[must_use]
    pub fn invoices_by_ids(store: &LedgerStore, ids: &[InvoiceId]) -> Vec<Invoice> {
        ids.iter()
            .filter_map(|id| store.invoice(*id))
            .cloned()
            .collect()
    }

    /// Counts by status for one merchant.
    #[must_use]
    pub fn stats(store: &LedgerStore, merchant: AccountId) -> InvoiceStats {
        let mut stats = InvoiceStats::default();
        for id in store.merchant_invoice_ids(merchant) {
            let Some(invoice) = store.invoice(*id) else {
                continue;
            };
            stats.total += 1;
            match invoice.status {
                InvoiceStatus::Pending => stats.pending += 1,
                InvoiceStatus::Paid => stats.paid += 1,
                InvoiceStatus::Refunded => stats.refunded += 1,
                InvoiceStatus::Expired => stats.expired += 1,
                InvoiceStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

impl InvoiceLifecycle for InvoiceManager {
    fn create_invoice(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        id: InvoiceId,
        merchant: AccountId,
        options: Vec<PaymentOption>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        Self::require_merchant_or_operator(store, caller, merchant)?;
        if !store.is_merchant_listed(merchant) {
            return Err(LedgerError::NotWhitelisted {
                subject: format!("merchant {merchant}"),
            });
        }
        Self::validate_options(store, merchant, &options)?;

        let invoice = Invoice::new(id, merchant, options, expires_at);
        store.insert_invoice(self.module_id, invoice)?;
        tracing::info!(invoice = %id, merchant = %merchant, "invoice created");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::InvoiceCreated, id.to_string(), caller, None, None),
        )
    }

    fn cancel_invoice(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        id: InvoiceId,
    ) -> Result<()> {
        let merchant = store
            .invoice(id)
            .ok_or(LedgerError::InvoiceNotFound(id))?
            .merchant;
        Self::require_merchant_or_operator(store, caller, merchant)?;

        let now = Utc::now();
        store.update_invoice(self.module_id, id, |inv| inv.mark_cancelled(now))?;
        tracing::info!(invoice = %id, merchant = %merchant, "invoice cancelled");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::InvoiceCancelled, id.to_string(), caller, None, None),
        )
    }

    fn expire_invoice(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        id: InvoiceId,
    ) -> Result<()> {
        let invoice = store.invoice(id).ok_or(LedgerError::InvoiceNotFound(id))?;
        let merchant = invoice.merchant;
        Self::require_merchant_or_operator(store, caller, merchant)?;

        let now = Utc::now();
        // Expiry must be observed, not anticipated: an invoice with no
        // expiry, or one whose expiry has not yet passed, cannot expire.
        if !invoice.is_past_expiry(now) {
            return Err(LedgerError::InvalidState {
                invoice: id,
                status: invoice.status,
            });
        }
        store.update_invoice(self.module_id, id, |inv| inv.mark_expired(now))?;
        tracing::info!(invoice = %id, merchant = %merchant, "invoice expired");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::InvoiceExpired, id.to_string(), caller, None, None),
        )
    }
}
