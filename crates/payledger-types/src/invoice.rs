//! # Invoice — the settlement core's central record
//!
//! An invoice is created `PENDING` with an ordered list of payment options
//! and leaves `PENDING` exactly once.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐   pay        ┌──────┐   refund   ┌──────────┐
//!   │ PENDING ├─────────────▶│ PAID ├───────────▶│ REFUNDED │
//!   └──┬───┬──┘              └──────┘            └──────────┘
//!      │   │ expire
//!      │   ▼
//!      │ ┌─────────┐
//!      │ │ EXPIRED │
//!      │ └─────────┘
//!      │ cancel
//!      ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Transitions are **monotonic**: every status except `PENDING` and `PAID`
//! is terminal, and `PAID` only moves forward to `REFUNDED`. Expiry is
//! data-driven — nothing flips an invoice to `EXPIRED` until an explicit
//! expire call observes `now >= expires_at`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Asset, InvoiceId, LedgerError, Result};

/// The lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Awaiting payment. The only status that accepts transitions.
    Pending,
    /// Settled: payer, asset, amount, and fee are recorded. May only move
    /// to `Refunded`.
    Paid,
    /// Payment was reversed in full. Terminal.
    Refunded,
    /// Explicitly expired after its expiry timestamp passed. Terminal.
    Expired,
    /// Explicitly cancelled before payment. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Can an invoice in this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Paid | Self::Expired | Self::Cancelled
            ) | (Self::Paid, Self::Refunded)
        )
    }

    /// Whether this status accepts no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Expired | Self::Cancelled)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One way to settle an invoice: this exact amount of this asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOption {
    pub asset: Asset,
    pub amount: Decimal,
}

impl PaymentOption {
    #[must_use]
    pub fn new(asset: impl Into<Asset>, amount: Decimal) -> Self {
        Self {
            asset: asset.into(),
            amount,
        }
    }
}

/// A merchant invoice and, once settled, its payment details.
///
/// The option list is immutable after creation. Settlement details
/// (`payer`, `paid_asset`, `paid_amount`, `fee`) are `None` until the
/// invoice is paid and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Caller-supplied opaque identifier, unique across the ledger.
    pub id: InvoiceId,
    /// The merchant this invoice collects for.
    pub merchant: AccountId,
    /// Accepted (asset, amount) pairs. Non-empty; insertion order is
    /// irrelevant to settlement.
    pub options: Vec<PaymentOption>,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// The account that paid. Set on payment.
    pub payer: Option<AccountId>,
    /// The asset the invoice settled in. Set on payment.
    pub paid_asset: Option<Asset>,
    /// The gross amount paid. Set on payment.
    pub paid_amount: Option<Decimal>,
    /// The protocol fee charged out of `paid_amount`. Set on payment.
    pub fee: Option<Decimal>,
    /// When the invoice was created.
    pub created_at: DateTime<Utc>,
    /// Optional expiry. Payment at or after this instant is rejected.
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create a new `PENDING` invoice. Option-list validation is the
    /// lifecycle manager's job; this constructor only records fields.
    #[must_use]
    pub fn new(
        id: InvoiceId,
        merchant: AccountId,
        options: Vec<PaymentOption>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            merchant,
            options,
            status: InvoiceStatus::Pending,
            payer: None,
            paid_asset: None,
            paid_amount: None,
            fee: None,
            created_at: Utc::now(),
            expires_at,
            paid_at: None,
            refunded_at: None,
            expired_at: None,
            cancelled_at: None,
        }
    }

    /// The option matching this exact (asset, amount) pair, if any.
    #[must_use]
    pub fn matching_option(&self, asset: &str, amount: Decimal) -> Option<&PaymentOption> {
        self.options
            .iter()
            .find(|opt| opt.asset == asset && opt.amount == amount)
    }

    /// Whether `now` is at or past the expiry timestamp. An invoice with
    /// no expiry never passes this check.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// The merchant's net credit from settlement (`paid_amount - fee`).
    /// `None` until paid.
    #[must_use]
    pub fn net(&self) -> Option<Decimal> {
        Some(self.paid_amount? - self.fee?)
    }

    fn transition_to(&mut self, target: InvoiceStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(LedgerError::InvalidState {
                invoice: self.id,
                status: self.status,
            });
        }
        self.status = target;
        Ok(())
    }

    /// Record settlement: `PENDING → PAID` with payer, asset, gross
    /// amount, fee, and timestamp.
    pub fn mark_paid(
        &mut self,
        payer: AccountId,
        asset: &str,
        amount: Decimal,
        fee: Decimal,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.transition_to(InvoiceStatus::Paid)?;
        self.payer = Some(payer);
        self.paid_asset = Some(asset.to_string());
        self.paid_amount = Some(amount);
        self.fee = Some(fee);
        self.paid_at = Some(at);
        Ok(())
    }

    /// `PAID → REFUNDED`. Settlement details stay recorded.
    pub fn mark_refunded(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition_to(InvoiceStatus::Refunded)?;
        self.refunded_at = Some(at);
        Ok(())
    }

    /// `PENDING → EXPIRED`.
    pub fn mark_expired(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition_to(InvoiceStatus::Expired)?;
        self.expired_at = Some(at);
        Ok(())
    }

    /// `PENDING → CANCELLED`.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition_to(InvoiceStatus::Cancelled)?;
        self.cancelled_at = Some(at);
        Ok(())
    }
}

/// Dummy invoice helpers for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Invoice {
    /// A pending single-option invoice for unit tests.
    pub fn dummy(merchant: AccountId, asset: &str, amount: Decimal) -> Self {
        Self::new(
            InvoiceId::new(),
            merchant,
            vec![PaymentOption::new(asset, amount)],
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_invoice() -> Invoice {
        Invoice::dummy(AccountId::new(), "USDC", Decimal::new(100, 0))
    }

    #[test]
    fn status_transitions_valid() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Expired));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Cancelled));
        assert!(InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Refunded));
    }

    #[test]
    fn status_transitions_invalid() {
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Pending));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Expired));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Refunded.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Expired.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Refunded));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(!InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Refunded.is_terminal());
        assert!(InvoiceStatus::Expired.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
    }

    #[test]
    fn mark_paid_records_settlement() {
        let mut inv = make_invoice();
        let payer = AccountId::new();
        let now = Utc::now();
        inv.mark_paid(payer, "USDC", Decimal::new(100, 0), Decimal::ONE, now)
            .unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.payer, Some(payer));
        assert_eq!(inv.paid_asset.as_deref(), Some("USDC"));
        assert_eq!(inv.paid_amount, Some(Decimal::new(100, 0)));
        assert_eq!(inv.fee, Some(Decimal::ONE));
        assert_eq!(inv.net(), Some(Decimal::new(99, 0)));
        assert_eq!(inv.paid_at, Some(now));
    }

    #[test]
    fn double_pay_blocked() {
        let mut inv = make_invoice();
        let payer = AccountId::new();
        inv.mark_paid(payer, "USDC", Decimal::new(100, 0), Decimal::ONE, Utc::now())
            .unwrap();
        let err = inv
            .mark_paid(payer, "USDC", Decimal::new(100, 0), Decimal::ONE, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn refund_only_from_paid() {
        let mut inv = make_invoice();
        let err = inv.mark_refunded(Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));

        inv.mark_paid(
            AccountId::new(),
            "USDC",
            Decimal::new(100, 0),
            Decimal::ONE,
            Utc::now(),
        )
        .unwrap();
        inv.mark_refunded(Utc::now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Refunded);
    }

    #[test]
    fn cancel_then_pay_blocked() {
        let mut inv = make_invoice();
        inv.mark_cancelled(Utc::now()).unwrap();
        let err = inv
            .mark_paid(
                AccountId::new(),
                "USDC",
                Decimal::new(100, 0),
                Decimal::ONE,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn matching_option_exact_only() {
        let inv = make_invoice();
        assert!(inv.matching_option("USDC", Decimal::new(100, 0)).is_some());
        // Wrong amount
        assert!(inv.matching_option("USDC", Decimal::new(150, 0)).is_none());
        // Wrong asset
        assert!(inv.matching_option("XLM", Decimal::new(100, 0)).is_none());
    }

    #[test]
    fn expiry_observation() {
        let mut inv = make_invoice();
        let now = Utc::now();
        assert!(!inv.is_past_expiry(now), "no expiry set");

        inv.expires_at = Some(now);
        assert!(inv.is_past_expiry(now), "expiry is inclusive");
        assert!(!inv.is_past_expiry(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn serde_roundtrip() {
        let mut inv = make_invoice();
        inv.mark_paid(
            AccountId::new(),
            "USDC",
            Decimal::new(100, 0),
            Decimal::ONE,
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&inv).unwrap();
        let back: Invoice = serde_json::from_str(&json).unwrap();
        assert_eq!(inv.id, back.id);
        assert_eq!(inv.status, back.status);
        assert_eq!(inv.paid_amount, back.paid_amount);
    }
}
