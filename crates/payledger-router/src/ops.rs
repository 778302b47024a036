//! The operation surface: explicit request objects.
//!
//! Every mutating operation is a tagged variant carrying its arguments;
//! a [`Request`] pairs one with the original caller's identity. Nothing
//! in the system ever infers the caller from ambient context — identity
//! travels with the request through the dispatcher into the owning
//! component.

use chrono::{DateTime, Utc};
use payledger_settlement::PaymentOutcome;
use payledger_types::{AccountId, Asset, InvoiceId, PaymentOption, Role};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One mutating operation and its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    // --- Authorization & registry ---
    GrantRole { account: AccountId, role: Role },
    RevokeRole { account: AccountId, role: Role },
    SetDefaultFee { bps: u32 },
    SetMerchantFee { merchant: AccountId, bps: u32 },
    ClearMerchantFee { merchant: AccountId },
    SetAssetListed { asset: Asset, listed: bool },
    SetAssetsListed { assets: Vec<Asset>, listed: bool },
    SetMerchantListed { merchant: AccountId, listed: bool },
    SetMerchantsListed { merchants: Vec<AccountId>, listed: bool },
    SetMerchantAssetListed { merchant: AccountId, asset: Asset, listed: bool },
    SetMerchantAssetsListed { merchant: AccountId, assets: Vec<Asset>, listed: bool },
    Pause,
    Unpause,

    // --- Invoices ---
    CreateInvoice {
        id: InvoiceId,
        merchant: AccountId,
        options: Vec<PaymentOption>,
        expires_at: Option<DateTime<Utc>>,
    },
    CancelInvoice { id: InvoiceId },
    ExpireInvoice { id: InvoiceId },

    // --- Payments ---
    PayInvoice { id: InvoiceId, asset: Asset, amount: Decimal },
    RefundInvoice { id: InvoiceId },

    // --- Withdrawals ---
    Withdraw { merchant: AccountId, asset: Asset },
    WithdrawAll { merchant: AccountId, assets: Vec<Asset> },
    WithdrawTo {
        merchant: AccountId,
        asset: Asset,
        amount: Decimal,
        recipient: AccountId,
    },

    // --- Treasury ---
    AddWallet { account: AccountId, description: String },
    RemoveWallet { account: AccountId },
    UpdateWallet { account: AccountId, description: String },
    SetWalletActive { account: AccountId, active: bool },
    SweepFees { asset: Asset, wallet: AccountId },
    SweepAllFees { assets: Vec<Asset>, wallet: AccountId },

    // --- Deposit module (stub seam) ---
    Deposit { asset: Asset, amount: Decimal },
}

impl Operation {
    /// Short operation name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GrantRole { .. } => "grant_role",
            Self::RevokeRole { .. } => "revoke_role",
            Self::SetDefaultFee { .. } => "set_default_fee",
            Self::SetMerchantFee { .. } => "set_merchant_fee",
            Self::ClearMerchantFee { .. } => "clear_merchant_fee",
            Self::SetAssetListed { .. } => "set_asset_listed",
            Self::SetAssetsListed { .. } => "set_assets_listed",
            Self::SetMerchantListed { .. } => "set_merchant_listed",
            Self::SetMerchantsListed { .. } => "set_merchants_listed",
            Self::SetMerchantAssetListed { .. } => "set_merchant_asset_listed",
            Self::SetMerchantAssetsListed { .. } => "set_merchant_assets_listed",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::CreateInvoice { .. } => "create_invoice",
            Self::CancelInvoice { .. } => "cancel_invoice",
            Self::ExpireInvoice { .. } => "expire_invoice",
            Self::PayInvoice { .. } => "pay_invoice",
            Self::RefundInvoice { .. } => "refund_invoice",
            Self::Withdraw { .. } => "withdraw",
            Self::WithdrawAll { .. } => "withdraw_all",
            Self::WithdrawTo { .. } => "withdraw_to",
            Self::AddWallet { .. } => "add_wallet",
            Self::RemoveWallet { .. } => "remove_wallet",
            Self::UpdateWallet { .. } => "update_wallet",
            Self::SetWalletActive { .. } => "set_wallet_active",
            Self::SweepFees { .. } => "sweep_fees",
            Self::SweepAllFees { .. } => "sweep_all_fees",
            Self::Deposit { .. } => "deposit",
        }
    }
}

/// A mutating call as it enters the system: the operation plus the
/// original caller, preserved verbatim for every downstream check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub caller: AccountId,
    pub op: Operation,
}

impl Request {
    #[must_use]
    pub fn new(caller: AccountId, op: Operation) -> Self {
        Self { caller, op }
    }
}

/// What a successful dispatch returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Unit,
    /// A single amount moved (withdraw, sweep).
    Amount(Decimal),
    /// Per-asset amounts moved (withdraw-all, sweep-all).
    Moved(Vec<(Asset, Decimal)>),
    /// Settlement summary.
    Payment(PaymentOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names() {
        let op = Operation::PayInvoice {
            id: InvoiceId::new(),
            asset: "USDC".to_string(),
            amount: Decimal::new(100, 0),
        };
        assert_eq!(op.name(), "pay_invoice");
        assert_eq!(Operation::Pause.name(), "pause");
    }

    #[test]
    fn request_serde_roundtrip() {
        let req = Request::new(
            AccountId::new(),
            Operation::Withdraw {
                merchant: AccountId::new(),
                asset: "USDC".to_string(),
            },
        );
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(req.caller, back.caller);
        assert_eq!(back.op.name(), "withdraw");
    }

    #[test]
    fn reply_serde_roundtrip() {
        let reply = Reply::Moved(vec![("USDC".to_string(), Decimal::new(99, 0))]);
        let json = serde_json::to_string(&reply).unwrap();
        let back: Reply = serde_json::from_str(&json).unwrap();
        assert_eq!(reply, back);
    }
}
