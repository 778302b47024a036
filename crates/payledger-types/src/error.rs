//! Error types for the PayLedger settlement core.
//!
//! All errors use the `PL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization / registry errors
//! - 2xx: Invoice errors
//! - 3xx: Payment errors
//! - 4xx: Balance / withdrawal errors
//! - 5xx: Treasury errors
//! - 9xx: General / internal errors
//!
//! Every rejected operation surfaces exactly one of these variants; callers
//! branch on the variant, never on the message text.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, InvoiceId, InvoiceStatus};

/// Central error enum for all PayLedger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Authorization / Registry Errors (1xx)
    // =================================================================
    /// The caller lacks the role, whitelist membership, or mutator
    /// registration the operation requires.
    #[error("PL_ERR_100: Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// A merchant or asset is missing from the required whitelist.
    #[error("PL_ERR_101: Not whitelisted: {subject}")]
    NotWhitelisted { subject: String },

    /// The global pause switch is engaged.
    #[error("PL_ERR_102: System is paused")]
    SystemPaused,

    /// A settlement-core operation re-entered its own operation family.
    #[error("PL_ERR_103: Reentrant call into {family}")]
    Reentrancy { family: &'static str },

    /// A fee write exceeded the configured bound. The stored value is
    /// never clamped.
    #[error("PL_ERR_104: Fee too high: {bps} bps (max {max_bps})")]
    FeeTooHigh { bps: u32, max_bps: u32 },

    // =================================================================
    // Invoice Errors (2xx)
    // =================================================================
    /// The requested invoice does not exist.
    #[error("PL_ERR_200: Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// An invoice with this caller-supplied id already exists.
    #[error("PL_ERR_201: Invoice already exists: {0}")]
    InvoiceAlreadyExists(InvoiceId),

    /// The invoice is not in the status the requested transition needs
    /// (already paid/refunded/expired/cancelled, or past its expiry).
    #[error("PL_ERR_202: Invalid invoice state: {invoice} is {status}")]
    InvalidState {
        invoice: InvoiceId,
        status: InvoiceStatus,
    },

    /// Zero or otherwise out-of-range amount, or a malformed option list.
    #[error("PL_ERR_203: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The recipient is the nil account.
    #[error("PL_ERR_204: Invalid recipient")]
    InvalidRecipient,

    // =================================================================
    // Payment Errors (3xx)
    // =================================================================
    /// The submitted (asset, amount) pair equals no payment option on the
    /// invoice. No partial or over-payment tolerance.
    #[error("PL_ERR_300: Payment mismatch: {amount} {asset} matches no option")]
    PaymentMismatch { asset: String, amount: Decimal },

    // =================================================================
    // Balance / Withdrawal Errors (4xx)
    // =================================================================
    /// A subtraction would take a balance negative. Applies to merchant
    /// balances, service-fee balances, and the payer's external balance.
    #[error("PL_ERR_400: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// The external gateway refused a transfer for a reason other than
    /// insufficient funds.
    #[error("PL_ERR_401: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Treasury Errors (5xx)
    // =================================================================
    /// No treasury wallet is registered under this account.
    #[error("PL_ERR_500: Treasury wallet not found: {0}")]
    WalletNotFound(AccountId),

    /// The treasury wallet exists but has been deactivated.
    #[error("PL_ERR_501: Treasury wallet inactive: {0}")]
    WalletInactive(AccountId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// A required collaborating module is not installed.
    #[error("PL_ERR_900: Module unavailable: {module}")]
    ModuleUnavailable { module: &'static str },

    /// Unrecoverable internal error.
    #[error("PL_ERR_901: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;
