//! Append-only records: withdrawal history, treasury wallets, and the
//! audit trail.
//!
//! Every state-changing operation appends exactly one [`AuditRecord`].
//! Records are never updated or deleted; indices over them live in the
//! ledger store. Each audit record exposes a deterministic SHA-256 digest
//! so an exported log can be independently tamper-checked.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, Asset, InvoiceId};

// ---------------------------------------------------------------------------
// Withdrawal history
// ---------------------------------------------------------------------------

/// What moved the funds out of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalKind {
    /// A merchant withdrew its accrued balance.
    Merchant,
    /// The treasury role swept accumulated service fees to a wallet.
    TreasurySweep,
}

impl std::fmt::Display for WithdrawalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merchant => write!(f, "MERCHANT"),
            Self::TreasurySweep => write!(f, "TREASURY_SWEEP"),
        }
    }
}

/// One completed outbound transfer from the ledger's custody.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub asset: Asset,
    pub amount: Decimal,
    /// Where the funds went (merchant account, third party, or treasury
    /// wallet).
    pub recipient: AccountId,
    /// Who issued the operation (merchant, operator, or treasury manager).
    pub initiated_by: AccountId,
    pub kind: WithdrawalKind,
    /// The merchant whose balance was debited. `None` for treasury sweeps.
    pub merchant: Option<AccountId>,
    /// Originating invoice, for refund-adjacent bookkeeping.
    pub invoice: Option<InvoiceId>,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Treasury wallets
// ---------------------------------------------------------------------------

/// A registered destination for protocol fee sweeps.
///
/// Wallets are never hard-deleted while history references them: removal
/// only unlists the wallet from enumeration, the record itself stays
/// reachable by direct lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryWallet {
    pub account: AccountId,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

/// The kind of state change an audit record proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditKind {
    RoleGranted,
    RoleRevoked,
    FeeUpdated,
    WhitelistUpdated,
    Paused,
    Unpaused,
    MutatorRegistered,
    MutatorDeregistered,
    InvoiceCreated,
    InvoiceCancelled,
    InvoiceExpired,
    InvoicePaid,
    InvoiceRefunded,
    Withdrawal,
    TreasurySweep,
    WalletAdded,
    WalletUpdated,
    WalletRemoved,
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RoleGranted => "ROLE_GRANTED",
            Self::RoleRevoked => "ROLE_REVOKED",
            Self::FeeUpdated => "FEE_UPDATED",
            Self::WhitelistUpdated => "WHITELIST_UPDATED",
            Self::Paused => "PAUSED",
            Self::Unpaused => "UNPAUSED",
            Self::MutatorRegistered => "MUTATOR_REGISTERED",
            Self::MutatorDeregistered => "MUTATOR_DEREGISTERED",
            Self::InvoiceCreated => "INVOICE_CREATED",
            Self::InvoiceCancelled => "INVOICE_CANCELLED",
            Self::InvoiceExpired => "INVOICE_EXPIRED",
            Self::InvoicePaid => "INVOICE_PAID",
            Self::InvoiceRefunded => "INVOICE_REFUNDED",
            Self::Withdrawal => "WITHDRAWAL",
            Self::TreasurySweep => "TREASURY_SWEEP",
            Self::WalletAdded => "WALLET_ADDED",
            Self::WalletUpdated => "WALLET_UPDATED",
            Self::WalletRemoved => "WALLET_REMOVED",
        };
        write!(f, "{s}")
    }
}

/// An immutable record of one state-changing operation.
///
/// This is the system's audit log: operation kind, primary entity, actor
/// identity, affected asset and amount, and timestamp. Queryable after the
/// fact even if no other state remains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub kind: AuditKind,
    /// Primary entity identifier: invoice id, account, asset, or role,
    /// rendered to its display form.
    pub entity: String,
    /// The original caller the operation was executed for.
    pub actor: AccountId,
    pub asset: Option<Asset>,
    pub amount: Option<Decimal>,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    #[must_use]
    pub fn new(
        kind: AuditKind,
        entity: impl Into<String>,
        actor: AccountId,
        asset: Option<Asset>,
        amount: Option<Decimal>,
    ) -> Self {
        Self {
            kind,
            entity: entity.into(),
            actor,
            asset,
            amount,
            at: Utc::now(),
        }
    }

    /// Canonical byte encoding the digest is computed over.
    ///
    /// Format: `"payledger:audit:v1:" || kind || entity || actor || asset || amount || millis`
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(b"payledger:audit:v1:");
        payload.extend_from_slice(self.kind.to_string().as_bytes());
        payload.extend_from_slice(self.entity.as_bytes());
        payload.extend_from_slice(self.actor.0.as_bytes());
        if let Some(asset) = &self.asset {
            payload.extend_from_slice(asset.as_bytes());
        }
        if let Some(amount) = self.amount {
            payload.extend_from_slice(amount.to_string().as_bytes());
        }
        payload.extend_from_slice(&self.at.timestamp_millis().to_le_bytes());
        payload
    }

    /// SHA-256 digest over [`Self::canonical_bytes`].
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher.finalize().into()
    }

    /// Hex-encoded digest, for log lines and exports.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> AuditRecord {
        AuditRecord::new(
            AuditKind::InvoicePaid,
            InvoiceId::new().to_string(),
            AccountId::new(),
            Some("USDC".to_string()),
            Some(Decimal::new(100, 0)),
        )
    }

    #[test]
    fn kind_display() {
        assert_eq!(format!("{}", AuditKind::InvoicePaid), "INVOICE_PAID");
        assert_eq!(format!("{}", AuditKind::TreasurySweep), "TREASURY_SWEEP");
        assert_eq!(format!("{}", WithdrawalKind::Merchant), "MERCHANT");
    }

    #[test]
    fn digest_deterministic() {
        let rec = make_record();
        assert_eq!(rec.digest(), rec.digest());
        assert_eq!(rec.digest_hex().len(), 64);
    }

    #[test]
    fn digest_differs_by_field() {
        let rec = make_record();
        let mut other = rec.clone();
        other.amount = Some(Decimal::new(101, 0));
        assert_ne!(rec.digest(), other.digest());

        let mut other = rec.clone();
        other.kind = AuditKind::InvoiceRefunded;
        assert_ne!(rec.digest(), other.digest());
    }

    #[test]
    fn withdrawal_record_serde_roundtrip() {
        let rec = WithdrawalRecord {
            asset: "USDC".to_string(),
            amount: Decimal::new(60, 0),
            recipient: AccountId::new(),
            initiated_by: AccountId::new(),
            kind: WithdrawalKind::Merchant,
            merchant: Some(AccountId::new()),
            invoice: None,
            at: Utc::now(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: WithdrawalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec.amount, back.amount);
        assert_eq!(rec.kind, back.kind);
        assert_eq!(rec.merchant, back.merchant);
    }

    #[test]
    fn audit_record_serde_roundtrip() {
        let rec = make_record();
        let json = serde_json::to_string(&rec).unwrap();
        let back: AuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec.digest(), back.digest());
    }
}
