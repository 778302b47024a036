//! # payledger-types
//!
//! Shared types, errors, and configuration for the **PayLedger**
//! settlement core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`InvoiceId`], [`Asset`]
//! - **Invoice model**: [`Invoice`], [`InvoiceStatus`], [`PaymentOption`]
//! - **Roles**: [`Role`]
//! - **Fees**: [`FeeConfig`], [`fee_amount`]
//! - **Records**: [`WithdrawalRecord`], [`WithdrawalKind`],
//!   [`TreasuryWallet`], [`AuditRecord`], [`AuditKind`]
//! - **Custody boundary**: [`AssetGateway`]
//! - **Configuration**: [`CoreConfig`]
//! - **Errors**: [`LedgerError`] with `PL_ERR_` prefix codes
//! - **Constants**: fee bounds and system-wide defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod ids;
pub mod invoice;
pub mod record;
pub mod roles;

// Re-export all primary types at crate root for ergonomic imports:
//   use payledger_types::{Invoice, InvoiceStatus, Role, LedgerError, ...};

pub use config::*;
pub use error::*;
pub use fees::*;
pub use gateway::*;
pub use ids::*;
pub use invoice::*;
pub use record::*;
pub use roles::*;

// Constants are accessed via `payledger_types::constants::FOO`
// (not re-exported to avoid name collisions).
