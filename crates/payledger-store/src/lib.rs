//! # payledger-store
//!
//! The **Ledger Store**: sole holder of durable state for the settlement
//! core — invoices, balances, service-fee balances, whitelists, roles,
//! withdrawal history, treasury wallets, and the audit log.
//!
//! ## Access model
//!
//! The store has no business logic of its own. Every mutating call takes
//! the caller's identity explicitly and checks it against a versioned
//! authorized-mutator ACL; reads are unrestricted. Compound invariants are
//! the calling components' responsibility — the store only guarantees that
//! each single-record mutation is atomic and that subtractions never go
//! negative.

pub mod store;
pub mod whitelist;

pub use store::LedgerStore;
pub use whitelist::Whitelist;
