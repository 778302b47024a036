//! # payledger-settlement
//!
//! The **Payment Settlement Engine**: validates and executes payment
//! against an invoice, computes and splits the protocol fee, updates
//! balances, and performs refunds.
//!
//! ## Ordering discipline
//!
//! Credit path (pay): pull the payer's funds into custody *first*, then
//! commit the full ledger effect (invoice `PAID`, merchant `+net`,
//! service fee `+fee`, audit) before anything else can run.
//!
//! Debit path (refund): commit the full ledger reversal *first*, then
//! push the gross amount back to the payer. Both paths run inside the
//! settlement [`ReentrancyGuard`] family.

pub mod engine;
pub mod guard;

pub use engine::{PaymentOutcome, Settlement, SettlementEngine};
pub use guard::ReentrancyGuard;
