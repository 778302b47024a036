//! # payledger-registry
//!
//! The **Authorization & Whitelist Registry**: role grants, global and
//! per-merchant asset whitelists, merchant whitelist, fee configuration,
//! and the global pause switch.
//!
//! Durable registry state lives in the Ledger Store; this crate holds the
//! permission logic the store deliberately does not: which role a caller
//! must present for each write, and what "accepted asset" means for a
//! given merchant.

pub mod registry;

pub use registry::AccessRegistry;
