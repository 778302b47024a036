//! # payledger-treasury
//!
//! The **Withdrawal & Treasury Manager**: merchants withdraw their ledger
//! balances, the treasury role sweeps accumulated protocol fees to
//! registered wallets, and every outbound move lands in the append-only
//! withdrawal history with per-merchant and per-wallet indices.

pub mod manager;

pub use manager::{TreasuryStats, WithdrawalManager, Withdrawals};
