//! # payledger-invoicing
//!
//! The **Invoice Lifecycle Manager**: creates, cancels, and expires
//! invoices, and answers invoice queries (by merchant, by status,
//! recent-N, batch, per-merchant stats).
//!
//! Settlement itself — moving an invoice to `PAID` or `REFUNDED` — is the
//! Payment Settlement Engine's job; this crate only ever moves invoices
//! out of `PENDING` sideways (cancel, expire).

pub mod lifecycle;

pub use lifecycle::{InvoiceLifecycle, InvoiceManager, InvoiceStats};
