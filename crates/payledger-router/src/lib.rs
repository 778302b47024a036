//! # payledger-router
//!
//! The **Router**: single external entry point for the settlement core.
//!
//! A mutating call is a [`Request`] — `{ caller, operation }` — executed
//! through [`Router::execute`], which checks the global pause switch and
//! dispatches to the owning component with the original caller's identity
//! intact. Components are trait objects selected at construction;
//! swapping an implementation never touches the dispatch surface.
//!
//! The canonical execution model is strictly serialized: `execute` takes
//! `&mut self`, so no two mutating operations can interleave. Callers
//! needing cross-thread access wrap the router in their own lock.

pub mod ops;
pub mod router;

pub use ops::{Operation, Reply, Request};
pub use router::{DepositModule, Router};
