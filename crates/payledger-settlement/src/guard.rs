//! Reentrancy guard for the value-moving operation families.
//!
//! Every top-level operation that crosses the custody boundary
//! (pay, refund, withdraw, sweep) runs inside a guard scoped to its
//! operation family. An external transfer that somehow calls back into
//! the same family before the operation completes hits the raised flag
//! and fails with `Reentrancy` instead of observing half-moved funds.

use payledger_types::{LedgerError, Result};

/// A per-family enter/leave flag.
///
/// Callers must pair [`enter`](Self::enter) with [`leave`](Self::leave)
/// on every path; the engines do this by running the operation body in a
/// separate function and leaving after it returns, success or not.
#[derive(Debug)]
pub struct ReentrancyGuard {
    family: &'static str,
    entered: bool,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            entered: false,
        }
    }

    /// Raise the flag.
    ///
    /// # Errors
    /// Returns `Reentrancy` if an operation of this family is already in
    /// flight.
    pub fn enter(&mut self) -> Result<()> {
        if self.entered {
            tracing::warn!(family = self.family, "reentrant call blocked");
            return Err(LedgerError::Reentrancy {
                family: self.family,
            });
        }
        self.entered = true;
        Ok(())
    }

    /// Lower the flag.
    pub fn leave(&mut self) {
        self.entered = false;
    }

    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_leave_cycle() {
        let mut guard = ReentrancyGuard::new("settlement");
        assert!(!guard.is_entered());
        guard.enter().unwrap();
        assert!(guard.is_entered());
        guard.leave();
        assert!(!guard.is_entered());
        guard.enter().unwrap();
    }

    #[test]
    fn nested_enter_blocked() {
        let mut guard = ReentrancyGuard::new("settlement");
        guard.enter().unwrap();
        let err = guard.enter().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Reentrancy {
                family: "settlement"
            }
        ));
        // The original entry is still in flight.
        assert!(guard.is_entered());
    }

    #[test]
    fn leave_reopens() {
        let mut guard = ReentrancyGuard::new("withdrawal");
        guard.enter().unwrap();
        guard.leave();
        guard.enter().unwrap();
        guard.leave();
        assert!(!guard.is_entered());
    }
}
