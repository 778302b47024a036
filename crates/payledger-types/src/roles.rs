//! Privileged roles recognized by the authorization registry.
//!
//! Role checks are additive, not hierarchical: holding one role never
//! implies another. The single exception is `Administrator`, which
//! implicitly satisfies the checks guarding role management itself.

use serde::{Deserialize, Serialize};

/// A privileged role an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Grants and revokes any role, including `Administrator` to others.
    Administrator,
    /// Manages the merchant whitelist, per-merchant asset whitelists, and
    /// fee configuration.
    Onboarding,
    /// Manages the global asset whitelist.
    AssetManager,
    /// Registers treasury wallets and sweeps accumulated service fees.
    TreasuryManager,
    /// Performs privileged settlement actions on behalf of merchants:
    /// invoice creation, cancellation, and refunds.
    BackendOperator,
}

impl Role {
    /// All roles, for enumeration in queries and tests.
    pub const ALL: [Role; 5] = [
        Role::Administrator,
        Role::Onboarding,
        Role::AssetManager,
        Role::TreasuryManager,
        Role::BackendOperator,
    ];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Administrator => write!(f, "ADMINISTRATOR"),
            Self::Onboarding => write!(f, "ONBOARDING"),
            Self::AssetManager => write!(f, "ASSET_MANAGER"),
            Self::TreasuryManager => write!(f, "TREASURY_MANAGER"),
            Self::BackendOperator => write!(f, "BACKEND_OPERATOR"),
        }
    }
}
