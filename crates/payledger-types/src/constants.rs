//! System-wide constants for the PayLedger settlement core.

/// Fee bound: no default or per-merchant fee may exceed this (10%).
pub const MAX_FEE_BPS: u32 = 1000;

/// Basis-point denominator: 1 bps = 1/10_000.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Initial global default fee (1%).
pub const DEFAULT_FEE_BPS: u32 = 100;

/// Maximum payment options a single invoice may list.
pub const MAX_PAYMENT_OPTIONS: usize = 16;

/// Default page size for recent-N history and audit queries.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "PayLedger";
