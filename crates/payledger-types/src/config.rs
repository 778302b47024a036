//! Configuration for the settlement core.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable parameters for a settlement core instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Global default fee applied when no merchant override is set (bps).
    pub default_fee_bps: u32,
    /// Maximum payment options per invoice.
    pub max_payment_options: usize,
    /// Page size for recent-N history and audit queries.
    pub recent_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_fee_bps: constants::DEFAULT_FEE_BPS,
            max_payment_options: constants::MAX_PAYMENT_OPTIONS,
            recent_limit: constants::DEFAULT_RECENT_LIMIT,
        }
    }
}
