use serde::{Deserialize, Serialize};

use crate::types::PaymentMethod;

/// operating policy for the ledger services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// bounded transparent retries on commit conflict before surfacing
    /// `Conflict` to the caller
    pub max_commit_attempts: u32,

    /// reject settlements into non-active enrollments; refunds are always
    /// accepted since collected money must be returnable
    pub require_active_for_payment: bool,

    /// channel recorded on refund entries (refunds are tracked at the
    /// enrollment level, not tied to one settlement's channel)
    pub refund_method: PaymentMethod,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            require_active_for_payment: true,
            refund_method: PaymentMethod::BankTransfer,
        }
    }
}

impl LedgerConfig {
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }
}
