use tracing::warn;

use crate::decimal::Money;
use crate::entry::LedgerEntry;
use crate::types::PaymentStatus;

/// recomputed balance figures for one enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
}

/// recompute paid amount and payment status from the full ledger
///
/// Pure function: the single source of truth for the derived balance, never
/// a cached value carried across a request boundary. The sum is clamped to
/// `[0, total_fee]`; a pre-clamp value outside that range means an earlier
/// invariant was violated and is logged while the clamped value is returned.
pub fn recalculate(entries: &[LedgerEntry], total_fee: Money) -> BalanceSummary {
    let raw: Money = entries.iter().map(|e| e.signed_amount()).sum();
    let paid_amount = raw.clamp(Money::ZERO, total_fee);

    if raw != paid_amount {
        warn!(
            raw = %raw,
            total_fee = %total_fee,
            clamped = %paid_amount,
            "ledger sum outside [0, total_fee], clamping"
        );
    }

    BalanceSummary {
        paid_amount,
        payment_status: derive_status(paid_amount, total_fee),
    }
}

/// derive the payment status from paid amount vs total fee
///
/// Evaluated in order: paid, partial, pending. `Overdue` is an external
/// time-based classification and is never produced here.
pub fn derive_status(paid_amount: Money, total_fee: Money) -> PaymentStatus {
    if paid_amount >= total_fee {
        PaymentStatus::Paid
    } else if paid_amount > Money::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}
