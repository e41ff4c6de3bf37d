use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{EnrollmentId, EntryId, EntryKind, PaymentMethod, PrincipalId};

/// immutable record of money moved against one enrollment
///
/// Refunds and corrections never edit an existing entry; the ledger is
/// append-only and history is reconstructable by replaying entries in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub enrollment_id: EnrollmentId,
    pub kind: EntryKind,
    pub amount: Money,
    pub method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
    /// external transaction id, if the channel supplies one
    pub reference: Option<String>,
    pub recorded_by: PrincipalId,
    /// refund reason or correction note
    pub note: Option<String>,
}

impl LedgerEntry {
    /// create a settlement entry
    pub fn settlement(
        enrollment_id: EnrollmentId,
        amount: Money,
        method: PaymentMethod,
        occurred_at: DateTime<Utc>,
        reference: Option<String>,
        recorded_by: PrincipalId,
    ) -> Result<Self> {
        Self::new(
            enrollment_id,
            EntryKind::Settlement,
            amount,
            method,
            occurred_at,
            reference,
            recorded_by,
            None,
        )
    }

    /// create a refund entry
    pub fn refund(
        enrollment_id: EnrollmentId,
        amount: Money,
        method: PaymentMethod,
        occurred_at: DateTime<Utc>,
        recorded_by: PrincipalId,
        reason: String,
    ) -> Result<Self> {
        Self::new(
            enrollment_id,
            EntryKind::Refund,
            amount,
            method,
            occurred_at,
            None,
            recorded_by,
            Some(reason),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        enrollment_id: EnrollmentId,
        kind: EntryKind,
        amount: Money,
        method: PaymentMethod,
        occurred_at: DateTime<Utc>,
        reference: Option<String>,
        recorded_by: PrincipalId,
        note: Option<String>,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            enrollment_id,
            kind,
            amount,
            method,
            occurred_at,
            reference,
            recorded_by,
            note,
        })
    }

    /// signed contribution of this entry to the paid amount
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            EntryKind::Settlement => self.amount,
            EntryKind::Refund => Money::ZERO - self.amount,
        }
    }
}
