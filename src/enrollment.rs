use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Percent};
use crate::errors::{LedgerError, Result};
use crate::types::{ClassId, ClassStatus, EnrollmentId, EnrollmentStatus, PaymentStatus, StudentId};

/// a student's registration in one class, carrying its own fee and payment state
///
/// `paid_amount` and `payment_status` are derived from the ledger and written
/// only by the payment service; no other component mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub class_id: ClassId,

    /// fee owed, fixed at enrollment time
    pub total_fee: Money,
    /// derived running balance, always within [0, total_fee]
    pub paid_amount: Money,
    pub discount_percent: Percent,
    pub payment_status: PaymentStatus,

    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,

    /// optimistic-concurrency version, bumped by the store on every write
    pub version: u64,
}

impl Enrollment {
    /// create a fresh enrollment with nothing collected
    pub fn new(
        student_id: StudentId,
        class_id: ClassId,
        total_fee: Money,
        discount_percent: Percent,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !total_fee.is_positive() {
            return Err(LedgerError::InvalidFee { fee: total_fee });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            student_id,
            class_id,
            total_fee,
            paid_amount: Money::ZERO,
            discount_percent,
            payment_status: PaymentStatus::Pending,
            status: EnrollmentStatus::Active,
            enrolled_at,
            last_status_change: enrolled_at,
            version: 0,
        })
    }

    /// amount still owed
    pub fn remaining_balance(&self) -> Money {
        (self.total_fee - self.paid_amount).max(Money::ZERO)
    }

    /// fee after discount; reporting figure only, the ledger validates
    /// against `total_fee`
    pub fn net_fee(&self) -> Money {
        self.total_fee - self.discount_percent.of(self.total_fee)
    }

    /// whether the full fee has been collected
    pub fn is_settled(&self) -> bool {
        self.paid_amount >= self.total_fee
    }

    /// whether new settlements are accepted (policy: active enrollments only)
    pub fn can_accept_payment(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    /// whether `new_status` is a legal lifecycle transition
    pub fn can_transition_to(&self, new_status: EnrollmentStatus) -> bool {
        use EnrollmentStatus::*;
        matches!(
            (self.status, new_status),
            (Active, Completed) | (Active, Dropped) | (Active, Suspended) | (Suspended, Active)
        )
    }

    /// apply a lifecycle transition, rejecting anything outside the state machine
    pub fn transition_to(
        &mut self,
        new_status: EnrollmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if !self.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }
        self.status = new_status;
        self.last_status_change = timestamp;
        Ok(())
    }

    /// whether this transition gives the class seat back
    pub fn releases_seat(new_status: EnrollmentStatus) -> bool {
        matches!(
            new_status,
            EnrollmentStatus::Dropped | EnrollmentStatus::Completed
        )
    }
}

/// capacity-bounded class the enrollment belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub capacity: u32,
    pub current_students: u32,
    pub status: ClassStatus,

    /// optimistic-concurrency version, bumped by the store on every write
    pub version: u64,
}

impl ClassRecord {
    pub fn new(capacity: u32, status: ClassStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            capacity,
            current_students: 0,
            status,
            version: 0,
        }
    }

    /// seats still open
    pub fn remaining_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.current_students)
    }

    pub fn has_capacity(&self) -> bool {
        self.current_students < self.capacity
    }
}
