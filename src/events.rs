use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ClassId, EnrollmentId, EnrollmentStatus, EntryId, PaymentMethod, PaymentStatus, PrincipalId,
    StudentId,
};

/// all events emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // enrollment lifecycle
    EnrollmentCreated {
        enrollment_id: EnrollmentId,
        student_id: StudentId,
        class_id: ClassId,
        total_fee: Money,
        seats_taken: u32,
        timestamp: DateTime<Utc>,
    },
    EnrollmentStatusChanged {
        enrollment_id: EnrollmentId,
        old_status: EnrollmentStatus,
        new_status: EnrollmentStatus,
        seat_released: bool,
        timestamp: DateTime<Utc>,
    },
    EnrollmentRetired {
        enrollment_id: EnrollmentId,
        class_id: ClassId,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    PaymentRecorded {
        enrollment_id: EnrollmentId,
        entry_id: EntryId,
        amount: Money,
        method: PaymentMethod,
        new_paid_amount: Money,
        new_payment_status: PaymentStatus,
        recorded_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
    RefundRecorded {
        enrollment_id: EnrollmentId,
        entry_id: EntryId,
        amount: Money,
        reason: String,
        new_paid_amount: Money,
        new_payment_status: PaymentStatus,
        recorded_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
    PaymentCorrected {
        enrollment_id: EnrollmentId,
        removed_entry_id: EntryId,
        removed_amount: Money,
        new_paid_amount: Money,
        new_payment_status: PaymentStatus,
        corrected_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },

    // derived status changes
    PaymentStatusChanged {
        enrollment_id: EnrollmentId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
