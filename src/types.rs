use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Percent};
use crate::errors::{LedgerError, Result};

/// unique identifier for an enrollment
pub type EnrollmentId = Uuid;

/// unique identifier for a ledger entry
pub type EntryId = Uuid;

/// unique identifier for a class
pub type ClassId = Uuid;

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for an authenticated principal
pub type PrincipalId = Uuid;

/// derived payment classification for an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// nothing collected yet
    Pending,
    /// some amount collected, below the full fee
    Partial,
    /// full fee collected
    Paid,
    /// past its due date; applied by an external time-based process,
    /// never derived by the balance recalculator
    Overdue,
}

/// enrollment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    Suspended,
}

/// class lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassStatus {
    /// class announced, seats can be taken
    Planning,
    /// class running
    Active,
    /// class finished, no new enrollments
    Completed,
    /// class cancelled, no new enrollments
    Cancelled,
}

impl ClassStatus {
    /// whether new enrollments are admitted in this status
    pub fn accepts_enrollments(&self) -> bool {
        matches!(self, ClassStatus::Planning | ClassStatus::Active)
    }
}

/// direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// money received against the fee
    Settlement,
    /// money returned to the payer
    Refund,
}

/// payment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    MobileMoney,
    Cheque,
}

/// role attached to an authenticated principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// manages enrollments and class rosters
    Registrar,
    /// records payments and refunds
    Cashier,
    /// everything, including ledger corrections
    Admin,
}

impl Role {
    pub fn can_record_payments(&self) -> bool {
        matches!(self, Role::Cashier | Role::Admin)
    }

    pub fn can_manage_enrollments(&self) -> bool {
        matches!(self, Role::Registrar | Role::Admin)
    }

    pub fn can_correct_ledger(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// authenticated principal supplied by the authorization boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self { id, role }
    }
}

/// validated command: admit a student into a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEnrollment {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub total_fee: Money,
    pub discount_percent: Percent,
}

impl CreateEnrollment {
    /// build from untyped intake values, rejecting a discount outside 0-100
    pub fn with_discount(
        student_id: StudentId,
        class_id: ClassId,
        total_fee: Money,
        discount_percent: Decimal,
    ) -> Result<Self> {
        let discount_percent =
            Percent::from_decimal(discount_percent).ok_or(LedgerError::InvalidDiscount)?;
        Ok(Self {
            student_id,
            class_id,
            total_fee,
            discount_percent,
        })
    }
}

/// validated command: record money received against an enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub enrollment_id: EnrollmentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

/// validated command: return money against an enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRefund {
    pub enrollment_id: EnrollmentId,
    pub amount: Money,
    pub reason: String,
}
