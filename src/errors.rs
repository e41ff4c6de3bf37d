use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{ClassStatus, EnrollmentStatus, PaymentStatus};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid fee: {fee}")]
    InvalidFee {
        fee: Money,
    },

    #[error("invalid discount: must be between 0 and 100")]
    InvalidDiscount,

    #[error("class not found: {id}")]
    ClassNotFound {
        id: Uuid,
    },

    #[error("class closed to enrollment: status is {status:?}")]
    ClassClosed {
        status: ClassStatus,
    },

    #[error("class full: capacity {capacity}, current {current}")]
    ClassFull {
        capacity: u32,
        current: u32,
    },

    #[error("student already actively enrolled in class")]
    DuplicateEnrollment {
        student_id: Uuid,
        class_id: Uuid,
    },

    #[error("enrollment not found: {id}")]
    EnrollmentNotFound {
        id: Uuid,
    },

    #[error("enrollment not active: current status is {status:?}")]
    EnrollmentNotActive {
        status: EnrollmentStatus,
    },

    #[error("payment exceeds remaining balance: remaining {remaining}, requested {requested}")]
    ExceedsRemainingBalance {
        remaining: Money,
        requested: Money,
        paid_amount: Money,
        payment_status: PaymentStatus,
    },

    #[error("refund exceeds paid amount: paid {paid}, requested {requested}")]
    ExceedsPaidAmount {
        paid: Money,
        requested: Money,
        payment_status: PaymentStatus,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    },

    #[error("enrollment has ledger entries and cannot be removed: {count} entries")]
    EnrollmentHasEntries {
        count: usize,
    },

    #[error("ledger entry not found: {id}")]
    EntryNotFound {
        id: Uuid,
    },

    #[error("principal not authorized: {action}")]
    NotAuthorized {
        action: &'static str,
    },

    #[error("concurrent update conflict after {attempts} attempts")]
    Conflict {
        attempts: u32,
    },

    #[error("store unavailable: {message}")]
    StoreUnavailable {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
