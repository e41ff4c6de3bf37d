pub mod balance;
pub mod capacity;
pub mod config;
pub mod decimal;
pub mod enrollment;
pub mod entry;
pub mod errors;
pub mod events;
pub mod service;
pub mod store;
pub mod types;

// re-export key types
pub use balance::{derive_status, recalculate, BalanceSummary};
pub use capacity::{AdmissionReceipt, CapacityGuard, TransitionReceipt};
pub use config::LedgerConfig;
pub use decimal::{Money, Percent};
pub use enrollment::{ClassRecord, Enrollment};
pub use entry::LedgerEntry;
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use service::{CorrectionReceipt, PaymentReceipt, PaymentService};
pub use store::{LedgerStore, MemoryStore, StoreTxn};
pub use types::{
    ClassId, ClassStatus, CreateEnrollment, EnrollmentId, EnrollmentStatus, EntryId, EntryKind,
    PaymentMethod, PaymentStatus, Principal, PrincipalId, RecordPayment, RecordRefund, Role,
    StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
