use hourglass_rs::SafeTimeProvider;

use crate::config::LedgerConfig;
use crate::enrollment::Enrollment;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::store::{retry_on_conflict, LedgerStore, StoreTxn};
use crate::types::{CreateEnrollment, EnrollmentId, EnrollmentStatus, Principal};

/// result of admitting a student into a class
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionReceipt {
    pub enrollment: Enrollment,
    pub seats_taken: u32,
    pub events: Vec<Event>,
}

/// result of an enrollment lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReceipt {
    pub enrollment_id: EnrollmentId,
    pub old_status: EnrollmentStatus,
    pub new_status: EnrollmentStatus,
    pub seat_released: bool,
    pub events: Vec<Event>,
}

/// enforces class-capacity and enrollment-status rules at admission time
///
/// The seat counter and the enrollment row commit as a single atomic unit;
/// the capacity check is evaluated against a snapshot validated at commit,
/// so two racing admissions cannot jointly overshoot the capacity.
pub struct CapacityGuard<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> CapacityGuard<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// admit a student into a class
    pub fn create_enrollment(
        &self,
        principal: Principal,
        command: CreateEnrollment,
        time_provider: &SafeTimeProvider,
    ) -> Result<AdmissionReceipt> {
        if !principal.role.can_manage_enrollments() {
            return Err(LedgerError::NotAuthorized {
                action: "create enrollment",
            });
        }
        if !command.total_fee.is_positive() {
            return Err(LedgerError::InvalidFee {
                fee: command.total_fee,
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let class = txn.class_for_update(command.class_id)?;
            if !class.status.accepts_enrollments() {
                return Err(LedgerError::ClassClosed {
                    status: class.status,
                });
            }
            if !class.has_capacity() {
                return Err(LedgerError::ClassFull {
                    capacity: class.capacity,
                    current: class.current_students,
                });
            }
            if txn.has_active_enrollment(command.student_id, command.class_id)? {
                return Err(LedgerError::DuplicateEnrollment {
                    student_id: command.student_id,
                    class_id: command.class_id,
                });
            }

            let now = time_provider.now();
            let enrollment = Enrollment::new(
                command.student_id,
                command.class_id,
                command.total_fee,
                command.discount_percent,
                now,
            )?;
            let seats_taken = class.current_students + 1;

            txn.insert_enrollment(&enrollment)?;
            txn.update_class_seats(class.id, seats_taken)?;
            txn.commit()?;

            let mut events = EventStore::new();
            events.emit(Event::EnrollmentCreated {
                enrollment_id: enrollment.id,
                student_id: enrollment.student_id,
                class_id: enrollment.class_id,
                total_fee: enrollment.total_fee,
                seats_taken,
                timestamp: now,
            });

            Ok(AdmissionReceipt {
                enrollment,
                seats_taken,
                events: events.take_events(),
            })
        })
    }

    /// transition an enrollment through its lifecycle state machine
    ///
    /// Dropping or completing an enrollment gives its class seat back.
    pub fn transition_status(
        &self,
        principal: Principal,
        enrollment_id: EnrollmentId,
        new_status: EnrollmentStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<TransitionReceipt> {
        if !principal.role.can_manage_enrollments() {
            return Err(LedgerError::NotAuthorized {
                action: "transition enrollment status",
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let mut enrollment = txn.enrollment_for_update(enrollment_id)?;
            let old_status = enrollment.status;
            let now = time_provider.now();
            enrollment.transition_to(new_status, now)?;

            txn.update_enrollment_status(enrollment_id, new_status, now)?;

            let seat_released = Enrollment::releases_seat(new_status);
            if seat_released {
                let class = txn.class_for_update(enrollment.class_id)?;
                txn.update_class_seats(class.id, class.current_students.saturating_sub(1))?;
            }
            txn.commit()?;

            let mut events = EventStore::new();
            events.emit(Event::EnrollmentStatusChanged {
                enrollment_id,
                old_status,
                new_status,
                seat_released,
                timestamp: now,
            });

            Ok(TransitionReceipt {
                enrollment_id,
                old_status,
                new_status,
                seat_released,
                events: events.take_events(),
            })
        })
    }

    /// remove an enrollment that never saw money
    ///
    /// Rejected while any ledger entry exists; the audit trail outlives the
    /// enrollment's administrative mistakes. A held seat is given back.
    pub fn retire_enrollment(
        &self,
        principal: Principal,
        enrollment_id: EnrollmentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Event>> {
        if !principal.role.can_manage_enrollments() {
            return Err(LedgerError::NotAuthorized {
                action: "retire enrollment",
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let enrollment = txn.enrollment_for_update(enrollment_id)?;
            let entries = txn.entries_for(enrollment_id)?;
            if !entries.is_empty() {
                return Err(LedgerError::EnrollmentHasEntries {
                    count: entries.len(),
                });
            }

            let holds_seat = matches!(
                enrollment.status,
                EnrollmentStatus::Active | EnrollmentStatus::Suspended
            );
            if holds_seat {
                let class = txn.class_for_update(enrollment.class_id)?;
                txn.update_class_seats(class.id, class.current_students.saturating_sub(1))?;
            }
            txn.remove_enrollment(enrollment_id)?;
            txn.commit()?;

            let mut events = EventStore::new();
            events.emit(Event::EnrollmentRetired {
                enrollment_id,
                class_id: enrollment.class_id,
                timestamp: time_provider.now(),
            });

            Ok(events.take_events())
        })
    }
}
