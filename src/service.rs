use hourglass_rs::SafeTimeProvider;

use crate::balance::recalculate;
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::entry::LedgerEntry;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::store::{retry_on_conflict, LedgerStore, StoreTxn};
use crate::types::{EntryId, PaymentStatus, Principal, RecordPayment, RecordRefund};

/// result of a recorded settlement or refund
///
/// Carries the authoritative post-commit figures so callers reconcile
/// immediately instead of re-querying.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub entry: LedgerEntry,
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub remaining_balance: Money,
    pub events: Vec<Event>,
}

/// result of an administrative ledger correction
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionReceipt {
    pub removed: LedgerEntry,
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub events: Vec<Event>,
}

/// orchestrates ledger-entry creation and recalculation
///
/// All balance mutation flows through here: a new entry and the recomputed
/// enrollment balance commit in the same transaction, and a rejected command
/// writes nothing. Commit conflicts are retried transparently up to the
/// configured bound.
pub struct PaymentService<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: LedgerStore> PaymentService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// record money received against an enrollment
    pub fn apply_payment(
        &self,
        principal: Principal,
        command: RecordPayment,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        if !principal.role.can_record_payments() {
            return Err(LedgerError::NotAuthorized {
                action: "record payment",
            });
        }
        if !command.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: command.amount,
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let enrollment = txn.enrollment_for_update(command.enrollment_id)?;
            if self.config.require_active_for_payment && !enrollment.can_accept_payment() {
                return Err(LedgerError::EnrollmentNotActive {
                    status: enrollment.status,
                });
            }

            let remaining = enrollment.remaining_balance();
            if command.amount > remaining {
                return Err(LedgerError::ExceedsRemainingBalance {
                    remaining,
                    requested: command.amount,
                    paid_amount: enrollment.paid_amount,
                    payment_status: enrollment.payment_status,
                });
            }

            let now = time_provider.now();
            let entry = LedgerEntry::settlement(
                enrollment.id,
                command.amount,
                command.method,
                now,
                command.reference.clone(),
                principal.id,
            )?;

            let mut entries = txn.entries_for(enrollment.id)?;
            entries.push(entry.clone());
            let summary = recalculate(&entries, enrollment.total_fee);

            txn.insert_entry(&entry)?;
            txn.update_enrollment_balance(
                enrollment.id,
                summary.paid_amount,
                summary.payment_status,
            )?;
            txn.commit()?;

            let mut events = EventStore::new();
            events.emit(Event::PaymentRecorded {
                enrollment_id: enrollment.id,
                entry_id: entry.id,
                amount: entry.amount,
                method: entry.method,
                new_paid_amount: summary.paid_amount,
                new_payment_status: summary.payment_status,
                recorded_by: principal.id,
                timestamp: now,
            });
            if summary.payment_status != enrollment.payment_status {
                events.emit(Event::PaymentStatusChanged {
                    enrollment_id: enrollment.id,
                    old_status: enrollment.payment_status,
                    new_status: summary.payment_status,
                    timestamp: now,
                });
            }

            Ok(PaymentReceipt {
                entry,
                paid_amount: summary.paid_amount,
                payment_status: summary.payment_status,
                remaining_balance: enrollment.total_fee - summary.paid_amount,
                events: events.take_events(),
            })
        })
    }

    /// return money against an enrollment
    ///
    /// Never edits or deletes a settlement: the refund is its own entry and
    /// the ledger stays replayable in insertion order. Accepted regardless of
    /// enrollment status, since collected money must be returnable.
    pub fn refund_payment(
        &self,
        principal: Principal,
        command: RecordRefund,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        if !principal.role.can_record_payments() {
            return Err(LedgerError::NotAuthorized {
                action: "record refund",
            });
        }
        if !command.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: command.amount,
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let enrollment = txn.enrollment_for_update(command.enrollment_id)?;
            if command.amount > enrollment.paid_amount {
                return Err(LedgerError::ExceedsPaidAmount {
                    paid: enrollment.paid_amount,
                    requested: command.amount,
                    payment_status: enrollment.payment_status,
                });
            }

            let now = time_provider.now();
            let entry = LedgerEntry::refund(
                enrollment.id,
                command.amount,
                self.config.refund_method,
                now,
                principal.id,
                command.reason.clone(),
            )?;

            let mut entries = txn.entries_for(enrollment.id)?;
            entries.push(entry.clone());
            let summary = recalculate(&entries, enrollment.total_fee);

            txn.insert_entry(&entry)?;
            txn.update_enrollment_balance(
                enrollment.id,
                summary.paid_amount,
                summary.payment_status,
            )?;
            txn.commit()?;

            let mut events = EventStore::new();
            events.emit(Event::RefundRecorded {
                enrollment_id: enrollment.id,
                entry_id: entry.id,
                amount: entry.amount,
                reason: command.reason.clone(),
                new_paid_amount: summary.paid_amount,
                new_payment_status: summary.payment_status,
                recorded_by: principal.id,
                timestamp: now,
            });
            if summary.payment_status != enrollment.payment_status {
                events.emit(Event::PaymentStatusChanged {
                    enrollment_id: enrollment.id,
                    old_status: enrollment.payment_status,
                    new_status: summary.payment_status,
                    timestamp: now,
                });
            }

            Ok(PaymentReceipt {
                entry,
                paid_amount: summary.paid_amount,
                payment_status: summary.payment_status,
                remaining_balance: enrollment.total_fee - summary.paid_amount,
                events: events.take_events(),
            })
        })
    }

    /// administrative correction: remove a mis-keyed entry and recompute
    ///
    /// Privileged principals only. Recomputes from the remaining ledger
    /// exactly as a refund delta would; the recalculator's clamp keeps the
    /// balance from going negative.
    pub fn correct_payment(
        &self,
        principal: Principal,
        entry_id: EntryId,
        time_provider: &SafeTimeProvider,
    ) -> Result<CorrectionReceipt> {
        if !principal.role.can_correct_ledger() {
            return Err(LedgerError::NotAuthorized {
                action: "correct ledger entry",
            });
        }

        retry_on_conflict(self.config.max_commit_attempts, || {
            let mut txn = self.store.begin()?;

            let removed = txn.entry(entry_id)?;
            let enrollment = txn.enrollment_for_update(removed.enrollment_id)?;

            let entries: Vec<LedgerEntry> = txn
                .entries_for(enrollment.id)?
                .into_iter()
                .filter(|e| e.id != entry_id)
                .collect();
            let summary = recalculate(&entries, enrollment.total_fee);

            txn.remove_entry(entry_id)?;
            txn.update_enrollment_balance(
                enrollment.id,
                summary.paid_amount,
                summary.payment_status,
            )?;
            txn.commit()?;

            let now = time_provider.now();
            let mut events = EventStore::new();
            events.emit(Event::PaymentCorrected {
                enrollment_id: enrollment.id,
                removed_entry_id: removed.id,
                removed_amount: removed.amount,
                new_paid_amount: summary.paid_amount,
                new_payment_status: summary.payment_status,
                corrected_by: principal.id,
                timestamp: now,
            });
            if summary.payment_status != enrollment.payment_status {
                events.emit(Event::PaymentStatusChanged {
                    enrollment_id: enrollment.id,
                    old_status: enrollment.payment_status,
                    new_status: summary.payment_status,
                    timestamp: now,
                });
            }

            Ok(CorrectionReceipt {
                removed,
                paid_amount: summary.paid_amount,
                payment_status: summary.payment_status,
                events: events.take_events(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::CapacityGuard;
    use crate::decimal::Percent;
    use crate::enrollment::ClassRecord;
    use crate::store::MemoryStore;
    use crate::types::{
        ClassStatus, CreateEnrollment, EnrollmentId, EnrollmentStatus, PaymentMethod, Role,
    };
    use chrono::Utc;
    use hourglass_rs::TimeSource;
    use std::sync::Arc;
    use uuid::Uuid;

    fn cashier() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Cashier)
    }

    fn admin() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Admin)
    }

    fn fixed_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc::now()))
    }

    fn pay(enrollment_id: EnrollmentId, amount: i64) -> RecordPayment {
        RecordPayment {
            enrollment_id,
            amount: Money::from_major(amount),
            method: PaymentMethod::Cash,
            reference: None,
        }
    }

    fn refund(enrollment_id: EnrollmentId, amount: i64) -> RecordRefund {
        RecordRefund {
            enrollment_id,
            amount: Money::from_major(amount),
            reason: "student withdrew".to_string(),
        }
    }

    /// store + service with one active enrollment of the given fee
    fn service_with_enrollment(fee: i64) -> (PaymentService<MemoryStore>, EnrollmentId) {
        let store = MemoryStore::new();
        let class = ClassRecord::new(30, ClassStatus::Active);
        store.put_class(class.clone()).unwrap();

        let guard = CapacityGuard::new(store.clone(), LedgerConfig::default());
        let receipt = guard
            .create_enrollment(
                Principal::new(Uuid::new_v4(), Role::Registrar),
                CreateEnrollment {
                    student_id: Uuid::new_v4(),
                    class_id: class.id,
                    total_fee: Money::from_major(fee),
                    discount_percent: Percent::ZERO,
                },
                &fixed_time(),
            )
            .unwrap();

        (
            PaymentService::new(store, LedgerConfig::default()),
            receipt.enrollment.id,
        )
    }

    #[test]
    fn test_partial_then_full_payment() {
        let (service, id) = service_with_enrollment(1_000_000);
        let time = fixed_time();

        let receipt = service
            .apply_payment(cashier(), pay(id, 400_000), &time)
            .unwrap();
        assert_eq!(receipt.paid_amount, Money::from_major(400_000));
        assert_eq!(receipt.payment_status, PaymentStatus::Partial);
        assert_eq!(receipt.remaining_balance, Money::from_major(600_000));

        let receipt = service
            .apply_payment(cashier(), pay(id, 600_000), &time)
            .unwrap();
        assert_eq!(receipt.paid_amount, Money::from_major(1_000_000));
        assert_eq!(receipt.payment_status, PaymentStatus::Paid);
        assert_eq!(receipt.remaining_balance, Money::ZERO);

        let stored = service.store().enrollment(id).unwrap();
        assert_eq!(stored.paid_amount, Money::from_major(1_000_000));
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert!(stored.is_settled());
    }

    #[test]
    fn test_overpayment_rejected_without_mutation() {
        let (service, id) = service_with_enrollment(1_000_000);
        let time = fixed_time();

        service
            .apply_payment(cashier(), pay(id, 1_000_000), &time)
            .unwrap();

        let err = service.apply_payment(cashier(), pay(id, 1), &time);
        match err {
            Err(LedgerError::ExceedsRemainingBalance {
                remaining,
                paid_amount,
                ..
            }) => {
                assert_eq!(remaining, Money::ZERO);
                assert_eq!(paid_amount, Money::from_major(1_000_000));
            }
            other => panic!("expected ExceedsRemainingBalance, got {other:?}"),
        }

        // rejection mutated nothing
        let stored = service.store().enrollment(id).unwrap();
        assert_eq!(stored.paid_amount, Money::from_major(1_000_000));
        assert_eq!(service.store().entries(id).unwrap().len(), 1);
    }

    #[test]
    fn test_full_refund_returns_to_pending() {
        let (service, id) = service_with_enrollment(1_000_000);
        let time = fixed_time();

        service
            .apply_payment(cashier(), pay(id, 1_000_000), &time)
            .unwrap();
        let receipt = service
            .refund_payment(cashier(), refund(id, 1_000_000), &time)
            .unwrap();

        assert_eq!(receipt.paid_amount, Money::ZERO);
        assert_eq!(receipt.payment_status, PaymentStatus::Pending);

        // settlement entry still on the ledger, refund appended
        let entries = service.store().entries(id).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_refund_exceeding_paid_rejected() {
        let (service, id) = service_with_enrollment(1_000_000);
        let time = fixed_time();

        service
            .apply_payment(cashier(), pay(id, 300_000), &time)
            .unwrap();

        let err = service.refund_payment(cashier(), refund(id, 500_000), &time);
        match err {
            Err(LedgerError::ExceedsPaidAmount { paid, .. }) => {
                assert_eq!(paid, Money::from_major(300_000));
            }
            other => panic!("expected ExceedsPaidAmount, got {other:?}"),
        }

        let stored = service.store().enrollment(id).unwrap();
        assert_eq!(stored.paid_amount, Money::from_major(300_000));
        assert_eq!(service.store().entries(id).unwrap().len(), 1);
    }

    #[test]
    fn test_payment_into_dropped_enrollment_rejected() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        let guard = CapacityGuard::new(service.store().clone(), LedgerConfig::default());
        guard
            .transition_status(
                Principal::new(Uuid::new_v4(), Role::Registrar),
                id,
                EnrollmentStatus::Dropped,
                &time,
            )
            .unwrap();

        let err = service.apply_payment(cashier(), pay(id, 100), &time);
        assert!(matches!(
            err,
            Err(LedgerError::EnrollmentNotActive {
                status: EnrollmentStatus::Dropped
            })
        ));
    }

    #[test]
    fn test_refund_allowed_on_dropped_enrollment() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        service.apply_payment(cashier(), pay(id, 600), &time).unwrap();

        let guard = CapacityGuard::new(service.store().clone(), LedgerConfig::default());
        guard
            .transition_status(
                Principal::new(Uuid::new_v4(), Role::Registrar),
                id,
                EnrollmentStatus::Dropped,
                &time,
            )
            .unwrap();

        let receipt = service
            .refund_payment(cashier(), refund(id, 600), &time)
            .unwrap();
        assert_eq!(receipt.paid_amount, Money::ZERO);
        assert_eq!(receipt.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_registrar_cannot_record_payments() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        let err = service.apply_payment(
            Principal::new(Uuid::new_v4(), Role::Registrar),
            pay(id, 100),
            &time,
        );
        assert!(matches!(err, Err(LedgerError::NotAuthorized { .. })));
    }

    #[test]
    fn test_correction_requires_admin_and_recomputes() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        let first = service.apply_payment(cashier(), pay(id, 400), &time).unwrap();
        service.apply_payment(cashier(), pay(id, 600), &time).unwrap();

        let err = service.correct_payment(cashier(), first.entry.id, &time);
        assert!(matches!(err, Err(LedgerError::NotAuthorized { .. })));

        let receipt = service
            .correct_payment(admin(), first.entry.id, &time)
            .unwrap();
        assert_eq!(receipt.removed.id, first.entry.id);
        assert_eq!(receipt.paid_amount, Money::from_major(600));
        assert_eq!(receipt.payment_status, PaymentStatus::Partial);

        let stored = service.store().enrollment(id).unwrap();
        assert_eq!(stored.paid_amount, Money::from_major(600));
        assert_eq!(service.store().entries(id).unwrap().len(), 1);
    }

    #[test]
    fn test_correction_clamps_at_zero() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        let first = service.apply_payment(cashier(), pay(id, 1000), &time).unwrap();
        service
            .refund_payment(cashier(), refund(id, 800), &time)
            .unwrap();

        // removing the settlement leaves only the refund; clamp holds at zero
        let receipt = service
            .correct_payment(admin(), first.entry.id, &time)
            .unwrap();
        assert_eq!(receipt.paid_amount, Money::ZERO);
        assert_eq!(receipt.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_status_change_events_emitted() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();

        let receipt = service.apply_payment(cashier(), pay(id, 400), &time).unwrap();
        assert!(receipt.events.iter().any(|e| matches!(
            e,
            Event::PaymentStatusChanged {
                old_status: PaymentStatus::Pending,
                new_status: PaymentStatus::Partial,
                ..
            }
        )));

        // second partial payment keeps the status, no transition event
        let receipt = service.apply_payment(cashier(), pay(id, 100), &time).unwrap();
        assert!(!receipt
            .events
            .iter()
            .any(|e| matches!(e, Event::PaymentStatusChanged { .. })));
    }

    #[test]
    fn test_interleaved_sequence_keeps_invariant() {
        let (service, id) = service_with_enrollment(1000);
        let time = fixed_time();
        let fee = Money::from_major(1000);

        let steps: Vec<(bool, i64)> = vec![
            (true, 300),
            (false, 100),
            (true, 700),
            (false, 950), // exceeds paid, rejected
            (true, 100),
            (false, 1000),
            (true, 1000),
        ];

        for (is_payment, amount) in steps {
            let _ = if is_payment {
                service.apply_payment(cashier(), pay(id, amount), &time)
            } else {
                service.refund_payment(cashier(), refund(id, amount), &time)
            };

            // balance invariant and derived status hold after every step,
            // accepted or rejected
            let stored = service.store().enrollment(id).unwrap();
            assert!(stored.paid_amount >= Money::ZERO);
            assert!(stored.paid_amount <= fee);
            assert_eq!(
                stored.payment_status,
                crate::balance::derive_status(stored.paid_amount, fee)
            );
            let ledger_sum: Money = service
                .store()
                .entries(id)
                .unwrap()
                .iter()
                .map(|e| e.signed_amount())
                .sum();
            assert_eq!(stored.paid_amount, ledger_sum);
        }
    }

    #[test]
    fn test_concurrent_payments_never_overshoot() {
        let (service, id) = service_with_enrollment(1200);
        let service = Arc::new(PaymentService::new(
            service.store().clone(),
            LedgerConfig::default().with_max_commit_attempts(20),
        ));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    let time = fixed_time();
                    service.apply_payment(cashier(), pay(id, 400), &time)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::ExceedsRemainingBalance { .. })))
            .count();

        // exactly enough successes to reach the fee, never past it
        assert_eq!(succeeded, 3);
        assert_eq!(rejected, 2);

        let stored = service.store().enrollment(id).unwrap();
        assert_eq!(stored.paid_amount, Money::from_major(1200));
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(service.store().entries(id).unwrap().len(), 3);
    }

    /// store wrapper that fails the first N commits with a conflict
    mod flaky {
        use super::*;
        use crate::store::{LedgerStore, MemoryStore, MemoryTxn, StoreTxn};
        use chrono::{DateTime, Utc};
        use std::sync::atomic::{AtomicU32, Ordering};

        pub struct FlakyStore {
            pub inner: MemoryStore,
            pub failures_left: AtomicU32,
        }

        pub struct FlakyTxn<'a> {
            inner: MemoryTxn<'a>,
            failures_left: &'a AtomicU32,
        }

        impl LedgerStore for FlakyStore {
            type Txn<'a> = FlakyTxn<'a>;

            fn begin(&self) -> crate::errors::Result<Self::Txn<'_>> {
                Ok(FlakyTxn {
                    inner: self.inner.begin()?,
                    failures_left: &self.failures_left,
                })
            }
        }

        impl StoreTxn for FlakyTxn<'_> {
            fn enrollment_for_update(
                &mut self,
                id: crate::types::EnrollmentId,
            ) -> crate::errors::Result<crate::enrollment::Enrollment> {
                self.inner.enrollment_for_update(id)
            }

            fn class_for_update(
                &mut self,
                id: crate::types::ClassId,
            ) -> crate::errors::Result<crate::enrollment::ClassRecord> {
                self.inner.class_for_update(id)
            }

            fn entries_for(
                &mut self,
                id: crate::types::EnrollmentId,
            ) -> crate::errors::Result<Vec<LedgerEntry>> {
                self.inner.entries_for(id)
            }

            fn entry(&mut self, id: EntryId) -> crate::errors::Result<LedgerEntry> {
                self.inner.entry(id)
            }

            fn has_active_enrollment(
                &mut self,
                student_id: crate::types::StudentId,
                class_id: crate::types::ClassId,
            ) -> crate::errors::Result<bool> {
                self.inner.has_active_enrollment(student_id, class_id)
            }

            fn insert_enrollment(
                &mut self,
                enrollment: &crate::enrollment::Enrollment,
            ) -> crate::errors::Result<()> {
                self.inner.insert_enrollment(enrollment)
            }

            fn insert_entry(&mut self, entry: &LedgerEntry) -> crate::errors::Result<()> {
                self.inner.insert_entry(entry)
            }

            fn remove_entry(&mut self, id: EntryId) -> crate::errors::Result<()> {
                self.inner.remove_entry(id)
            }

            fn update_enrollment_balance(
                &mut self,
                id: crate::types::EnrollmentId,
                paid_amount: Money,
                payment_status: PaymentStatus,
            ) -> crate::errors::Result<()> {
                self.inner.update_enrollment_balance(id, paid_amount, payment_status)
            }

            fn update_enrollment_status(
                &mut self,
                id: crate::types::EnrollmentId,
                status: EnrollmentStatus,
                timestamp: DateTime<Utc>,
            ) -> crate::errors::Result<()> {
                self.inner.update_enrollment_status(id, status, timestamp)
            }

            fn update_class_seats(
                &mut self,
                id: crate::types::ClassId,
                current_students: u32,
            ) -> crate::errors::Result<()> {
                self.inner.update_class_seats(id, current_students)
            }

            fn remove_enrollment(
                &mut self,
                id: crate::types::EnrollmentId,
            ) -> crate::errors::Result<()> {
                self.inner.remove_enrollment(id)
            }

            fn commit(self) -> crate::errors::Result<()> {
                if self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(LedgerError::Conflict { attempts: 1 });
                }
                self.inner.commit()
            }
        }
    }

    #[test]
    fn test_conflicts_retried_transparently() {
        use std::sync::atomic::AtomicU32;

        let (service, id) = service_with_enrollment(1000);
        let flaky = flaky::FlakyStore {
            inner: service.store().clone(),
            failures_left: AtomicU32::new(2),
        };
        let service = PaymentService::new(flaky, LedgerConfig::default());
        let time = fixed_time();

        // two injected conflicts, third attempt lands
        let receipt = service.apply_payment(cashier(), pay(id, 400), &time).unwrap();
        assert_eq!(receipt.paid_amount, Money::from_major(400));
    }

    #[test]
    fn test_conflicts_exhaust_into_error() {
        use std::sync::atomic::AtomicU32;

        let (service, id) = service_with_enrollment(1000);
        let flaky = flaky::FlakyStore {
            inner: service.store().clone(),
            failures_left: AtomicU32::new(u32::MAX),
        };
        let service = PaymentService::new(flaky, LedgerConfig::default());
        let time = fixed_time();

        let err = service.apply_payment(cashier(), pay(id, 400), &time);
        assert!(matches!(err, Err(LedgerError::Conflict { attempts: 3 })));
    }
}
