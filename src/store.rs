use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::decimal::Money;
use crate::enrollment::{ClassRecord, Enrollment};
use crate::entry::LedgerEntry;
use crate::errors::{LedgerError, Result};
use crate::types::{ClassId, EnrollmentId, EnrollmentStatus, EntryId, PaymentStatus, StudentId};

/// transactional store the ledger runs against
///
/// The crate owns this seam, not the storage engine. Every command executes
/// as one transaction: reads see a consistent snapshot and all writes commit
/// together or not at all.
pub trait LedgerStore {
    type Txn<'a>: StoreTxn
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Txn<'_>>;
}

/// a single unit of work; dropping without commit rolls back
pub trait StoreTxn {
    /// read an enrollment, registering it for conflict detection at commit
    fn enrollment_for_update(&mut self, id: EnrollmentId) -> Result<Enrollment>;

    /// read a class, registering it for conflict detection at commit
    fn class_for_update(&mut self, id: ClassId) -> Result<ClassRecord>;

    /// ledger entries for one enrollment, in insertion order
    fn entries_for(&mut self, id: EnrollmentId) -> Result<Vec<LedgerEntry>>;

    /// look up a single entry
    fn entry(&mut self, id: EntryId) -> Result<LedgerEntry>;

    /// whether the student already holds an active enrollment in the class
    fn has_active_enrollment(&mut self, student_id: StudentId, class_id: ClassId) -> Result<bool>;

    fn insert_enrollment(&mut self, enrollment: &Enrollment) -> Result<()>;
    fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()>;
    fn remove_entry(&mut self, id: EntryId) -> Result<()>;
    fn update_enrollment_balance(
        &mut self,
        id: EnrollmentId,
        paid_amount: Money,
        payment_status: PaymentStatus,
    ) -> Result<()>;
    fn update_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
    fn update_class_seats(&mut self, id: ClassId, current_students: u32) -> Result<()>;
    fn remove_enrollment(&mut self, id: EnrollmentId) -> Result<()>;

    /// atomically apply all buffered writes; `Conflict` when any row read
    /// for update changed since it was read
    fn commit(self) -> Result<()>;
}

/// run a transactional operation, transparently retrying bounded times on
/// commit conflict before surfacing `Conflict` with the attempt count
pub(crate) fn retry_on_conflict<T>(
    max_attempts: u32,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Err(LedgerError::Conflict { .. }) if attempt < max_attempts => {
                tracing::debug!(attempt, "commit conflict, retrying");
            }
            Err(LedgerError::Conflict { .. }) => {
                return Err(LedgerError::Conflict { attempts: attempt });
            }
            other => return other,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    classes: HashMap<ClassId, ClassRecord>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    /// insertion-ordered ledger, shared across enrollments
    entries: Vec<LedgerEntry>,
}

/// in-memory reference store with optimistic concurrency
///
/// Rows carry a version; a transaction records the version of every row it
/// reads for update and validates them all under one lock at commit before
/// applying its buffered writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.inner.lock().map_err(|_| LedgerError::StoreUnavailable {
            message: "store lock poisoned".to_string(),
        })
    }

    /// seed a class outside any transaction (setup/administration path)
    pub fn put_class(&self, class: ClassRecord) -> Result<()> {
        self.lock()?.classes.insert(class.id, class);
        Ok(())
    }

    /// read-only snapshot of a class
    pub fn class(&self, id: ClassId) -> Result<ClassRecord> {
        self.lock()?
            .classes
            .get(&id)
            .cloned()
            .ok_or(LedgerError::ClassNotFound { id })
    }

    /// read-only snapshot of an enrollment
    pub fn enrollment(&self, id: EnrollmentId) -> Result<Enrollment> {
        self.lock()?
            .enrollments
            .get(&id)
            .cloned()
            .ok_or(LedgerError::EnrollmentNotFound { id })
    }

    /// read-only snapshot of an enrollment's ledger, in insertion order
    pub fn entries(&self, id: EnrollmentId) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.enrollment_id == id)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
enum BufferedWrite {
    InsertEnrollment(Enrollment),
    InsertEntry(LedgerEntry),
    RemoveEntry(EntryId),
    UpdateBalance {
        id: EnrollmentId,
        paid_amount: Money,
        payment_status: PaymentStatus,
    },
    UpdateStatus {
        id: EnrollmentId,
        status: EnrollmentStatus,
        timestamp: DateTime<Utc>,
    },
    UpdateSeats {
        id: ClassId,
        current_students: u32,
    },
    RemoveEnrollment(EnrollmentId),
}

/// buffered transaction against a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTxn<'a> {
    store: &'a MemoryStore,
    enrollment_versions: HashMap<EnrollmentId, u64>,
    class_versions: HashMap<ClassId, u64>,
    writes: Vec<BufferedWrite>,
}

impl<'a> MemoryTxn<'a> {
    fn new(store: &'a MemoryStore) -> Self {
        Self {
            store,
            enrollment_versions: HashMap::new(),
            class_versions: HashMap::new(),
            writes: Vec::new(),
        }
    }
}

impl StoreTxn for MemoryTxn<'_> {
    fn enrollment_for_update(&mut self, id: EnrollmentId) -> Result<Enrollment> {
        let enrollment = self.store.enrollment(id)?;
        self.enrollment_versions.insert(id, enrollment.version);
        Ok(enrollment)
    }

    fn class_for_update(&mut self, id: ClassId) -> Result<ClassRecord> {
        let class = self.store.class(id)?;
        self.class_versions.insert(id, class.version);
        Ok(class)
    }

    fn entries_for(&mut self, id: EnrollmentId) -> Result<Vec<LedgerEntry>> {
        self.store.entries(id)
    }

    fn entry(&mut self, id: EntryId) -> Result<LedgerEntry> {
        self.store
            .lock()?
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(LedgerError::EntryNotFound { id })
    }

    fn has_active_enrollment(&mut self, student_id: StudentId, class_id: ClassId) -> Result<bool> {
        Ok(self.store.lock()?.enrollments.values().any(|e| {
            e.student_id == student_id
                && e.class_id == class_id
                && e.status == EnrollmentStatus::Active
        }))
    }

    fn insert_enrollment(&mut self, enrollment: &Enrollment) -> Result<()> {
        self.writes
            .push(BufferedWrite::InsertEnrollment(enrollment.clone()));
        Ok(())
    }

    fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.writes.push(BufferedWrite::InsertEntry(entry.clone()));
        Ok(())
    }

    fn remove_entry(&mut self, id: EntryId) -> Result<()> {
        self.writes.push(BufferedWrite::RemoveEntry(id));
        Ok(())
    }

    fn update_enrollment_balance(
        &mut self,
        id: EnrollmentId,
        paid_amount: Money,
        payment_status: PaymentStatus,
    ) -> Result<()> {
        self.writes.push(BufferedWrite::UpdateBalance {
            id,
            paid_amount,
            payment_status,
        });
        Ok(())
    }

    fn update_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.writes.push(BufferedWrite::UpdateStatus {
            id,
            status,
            timestamp,
        });
        Ok(())
    }

    fn update_class_seats(&mut self, id: ClassId, current_students: u32) -> Result<()> {
        self.writes.push(BufferedWrite::UpdateSeats {
            id,
            current_students,
        });
        Ok(())
    }

    fn remove_enrollment(&mut self, id: EnrollmentId) -> Result<()> {
        self.writes.push(BufferedWrite::RemoveEnrollment(id));
        Ok(())
    }

    fn commit(self) -> Result<()> {
        let mut state = self.store.lock()?;

        // validate every row read for update against its recorded version
        for (id, version) in &self.enrollment_versions {
            match state.enrollments.get(id) {
                Some(current) if current.version == *version => {}
                Some(_) => return Err(LedgerError::Conflict { attempts: 1 }),
                None => return Err(LedgerError::EnrollmentNotFound { id: *id }),
            }
        }
        for (id, version) in &self.class_versions {
            match state.classes.get(id) {
                Some(current) if current.version == *version => {}
                Some(_) => return Err(LedgerError::Conflict { attempts: 1 }),
                None => return Err(LedgerError::ClassNotFound { id: *id }),
            }
        }

        // apply writes in order, bumping row versions
        for write in self.writes {
            match write {
                BufferedWrite::InsertEnrollment(e) => {
                    state.enrollments.insert(e.id, e);
                }
                BufferedWrite::InsertEntry(entry) => {
                    state.entries.push(entry);
                }
                BufferedWrite::RemoveEntry(id) => {
                    state.entries.retain(|e| e.id != id);
                }
                BufferedWrite::UpdateBalance {
                    id,
                    paid_amount,
                    payment_status,
                } => {
                    let enrollment = state
                        .enrollments
                        .get_mut(&id)
                        .ok_or(LedgerError::EnrollmentNotFound { id })?;
                    enrollment.paid_amount = paid_amount;
                    enrollment.payment_status = payment_status;
                    enrollment.version += 1;
                }
                BufferedWrite::UpdateStatus {
                    id,
                    status,
                    timestamp,
                } => {
                    let enrollment = state
                        .enrollments
                        .get_mut(&id)
                        .ok_or(LedgerError::EnrollmentNotFound { id })?;
                    enrollment.status = status;
                    enrollment.last_status_change = timestamp;
                    enrollment.version += 1;
                }
                BufferedWrite::UpdateSeats {
                    id,
                    current_students,
                } => {
                    let class = state
                        .classes
                        .get_mut(&id)
                        .ok_or(LedgerError::ClassNotFound { id })?;
                    class.current_students = current_students;
                    class.version += 1;
                }
                BufferedWrite::RemoveEnrollment(id) => {
                    state.enrollments.remove(&id);
                }
            }
        }

        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&self) -> Result<Self::Txn<'_>> {
        Ok(MemoryTxn::new(self))
    }
}
