//! Persistence seams for the seating engine.
//!
//! The engine reads the roster through [`StudentSource`] and [`RoomSource`]
//! and writes arrangements through [`AssignmentStore`]. Writes are always
//! expressed as a [`Transaction`] scoped to one exam date and applied
//! all-or-nothing by `commit`.

mod durable;
mod error;
mod memory;

pub use durable::DurableStore;
pub use error::StoreError;
pub use memory::MemoryStore;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

#[async_trait]
pub trait StudentSource: Send + Sync {
    /// Every registered student, ascending by internal id.
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;
}

#[async_trait]
pub trait RoomSource: Send + Sync {
    /// Every registered room, ascending by internal id.
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Apply every staged operation of `txn`, or none of them.
    async fn commit(&self, txn: Transaction) -> Result<(), StoreError>;

    async fn list_for_date(&self, exam_date: ExamDate) -> Result<Vec<SeatAssignment>, StoreError>;

    /// Dates that currently have a non-empty arrangement, ascending.
    async fn dates(&self) -> Result<Vec<ExamDate>, StoreError>;
}

#[derive(Debug)]
enum TxnOp {
    DeleteAllForDate,
    Insert(Vec<SeatAssignment>),
}

/// Staged writes against one exam date's arrangement.
///
/// Nothing is visible to readers until the store commits it. Dropping an
/// uncommitted transaction discards it.
#[derive(Debug)]
pub struct Transaction {
    exam_date: ExamDate,
    ops: Vec<TxnOp>,
}

impl Transaction {
    pub fn new(exam_date: ExamDate) -> Self {
        Self { exam_date, ops: Vec::new() }
    }

    pub fn exam_date(&self) -> ExamDate {
        self.exam_date
    }

    pub fn delete_all_for_date(&mut self) {
        self.ops.push(TxnOp::DeleteAllForDate);
    }

    /// Stage `assignments` for insertion. Every record must carry this
    /// transaction's exam date.
    pub fn bulk_insert(&mut self, assignments: Vec<SeatAssignment>) -> Result<(), StoreError> {
        if let Some(a) = assignments.iter().find(|a| a.exam_date != self.exam_date) {
            return Err(StoreError::DateMismatch {
                expected: self.exam_date,
                found: a.exam_date,
            });
        }
        self.ops.push(TxnOp::Insert(assignments));
        Ok(())
    }

    pub fn rollback(self) {
        debug!(exam_date = %self.exam_date, ops = self.ops.len(), "transaction rolled back");
    }

    /// Compute the date's arrangement after applying the staged ops to `existing`.
    pub(crate) fn resolve(self, existing: &[SeatAssignment]) -> Vec<SeatAssignment> {
        let mut result = existing.to_vec();
        for op in self.ops {
            match op {
                TxnOp::DeleteAllForDate => result.clear(),
                TxnOp::Insert(batch) => result.extend(batch),
            }
        }
        result
    }
}

/// Verify that a date's resolved arrangement references live students and
/// rooms, stays inside each room's benches, seats every student at most once,
/// uses every seat at most once and never puts one subject twice on a bench.
pub(crate) fn check_arrangement(
    assignments: &[SeatAssignment],
    student_subject: impl Fn(&Ulid) -> Option<String>,
    room_benches: impl Fn(&Ulid) -> Option<u32>,
) -> Result<(), StoreError> {
    let mut seated = HashSet::with_capacity(assignments.len());
    let mut slots = HashSet::with_capacity(assignments.len());
    let mut bench_subjects = HashSet::with_capacity(assignments.len());
    for a in assignments {
        let subject = student_subject(&a.student_id).ok_or(StoreError::NotFound(a.student_id))?;
        let benches = room_benches(&a.room_id).ok_or(StoreError::NotFound(a.room_id))?;
        if a.bench == 0 || a.bench > benches {
            return Err(StoreError::Invalid("bench index outside room"));
        }
        if a.seat == 0 || a.seat > SEATS_PER_BENCH {
            return Err(StoreError::Invalid("seat number outside bench"));
        }
        if !seated.insert(a.student_id) {
            return Err(StoreError::Invalid("student seated twice on one date"));
        }
        if !slots.insert((a.room_id, a.bench, a.seat)) {
            return Err(StoreError::Invalid("seat assigned twice"));
        }
        if !bench_subjects.insert((a.room_id, a.bench, subject)) {
            return Err(StoreError::Invalid("subject repeated on one bench"));
        }
    }
    Ok(())
}

fn check_field(value: &str, max: usize, missing: &'static str, too_long: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid(missing));
    }
    if value.chars().count() > max {
        return Err(StoreError::LimitExceeded(too_long));
    }
    Ok(())
}

pub(crate) fn validate_new_student(s: &NewStudent) -> Result<(), StoreError> {
    check_field(&s.student_id, MAX_STUDENT_ID_LEN, "student id is required", "student id too long")?;
    check_field(&s.name, MAX_NAME_LEN, "name is required", "name too long")?;
    check_field(&s.subject_code, MAX_SUBJECT_CODE_LEN, "subject code is required", "subject code too long")?;
    check_field(&s.email, MAX_EMAIL_LEN, "email is required", "email too long")
}

pub(crate) fn validate_new_room(r: &NewRoom) -> Result<(), StoreError> {
    check_field(&r.room_number, MAX_ROOM_NUMBER_LEN, "room number is required", "room number too long")?;
    if r.capacity == 0 {
        return Err(StoreError::Invalid("capacity must be positive"));
    }
    if r.benches == 0 {
        return Err(StoreError::Invalid("room needs at least one bench"));
    }
    if r.benches > MAX_BENCHES_PER_ROOM {
        return Err(StoreError::LimitExceeded("too many benches in room"));
    }
    Ok(())
}
