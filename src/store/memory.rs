use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::{check_arrangement, AssignmentStore, RoomSource, StoreError, StudentSource, Transaction};

/// Non-durable store for embedding and tests.
///
/// Callers supply ids directly. Commits can be forced to fail to exercise
/// rollback paths.
pub struct MemoryStore {
    students: DashMap<Ulid, Student>,
    rooms: DashMap<Ulid, Room>,
    arrangements: DashMap<ExamDate, Vec<SeatAssignment>>,
    commit_lock: tokio::sync::Mutex<()>,
    commits: AtomicUsize,
    fail_commits: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            students: DashMap::new(),
            rooms: DashMap::new(),
            arrangements: DashMap::new(),
            commit_lock: tokio::sync::Mutex::new(()),
            commits: AtomicUsize::new(0),
            fail_commits: AtomicBool::new(false),
        }
    }

    pub fn with_roster(students: Vec<Student>, rooms: Vec<Room>) -> Self {
        let store = Self::new();
        for s in students {
            store.insert_student(s);
        }
        for r in rooms {
            store.insert_room(r);
        }
        store
    }

    pub fn insert_student(&self, student: Student) {
        self.students.insert(student.id, student);
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    /// Make every following commit fail with a WAL error until reset.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of commits attempted, successful or not.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StudentSource for MemoryStore {
    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self.students.iter().map(|e| e.value().clone()).collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }
}

#[async_trait]
impl RoomSource for MemoryStore {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn commit(&self, txn: Transaction) -> Result<(), StoreError> {
        let _c = self.commit_lock.lock().await;
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            txn.rollback();
            return Err(StoreError::WalError("injected commit failure".into()));
        }
        let exam_date = txn.exam_date();
        let existing = self
            .arrangements
            .get(&exam_date)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        let assignments = txn.resolve(&existing);
        check_arrangement(
            &assignments,
            |id| self.students.get(id).map(|s| s.subject_code.clone()),
            |id| self.rooms.get(id).map(|r| r.benches),
        )?;
        if assignments.is_empty() {
            self.arrangements.remove(&exam_date);
        } else {
            self.arrangements.insert(exam_date, assignments);
        }
        Ok(())
    }

    async fn list_for_date(&self, exam_date: ExamDate) -> Result<Vec<SeatAssignment>, StoreError> {
        Ok(self
            .arrangements
            .get(&exam_date)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn dates(&self) -> Result<Vec<ExamDate>, StoreError> {
        let mut dates: Vec<ExamDate> = self.arrangements.iter().map(|e| *e.key()).collect();
        dates.sort();
        Ok(dates)
    }
}
