use std::io;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use ulid::{Generator, Ulid};

use crate::limits::*;
use crate::model::*;
use crate::wal::Wal;

use super::{
    check_arrangement, validate_new_room, validate_new_student, AssignmentStore, RoomSource,
    StoreError, StudentSource, Transaction,
};

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: StoreEvent,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<StoreEvent>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends.
/// 4. Single flush_sync for the whole batch, then answer every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                    .record(batch.len() as f64);
                let flush_start = std::time::Instant::now();
                let result = flush_batch(&mut wal, &batch);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                for (_, tx) in batch {
                    let r = match &result {
                        Ok(()) => Ok(()),
                        Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
                    };
                    let _ = tx.send(r);
                }

                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(StoreEvent, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even on append error, so partially buffered bytes
    // don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.rewrite(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// WAL-backed registry of students, rooms and per-date seating arrangements.
///
/// All state lives in memory and is rebuilt from the log on open. Every
/// mutation is appended to the log before it becomes visible.
pub struct DurableStore {
    students: DashMap<Ulid, Student>,
    rooms: DashMap<Ulid, Room>,
    /// External student id → internal id
    student_index: DashMap<String, Ulid>,
    /// Room number → internal id
    room_index: DashMap<String, Ulid>,
    arrangements: DashMap<ExamDate, Vec<SeatAssignment>>,
    ids: Mutex<Generator>,
    /// Serializes mutations so uniqueness and reference checks see a stable registry.
    write_lock: tokio::sync::Mutex<()>,
    wal_tx: mpsc::Sender<WalCommand>,
}

impl DurableStore {
    /// Replay the log at `path` and start the group-commit writer.
    /// Must be called inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Wal::replay(path)?;
        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(1024);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = Self {
            students: DashMap::new(),
            rooms: DashMap::new(),
            student_index: DashMap::new(),
            room_index: DashMap::new(),
            arrangements: DashMap::new(),
            ids: Mutex::new(Generator::new()),
            write_lock: tokio::sync::Mutex::new(()),
            wal_tx,
        };
        for event in &events {
            store.apply(event);
        }
        info!(
            path = %path.display(),
            events = events.len(),
            students = store.students.len(),
            rooms = store.rooms.len(),
            dates = store.arrangements.len(),
            "store opened"
        );
        Ok(store)
    }

    /// Apply an event to the in-memory state. Caller has already made it durable.
    fn apply(&self, event: &StoreEvent) {
        match event {
            StoreEvent::StudentAdded(s) => {
                self.student_index.insert(s.student_id.clone(), s.id);
                self.students.insert(s.id, s.clone());
            }
            StoreEvent::StudentRemoved { id } => {
                if let Some((_, s)) = self.students.remove(id) {
                    self.student_index.remove(&s.student_id);
                }
            }
            StoreEvent::RoomAdded(r) => {
                self.room_index.insert(r.room_number.clone(), r.id);
                self.rooms.insert(r.id, r.clone());
            }
            StoreEvent::RoomRemoved { id } => {
                if let Some((_, r)) = self.rooms.remove(id) {
                    self.room_index.remove(&r.room_number);
                }
            }
            StoreEvent::ArrangementReplaced { exam_date, assignments } => {
                if assignments.is_empty() {
                    self.arrangements.remove(exam_date);
                } else {
                    self.arrangements.insert(*exam_date, assignments.clone());
                }
            }
        }
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &StoreEvent) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    async fn persist_and_apply(&self, event: StoreEvent) -> Result<(), StoreError> {
        self.wal_append(&event).await?;
        self.apply(&event);
        Ok(())
    }

    fn next_id(&self) -> Result<Ulid, StoreError> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| StoreError::Invalid("id generator poisoned"))?;
        ids.generate()
            .map_err(|_| StoreError::LimitExceeded("id generator exhausted for this millisecond"))
    }

    fn is_referenced(&self, id: &Ulid) -> bool {
        self.arrangements.iter().any(|entry| {
            entry
                .value()
                .iter()
                .any(|a| a.student_id == *id || a.room_id == *id)
        })
    }

    // ── Registry mutations ───────────────────────────────────

    pub async fn add_student(&self, new: NewStudent) -> Result<Student, StoreError> {
        validate_new_student(&new)?;
        let _w = self.write_lock.lock().await;
        if self.students.len() >= MAX_STUDENTS {
            return Err(StoreError::LimitExceeded("too many students"));
        }
        if self.student_index.contains_key(&new.student_id) {
            return Err(StoreError::DuplicateStudent(new.student_id));
        }
        let student = Student {
            id: self.next_id()?,
            student_id: new.student_id,
            name: new.name,
            subject_code: new.subject_code,
            email: new.email,
        };
        self.persist_and_apply(StoreEvent::StudentAdded(student.clone())).await?;
        debug!(id = %student.id, student_id = %student.student_id, "student added");
        Ok(student)
    }

    pub async fn remove_student(&self, id: Ulid) -> Result<(), StoreError> {
        let _w = self.write_lock.lock().await;
        if !self.students.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if self.is_referenced(&id) {
            return Err(StoreError::InUse(id));
        }
        self.persist_and_apply(StoreEvent::StudentRemoved { id }).await
    }

    pub async fn add_room(&self, new: NewRoom) -> Result<Room, StoreError> {
        validate_new_room(&new)?;
        let _w = self.write_lock.lock().await;
        if self.rooms.len() >= MAX_ROOMS {
            return Err(StoreError::LimitExceeded("too many rooms"));
        }
        if self.room_index.contains_key(&new.room_number) {
            return Err(StoreError::DuplicateRoom(new.room_number));
        }
        let room = Room {
            id: self.next_id()?,
            room_number: new.room_number,
            capacity: new.capacity,
            benches: new.benches,
        };
        self.persist_and_apply(StoreEvent::RoomAdded(room.clone())).await?;
        debug!(id = %room.id, room_number = %room.room_number, "room added");
        Ok(room)
    }

    pub async fn remove_room(&self, id: Ulid) -> Result<(), StoreError> {
        let _w = self.write_lock.lock().await;
        if !self.rooms.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if self.is_referenced(&id) {
            return Err(StoreError::InUse(id));
        }
        self.persist_and_apply(StoreEvent::RoomRemoved { id }).await
    }

    // ── Lookups ──────────────────────────────────────────────

    pub fn student_by_external_id(&self, student_id: &str) -> Option<Student> {
        let id = *self.student_index.get(student_id)?;
        self.students.get(&id).map(|e| e.value().clone())
    }

    pub fn room_by_number(&self, room_number: &str) -> Option<Room> {
        let id = *self.room_index.get(room_number)?;
        self.rooms.get(&id).map(|e| e.value().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty() && self.rooms.is_empty()
    }

    // ── Compaction ───────────────────────────────────────────

    /// Rewrite the WAL with only the events needed to recreate the current state.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let _w = self.write_lock.lock().await;

        let mut students: Vec<Student> = self.students.iter().map(|e| e.value().clone()).collect();
        students.sort_by_key(|s| s.id);
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by_key(|r| r.id);
        let mut dates: Vec<(ExamDate, Vec<SeatAssignment>)> = self
            .arrangements
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        dates.sort_by_key(|(d, _)| *d);

        let mut events = Vec::with_capacity(students.len() + rooms.len() + dates.len());
        events.extend(students.into_iter().map(StoreEvent::StudentAdded));
        events.extend(rooms.into_iter().map(StoreEvent::RoomAdded));
        events.extend(
            dates
                .into_iter()
                .map(|(exam_date, assignments)| StoreEvent::ArrangementReplaced { exam_date, assignments }),
        );
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))?;
        info!(events = count, "WAL compacted");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Compact once the log has grown by `threshold` appends. Returns whether it ran.
    pub async fn compact_if_needed(&self, threshold: u64) -> Result<bool, StoreError> {
        if self.wal_appends_since_compact().await < threshold {
            return Ok(false);
        }
        self.compact().await?;
        Ok(true)
    }
}

#[async_trait]
impl StudentSource for DurableStore {
    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self.students.iter().map(|e| e.value().clone()).collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }
}

#[async_trait]
impl RoomSource for DurableStore {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<Room> = self.rooms.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by_key(|r| r.id);
        Ok(rooms)
    }
}

#[async_trait]
impl AssignmentStore for DurableStore {
    async fn commit(&self, txn: Transaction) -> Result<(), StoreError> {
        let _w = self.write_lock.lock().await;
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
        let count = assignments.len();
        self.persist_and_apply(StoreEvent::ArrangementReplaced { exam_date, assignments })
            .await?;
        debug!(%exam_date, assignments = count, "arrangement committed");
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
