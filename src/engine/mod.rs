mod assign;
mod error;
mod grouping;
mod matching;
mod report;
mod table;

pub use assign::{assign_greedy, Plan};
pub use error::EngineError;
pub use grouping::{group_by_subject, GroupOrder, SubjectGroup};
pub use matching::assign_matching;
pub use report::Outcome;
pub use table::{Bench, BenchTable};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::model::*;
use crate::observability;
use crate::store::{AssignmentStore, RoomSource, StudentSource, Transaction};

/// How benches are chosen for students.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// First fit, no backtracking. Reference behavior.
    #[default]
    Greedy,
    /// Max-flow over subjects and benches; seats as many students as possible.
    Matching,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Greedy => "greedy",
            Strategy::Matching => "matching",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub strategy: Strategy,
    pub group_order: GroupOrder,
}

/// Group the roster and place every student, entirely in memory.
/// An empty roster or an empty room list is rejected with `NoData`.
pub fn plan(
    config: &EngineConfig,
    exam_date: ExamDate,
    students: &[Student],
    rooms: &[Room],
) -> Result<Plan, EngineError> {
    if students.is_empty() || rooms.is_empty() {
        return Err(EngineError::NoData {
            students: students.len(),
            rooms: rooms.len(),
        });
    }
    let groups = group_by_subject(students, config.group_order);
    let mut table = BenchTable::new(rooms);
    match config.strategy {
        Strategy::Greedy => assign_greedy(exam_date, &groups, rooms, &mut table),
        Strategy::Matching => assign_matching(exam_date, &groups, rooms, &mut table),
    }
}

/// Regenerates seating arrangements, one exam date at a time.
///
/// A run reads the whole roster, computes a new arrangement in memory and
/// replaces the date's persisted arrangement in a single transaction. Runs
/// for the same date are serialized; runs for different dates are not.
pub struct Engine {
    students: Arc<dyn StudentSource>,
    rooms: Arc<dyn RoomSource>,
    store: Arc<dyn AssignmentStore>,
    config: EngineConfig,
    /// One lock per exam date with a run in progress.
    date_locks: DashMap<ExamDate, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(
        students: Arc<dyn StudentSource>,
        rooms: Arc<dyn RoomSource>,
        store: Arc<dyn AssignmentStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            students,
            rooms,
            store,
            config,
            date_locks: DashMap::new(),
        }
    }

    /// Engine over a single backend that serves the roster and stores arrangements.
    pub fn with_backend<B>(backend: Arc<B>, config: EngineConfig) -> Self
    where
        B: StudentSource + RoomSource + AssignmentStore + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend, config)
    }

    fn date_lock(&self, exam_date: ExamDate) -> Arc<Mutex<()>> {
        self.date_locks.entry(exam_date).or_default().value().clone()
    }

    /// Drop the date's lock entry once no other run holds or awaits it.
    /// The count is read under the shard lock that `date_lock` also takes.
    fn release_date_lock(&self, exam_date: ExamDate, lock: Arc<Mutex<()>>) {
        self.date_locks
            .remove_if(&exam_date, |_, held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2);
    }

    /// Replace the arrangement for `exam_date`. Never returns an error:
    /// failures are reported in the outcome.
    pub async fn generate(&self, exam_date: ExamDate) -> Outcome {
        let lock = self.date_lock(exam_date);
        let started = Instant::now();
        let result = {
            let _guard = lock.lock().await;
            self.regenerate(exam_date).await
        };
        self.release_date_lock(exam_date, lock);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%exam_date, error = %e, "seating generation failed");
                Outcome::failed(exam_date, e)
            }
        };

        let status = if outcome.success { "ok" } else { "error" };
        metrics::counter!(observability::GENERATIONS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(observability::GENERATION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        outcome
    }

    async fn regenerate(&self, exam_date: ExamDate) -> Result<Outcome, EngineError> {
        let students = self.students.list_students().await?;
        let rooms = self.rooms.list_rooms().await?;
        let plan = plan(&self.config, exam_date, &students, &rooms)?;

        info!(
            %exam_date,
            students = students.len(),
            rooms = rooms.len(),
            strategy = self.config.strategy.label(),
            "seating arrangement planned"
        );

        let mut txn = Transaction::new(exam_date);
        txn.delete_all_for_date();
        txn.bulk_insert(plan.assignments.clone())?;
        self.store.commit(txn).await?;

        metrics::counter!(observability::STUDENTS_ASSIGNED_TOTAL)
            .increment(plan.assignments.len() as u64);
        metrics::counter!(observability::STUDENTS_UNASSIGNED_TOTAL)
            .increment(plan.unassigned.len() as u64);
        if !plan.unassigned.is_empty() {
            warn!(%exam_date, unassigned = plan.unassigned.len(), "some students could not be seated");
        }
        info!(%exam_date, assigned = plan.assignments.len(), "seating arrangement saved");
        Ok(Outcome::completed(exam_date, &plan))
    }

    /// Delete the arrangement for `exam_date`.
    pub async fn clear(&self, exam_date: ExamDate) -> Result<(), EngineError> {
        let lock = self.date_lock(exam_date);
        let result = {
            let _guard = lock.lock().await;
            let mut txn = Transaction::new(exam_date);
            txn.delete_all_for_date();
            self.store.commit(txn).await
        };
        self.release_date_lock(exam_date, lock);
        result?;
        info!(%exam_date, "seating arrangement cleared");
        Ok(())
    }

    /// The persisted arrangement for `exam_date`, joined with student and room
    /// details, ordered by room, bench and seat.
    pub async fn arrangement(&self, exam_date: ExamDate) -> Result<Vec<SeatingRow>, EngineError> {
        let assignments = self.store.list_for_date(exam_date).await?;
        let students: HashMap<StudentId, Student> = self
            .students
            .list_students()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let rooms: HashMap<RoomId, Room> = self
            .rooms
            .list_rooms()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        let mut ordered: Vec<&SeatAssignment> = assignments.iter().collect();
        ordered.sort_by_key(|a| (a.room_id, a.bench, a.seat));

        Ok(ordered
            .into_iter()
            .filter_map(|a| {
                let s = students.get(&a.student_id)?;
                let r = rooms.get(&a.room_id)?;
                Some(SeatingRow {
                    exam_date: a.exam_date,
                    room_number: r.room_number.clone(),
                    bench: a.bench,
                    seat: a.seat,
                    student_id: s.student_id.clone(),
                    name: s.name.clone(),
                    subject_code: s.subject_code.clone(),
                })
            })
            .collect())
    }

    pub async fn dates(&self) -> Result<Vec<ExamDate>, EngineError> {
        Ok(self.store.dates().await?)
    }
}
