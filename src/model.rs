use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar date of an exam sitting. The scoping key for one arrangement.
pub type ExamDate = chrono::NaiveDate;

pub type StudentId = Ulid;
pub type RoomId = Ulid;

/// An examinee. `id` is internal; `student_id` is the externally issued identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_id: String,
    pub name: String,
    pub subject_code: String,
    pub email: String,
}

/// An exam room. `benches` is authoritative for seating; `capacity` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    pub capacity: u32,
    pub benches: u32,
}

/// One placed student. `bench` is 1-based within the room, `seat` is 1 or 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub student_id: StudentId,
    pub room_id: RoomId,
    pub bench: u32,
    pub seat: u8,
    pub exam_date: ExamDate,
}

/// Registration input for a student; the store mints the internal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub subject_code: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub room_number: String,
    pub capacity: u32,
    pub benches: u32,
}

/// Flat event records. This is the WAL record format.
///
/// A date's full assignment set is carried by a single `ArrangementReplaced`
/// record, so replacing an arrangement is atomic on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    StudentAdded(Student),
    StudentRemoved {
        id: StudentId,
    },
    RoomAdded(Room),
    RoomRemoved {
        id: RoomId,
    },
    ArrangementReplaced {
        exam_date: ExamDate,
        assignments: Vec<SeatAssignment>,
    },
}

// ── Query result types ───────────────────────────────────────────

/// Joined view of one assignment, as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatingRow {
    pub exam_date: ExamDate,
    pub room_number: String,
    pub bench: u32,
    pub seat: u8,
    pub student_id: String,
    pub name: String,
    pub subject_code: String,
}
