use serde::Serialize;

use crate::model::{ExamDate, StudentId};

use super::assign::Plan;
use super::EngineError;

/// Terminal report of one generation run.
///
/// `success` is false only when the run could not produce or save an
/// arrangement. Students left unseated do not make a run fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub exam_date: ExamDate,
    pub success: bool,
    pub assigned_count: usize,
    pub unassigned_student_ids: Vec<StudentId>,
    pub message: String,
    #[serde(skip)]
    pub error: Option<EngineError>,
}

impl Outcome {
    pub fn completed(exam_date: ExamDate, plan: &Plan) -> Self {
        let assigned_count = plan.assignments.len();
        let unassigned = plan.unassigned.len();
        Self {
            exam_date,
            success: true,
            assigned_count,
            unassigned_student_ids: plan.unassigned.clone(),
            message: format!(
                "Successfully assigned {assigned_count} students. {unassigned} students could not be assigned."
            ),
            error: None,
        }
    }

    pub fn failed(exam_date: ExamDate, error: EngineError) -> Self {
        let message = match &error {
            EngineError::NoData { .. } => "No students or rooms available".to_string(),
            EngineError::Persistence(e) => format!("Error saving arrangements: {e}"),
            other => format!("Seating failed: {other}"),
        };
        Self {
            exam_date,
            success: false,
            assigned_count: 0,
            unassigned_student_ids: Vec::new(),
            message,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn date() -> ExamDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn partial_plan_is_success() {
        let plan = Plan {
            assignments: Vec::new(),
            unassigned: vec![Ulid::new(), Ulid::new()],
        };
        let outcome = Outcome::completed(date(), &plan);
        assert!(outcome.success);
        assert_eq!(outcome.assigned_count, 0);
        assert_eq!(outcome.unassigned_student_ids, plan.unassigned);
        assert_eq!(
            outcome.message,
            "Successfully assigned 0 students. 2 students could not be assigned."
        );
    }

    #[test]
    fn failure_messages() {
        let no_data = Outcome::failed(date(), EngineError::NoData { students: 0, rooms: 1 });
        assert!(!no_data.success);
        assert_eq!(no_data.message, "No students or rooms available");

        let wal = Outcome::failed(
            date(),
            EngineError::Persistence(StoreError::WalError("disk full".into())),
        );
        assert_eq!(wal.message, "Error saving arrangements: WAL error: disk full");
    }

    #[test]
    fn serializes_without_error_field() {
        let outcome = Outcome::failed(date(), EngineError::NoData { students: 0, rooms: 0 });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["exam_date"], "2025-06-01");
        assert_eq!(json["success"], false);
        assert!(json.get("error").is_none());
    }
}
