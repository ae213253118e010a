use crate::limits::SEATS_PER_BENCH;
use crate::model::*;

use super::grouping::SubjectGroup;
use super::table::BenchTable;
use super::EngineError;

/// Proposed arrangement for one date, not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub assignments: Vec<SeatAssignment>,
    /// Students no bench could take, in processing order.
    pub unassigned: Vec<StudentId>,
}

/// Rooms in traversal order: ascending internal id.
pub(super) fn traversal_order(rooms: &[Room]) -> Vec<&Room> {
    let mut ordered: Vec<&Room> = rooms.iter().collect();
    ordered.sort_by_key(|r| r.id);
    ordered
}

/// First-fit placement with no backtracking.
///
/// Each student takes the first bench (rooms ascending, benches ascending)
/// that has a free slot and no occupant of the same subject. A student who
/// fits nowhere is recorded and skipped.
pub fn assign_greedy(
    exam_date: ExamDate,
    groups: &[SubjectGroup<'_>],
    rooms: &[Room],
    table: &mut BenchTable,
) -> Result<Plan, EngineError> {
    let rooms = traversal_order(rooms);
    let mut plan = Plan::default();

    for group in groups {
        for student in &group.students {
            let code = student.subject_code.as_str();
            let slot = rooms.iter().find_map(|room| {
                (1..=room.benches)
                    .find(|&b| table.occupancy(room.id, b) < SEATS_PER_BENCH
                        && !table.has_subject(room.id, b, code))
                    .map(|b| (room.id, b))
            });

            match slot {
                Some((room_id, bench)) => {
                    let seat = table.place(room_id, bench, code)?;
                    plan.assignments.push(SeatAssignment {
                        student_id: student.id,
                        room_id,
                        bench,
                        seat,
                        exam_date,
                    });
                }
                None => plan.unassigned.push(student.id),
            }
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grouping::{group_by_subject, GroupOrder};
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn date() -> ExamDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn student(n: u64, subject: &str) -> Student {
        Student {
            id: Ulid::from_parts(n, 0),
            student_id: format!("S{n}"),
            name: format!("Student {n}"),
            subject_code: subject.into(),
            email: format!("s{n}@example.edu"),
        }
    }

    fn room(n: u64, benches: u32) -> Room {
        Room {
            id: Ulid::from_parts(1000 + n, 0),
            room_number: format!("R{n}"),
            capacity: benches * 2,
            benches,
        }
    }

    fn run(roster: &[Student], rooms: &[Room]) -> Plan {
        let groups = group_by_subject(roster, GroupOrder::SubjectAscending);
        let mut table = BenchTable::new(rooms);
        assign_greedy(date(), &groups, rooms, &mut table).unwrap()
    }

    #[test]
    fn rooms_walked_by_id_not_input_order() {
        let r1 = room(1, 1);
        let r2 = room(2, 1);
        let roster = vec![student(1, "CS101")];
        let plan = run(&roster, &[r2.clone(), r1.clone()]);
        assert_eq!(plan.assignments[0].room_id, r1.id);
    }

    #[test]
    fn mixed_subjects_fill_second_seats() {
        let r = room(1, 1);
        let roster = vec![student(1, "CS101"), student(2, "MATH201"), student(3, "PHY301")];
        let plan = run(&roster, std::slice::from_ref(&r));
        let placed: Vec<(u32, u8)> = plan.assignments.iter().map(|a| (a.bench, a.seat)).collect();
        assert_eq!(placed, vec![(1, 1), (1, 2)]);
        assert_eq!(plan.unassigned, vec![Ulid::from_parts(3, 0)]);
    }

    #[test]
    fn greedy_misses_a_feasible_arrangement() {
        // One bench each for {A, C} and {B, C} would seat everyone; first-fit
        // pairs A with B and strands the second C student.
        let r = room(1, 2);
        let roster = vec![student(1, "A"), student(2, "B"), student(3, "C"), student(4, "C")];
        let plan = run(&roster, std::slice::from_ref(&r));
        assert_eq!(plan.assignments.len(), 3);
        assert_eq!(plan.unassigned, vec![Ulid::from_parts(4, 0)]);
    }

    #[test]
    fn no_rooms_leaves_everyone_unassigned() {
        let roster = vec![student(1, "CS101"), student(2, "CS101")];
        let plan = run(&roster, &[]);
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.unassigned.len(), 2);
    }
}
