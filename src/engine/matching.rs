//! Maximum-cardinality seating via max-flow.
//!
//! Network: source → subject (capacity = group size), subject → bench
//! (capacity 1, one seat per subject per bench), bench → sink (capacity 2).
//! The max flow is the largest number of students any arrangement can seat
//! under both bench constraints. Augmenting paths are found by BFS over
//! edges in insertion order, so the result is deterministic.

use std::collections::VecDeque;

use crate::limits::SEATS_PER_BENCH;
use crate::model::*;

use super::assign::{traversal_order, Plan};
use super::grouping::SubjectGroup;
use super::table::BenchTable;
use super::EngineError;

#[derive(Clone, Copy)]
struct Edge {
    to: usize,
    cap: u32,
}

struct FlowNetwork {
    edges: Vec<Edge>,
    adj: Vec<Vec<usize>>,
}

impl FlowNetwork {
    fn new(nodes: usize) -> Self {
        Self {
            edges: Vec::new(),
            adj: vec![Vec::new(); nodes],
        }
    }

    /// Returns the index of the forward edge; its residual twin is `index ^ 1`.
    fn add_edge(&mut self, from: usize, to: usize, cap: u32) -> usize {
        let idx = self.edges.len();
        self.edges.push(Edge { to, cap });
        self.adj[from].push(idx);
        self.edges.push(Edge { to: from, cap: 0 });
        self.adj[to].push(idx + 1);
        idx
    }

    /// Edmonds-Karp. Every path carries one unit since subject→bench edges have capacity 1.
    fn max_flow(&mut self, source: usize, sink: usize) -> u32 {
        let mut total = 0;
        loop {
            let mut via: Vec<Option<usize>> = vec![None; self.adj.len()];
            let mut queue = VecDeque::from([source]);
            let mut reached = false;
            while let Some(node) = queue.pop_front() {
                for &e in &self.adj[node] {
                    let Edge { to, cap } = self.edges[e];
                    if cap == 0 || to == source || via[to].is_some() {
                        continue;
                    }
                    via[to] = Some(e);
                    if to == sink {
                        reached = true;
                        break;
                    }
                    queue.push_back(to);
                }
                if reached {
                    break;
                }
            }
            if !reached {
                return total;
            }

            let mut bottleneck = u32::MAX;
            let mut node = sink;
            while let Some(e) = via[node] {
                bottleneck = bottleneck.min(self.edges[e].cap);
                node = self.edges[e ^ 1].to;
            }
            let mut node = sink;
            while let Some(e) = via[node] {
                self.edges[e].cap -= bottleneck;
                self.edges[e ^ 1].cap += bottleneck;
                node = self.edges[e ^ 1].to;
            }
            total += bottleneck;
        }
    }
}

/// Seat the largest possible number of students.
///
/// Benches are chosen by max-flow; students are then placed in group order,
/// each taking the next bench reserved for its subject, so seat numbers still
/// follow placement order. Students beyond their subject's reserved benches
/// are reported unassigned.
pub fn assign_matching(
    exam_date: ExamDate,
    groups: &[SubjectGroup<'_>],
    rooms: &[Room],
    table: &mut BenchTable,
) -> Result<Plan, EngineError> {
    let benches: Vec<(RoomId, u32)> = traversal_order(rooms)
        .into_iter()
        .flat_map(|r| (1..=r.benches).map(move |b| (r.id, b)))
        .collect();

    let source = 0;
    let sink = 1;
    let group_node = |g: usize| 2 + g;
    let bench_node = |b: usize| 2 + groups.len() + b;

    let mut net = FlowNetwork::new(2 + groups.len() + benches.len());
    let mut subject_edges: Vec<Vec<usize>> = Vec::with_capacity(groups.len());
    for (g, group) in groups.iter().enumerate() {
        net.add_edge(source, group_node(g), group.students.len() as u32);
        subject_edges.push(
            (0..benches.len())
                .map(|b| net.add_edge(group_node(g), bench_node(b), 1))
                .collect(),
        );
    }
    for b in 0..benches.len() {
        net.add_edge(bench_node(b), sink, SEATS_PER_BENCH as u32);
    }
    net.max_flow(source, sink);

    let reserved: Vec<Vec<(RoomId, u32)>> = subject_edges
        .iter()
        .map(|edges| {
            edges
                .iter()
                .enumerate()
                .filter(|&(_, &e)| net.edges[e].cap == 0)
                .map(|(b, _)| benches[b])
                .collect()
        })
        .collect();

    let mut plan = Plan::default();
    for (group, slots) in groups.iter().zip(&reserved) {
        for (k, student) in group.students.iter().enumerate() {
            match slots.get(k) {
                Some(&(room_id, bench)) => {
                    let seat = table.place(room_id, bench, &student.subject_code)?;
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
    use std::collections::{HashMap, HashSet};
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
        assign_matching(date(), &groups, rooms, &mut table).unwrap()
    }

    fn assert_bench_rules(plan: &Plan, roster: &[Student]) {
        let subject: HashMap<Ulid, &str> =
            roster.iter().map(|s| (s.id, s.subject_code.as_str())).collect();
        let mut benches: HashMap<(Ulid, u32), Vec<&SeatAssignment>> = HashMap::new();
        for a in &plan.assignments {
            benches.entry((a.room_id, a.bench)).or_default().push(a);
        }
        for seated in benches.values() {
            assert!(seated.len() <= 2);
            let seats: Vec<u8> = seated.iter().map(|a| a.seat).collect();
            assert_eq!(seats, (1..=seated.len() as u8).collect::<Vec<_>>());
            let codes: HashSet<&str> = seated.iter().map(|a| subject[&a.student_id]).collect();
            assert_eq!(codes.len(), seated.len());
        }
    }

    #[test]
    fn seats_everyone_where_greedy_cannot() {
        let r = room(1, 2);
        let roster = vec![student(1, "A"), student(2, "B"), student(3, "C"), student(4, "C")];
        let plan = run(&roster, std::slice::from_ref(&r));
        assert_eq!(plan.assignments.len(), 4);
        assert!(plan.unassigned.is_empty());
        assert_bench_rules(&plan, &roster);
    }

    #[test]
    fn single_subject_limited_to_one_per_bench() {
        let r = room(1, 2);
        let roster: Vec<Student> = (1..=5).map(|n| student(n, "CS101")).collect();
        let plan = run(&roster, std::slice::from_ref(&r));
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(
            plan.unassigned,
            vec![Ulid::from_parts(3, 0), Ulid::from_parts(4, 0), Ulid::from_parts(5, 0)]
        );
    }

    #[test]
    fn deterministic_across_runs() {
        let rooms = vec![room(1, 3), room(2, 2)];
        let roster: Vec<Student> = (1..=9)
            .map(|n| student(n, ["A", "B", "C"][(n % 3) as usize]))
            .collect();
        assert_eq!(run(&roster, &rooms), run(&roster, &rooms));
    }

    #[test]
    fn never_worse_than_greedy() {
        use crate::engine::assign::assign_greedy;

        let rooms = vec![room(1, 4), room(2, 3)];
        let subjects = ["A", "A", "A", "B", "C", "C", "D", "A", "B", "E", "A", "A", "C", "A"];
        let roster: Vec<Student> = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| student(i as u64 + 1, s))
            .collect();

        let groups = group_by_subject(&roster, GroupOrder::SubjectAscending);
        let greedy = assign_greedy(date(), &groups, &rooms, &mut BenchTable::new(&rooms)).unwrap();
        let matched = run(&roster, &rooms);

        assert!(matched.assignments.len() >= greedy.assignments.len());
        assert_eq!(matched.assignments.len() + matched.unassigned.len(), roster.len());
        assert_bench_rules(&matched, &roster);
    }
}
