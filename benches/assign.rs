use std::time::{Duration, Instant};

use chrono::NaiveDate;
use ulid::Ulid;

use seatplan::engine::{plan, EngineConfig, GroupOrder, Strategy};
use seatplan::model::{Room, Student};

const ITERATIONS: usize = 20;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        latencies.last().map_or(0.0, |d| d.as_secs_f64() * 1000.0),
    );
}

/// Skewed subject mix: a few large exams and a long tail of small ones.
fn roster(students: u64, subjects: u64) -> Vec<Student> {
    (0..students)
        .map(|i| {
            let subject = (i * i + 7 * i) % subjects;
            Student {
                id: Ulid::from_parts(i + 1, 0),
                student_id: format!("S{i:05}"),
                name: format!("Student {i}"),
                subject_code: format!("SUB{subject:03}"),
                email: format!("s{i}@example.edu"),
            }
        })
        .collect()
}

fn rooms(count: u64, benches: u32) -> Vec<Room> {
    (0..count)
        .map(|i| Room {
            id: Ulid::from_parts(1_000_000 + i, 0),
            room_number: format!("R{i:03}"),
            capacity: benches * 2,
            benches,
        })
        .collect()
}

fn run(label: &str, config: EngineConfig, students: &[Student], rooms: &[Room]) {
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default();
    let mut latencies = Vec::with_capacity(ITERATIONS);
    let mut seated = 0;
    for _ in 0..ITERATIONS {
        let start = Instant::now();
        let result = plan(&config, date, students, rooms).expect("plan failed");
        latencies.push(start.elapsed());
        seated = result.assignments.len();
    }
    print_latency(&format!("{label} ({seated}/{} seated)", students.len()), &mut latencies);
}

fn main() {
    for (n_students, n_subjects, n_rooms, benches) in [(500, 12, 20, 15), (2_000, 40, 40, 30)] {
        let students = roster(n_students, n_subjects);
        let rooms = rooms(n_rooms, benches);
        println!("{n_students} students, {n_subjects} subjects, {n_rooms} rooms x {benches} benches");

        run(
            "greedy",
            EngineConfig { strategy: Strategy::Greedy, group_order: GroupOrder::SubjectAscending },
            &students,
            &rooms,
        );
        run(
            "matching",
            EngineConfig { strategy: Strategy::Matching, group_order: GroupOrder::SubjectAscending },
            &students,
            &rooms,
        );
    }
}
