use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use seatplan::engine::{self, Engine, EngineConfig, GroupOrder, Outcome, Strategy};
use seatplan::model::{ExamDate, NewRoom, NewStudent, SeatingRow};
use seatplan::sample;
use seatplan::store::{DurableStore, RoomSource, StoreError, StudentSource};

#[derive(Parser)]
#[command(
    name = "seatplan",
    about = "Exam seating: two per bench, never two of the same subject",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding the store's write-ahead log
    #[arg(long, env = "SEATPLAN_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// Serve Prometheus metrics on this port while the command runs
    #[arg(long, env = "SEATPLAN_METRICS_PORT")]
    metrics_port: Option<u16>,
    /// Compact the log once this many records were appended since the last compaction
    #[arg(long, env = "SEATPLAN_COMPACT_THRESHOLD", default_value_t = 1000)]
    compact_threshold: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or remove examinees
    Student {
        #[command(subcommand)]
        action: StudentAction,
    },
    /// Register or remove exam rooms
    Room {
        #[command(subcommand)]
        action: RoomAction,
    },
    /// Replace the seating arrangement for an exam date
    Generate {
        /// Exam date (YYYY-MM-DD)
        date: ExamDate,
        #[arg(long, value_enum, default_value_t = StrategyArg::Greedy)]
        strategy: StrategyArg,
        #[arg(long, value_enum, default_value_t = GroupOrderArg::Subject)]
        group_order: GroupOrderArg,
        /// Compute and print the arrangement without saving it
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the saved arrangement for an exam date
    Show {
        date: ExamDate,
        #[arg(long)]
        json: bool,
    },
    /// Delete the saved arrangement for an exam date
    Clear { date: ExamDate },
    /// List exam dates that have an arrangement
    Dates,
    /// Load the demo roster into an empty store
    Seed,
    /// Rewrite the log down to the current state
    Compact,
}

#[derive(Subcommand)]
enum StudentAction {
    Add {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: String,
    },
    Remove { student_id: String },
    List,
}

#[derive(Subcommand)]
enum RoomAction {
    Add {
        #[arg(long)]
        number: String,
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        benches: u32,
    },
    Remove { number: String },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Greedy,
    Matching,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupOrderArg {
    /// Subject codes ascending
    Subject,
    /// Order of first appearance in the roster
    Roster,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Greedy => Strategy::Greedy,
            StrategyArg::Matching => Strategy::Matching,
        }
    }
}

impl From<GroupOrderArg> for GroupOrder {
    fn from(arg: GroupOrderArg) -> Self {
        match arg {
            GroupOrderArg::Subject => GroupOrder::SubjectAscending,
            GroupOrderArg::Roster => GroupOrder::FirstAppearance,
        }
    }
}

fn print_rows(rows: &[SeatingRow], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    println!("{:<8} {:>5} {:>4}  {:<20} {:<24} {}", "ROOM", "BENCH", "SEAT", "STUDENT", "NAME", "SUBJECT");
    for r in rows {
        println!(
            "{:<8} {:>5} {:>4}  {:<20} {:<24} {}",
            r.room_number, r.bench, r.seat, r.student_id, r.name, r.subject_code
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    seatplan::observability::init(cli.metrics_port)?;

    std::fs::create_dir_all(&cli.data_dir)?;
    let wal_path = cli.data_dir.join("seatplan.wal");
    let store = Arc::new(DurableStore::open(&wal_path)?);

    match cli.command {
        Commands::Student { action } => match action {
            StudentAction::Add { student_id, name, subject, email } => {
                let s = store
                    .add_student(NewStudent { student_id, name, subject_code: subject, email })
                    .await?;
                println!("added student {} ({})", s.student_id, s.name);
            }
            StudentAction::Remove { student_id } => {
                let s = store
                    .student_by_external_id(&student_id)
                    .ok_or(StoreError::UnknownStudent(student_id))?;
                store.remove_student(s.id).await?;
                println!("removed student {}", s.student_id);
            }
            StudentAction::List => {
                for s in store.list_students().await? {
                    println!("{:<20} {:<24} {:<10} {}", s.student_id, s.name, s.subject_code, s.email);
                }
            }
        },
        Commands::Room { action } => match action {
            RoomAction::Add { number, capacity, benches } => {
                let r = store
                    .add_room(NewRoom { room_number: number, capacity, benches })
                    .await?;
                println!("added room {} ({} benches)", r.room_number, r.benches);
            }
            RoomAction::Remove { number } => {
                let r = store
                    .room_by_number(&number)
                    .ok_or(StoreError::UnknownRoom(number))?;
                store.remove_room(r.id).await?;
                println!("removed room {}", r.room_number);
            }
            RoomAction::List => {
                for r in store.list_rooms().await? {
                    println!("{:<20} capacity {:>4}  benches {:>4}", r.room_number, r.capacity, r.benches);
                }
            }
        },
        Commands::Generate { date, strategy, group_order, dry_run, json } => {
            let config = EngineConfig {
                strategy: strategy.into(),
                group_order: group_order.into(),
            };
            if dry_run {
                let students = store.list_students().await?;
                let rooms = store.list_rooms().await?;
                let plan = match engine::plan(&config, date, &students, &rooms) {
                    Ok(plan) => plan,
                    Err(e) => {
                        println!("{}", Outcome::failed(date, e.clone()).message);
                        return Err(e.into());
                    }
                };
                println!(
                    "dry run: {} students would be seated, {} left over",
                    plan.assignments.len(),
                    plan.unassigned.len()
                );
            } else {
                let engine = Engine::with_backend(store.clone(), config);
                let outcome = engine.generate(date).await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                } else {
                    println!("{}", outcome.message);
                }
                if let Some(e) = outcome.error {
                    return Err(e.into());
                }
            }
        }
        Commands::Show { date, json } => {
            let engine = Engine::with_backend(store.clone(), EngineConfig::default());
            print_rows(&engine.arrangement(date).await?, json)?;
        }
        Commands::Clear { date } => {
            let engine = Engine::with_backend(store.clone(), EngineConfig::default());
            engine.clear(date).await?;
            println!("cleared arrangement for {date}");
        }
        Commands::Dates => {
            let engine = Engine::with_backend(store.clone(), EngineConfig::default());
            for d in engine.dates().await? {
                println!("{d}");
            }
        }
        Commands::Seed => {
            if !store.is_empty() {
                return Err("store already holds students or rooms; seed needs an empty store".into());
            }
            let students = sample::students();
            let rooms = sample::rooms();
            let (n_students, n_rooms) = (students.len(), rooms.len());
            for s in students {
                store.add_student(s).await?;
            }
            for r in rooms {
                store.add_room(r).await?;
            }
            println!("created {n_students} students and {n_rooms} rooms");
        }
        Commands::Compact => {
            store.compact().await?;
            println!("log compacted");
            return Ok(());
        }
    }

    if store.compact_if_needed(cli.compact_threshold).await? {
        info!(threshold = cli.compact_threshold, "log compacted after reaching threshold");
    }
    Ok(())
}
