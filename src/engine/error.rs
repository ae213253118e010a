use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The roster or the room list was empty when the run started.
    NoData {
        students: usize,
        rooms: usize,
    },
    BenchFull {
        room_id: Ulid,
        bench: u32,
    },
    UnknownBench {
        room_id: Ulid,
        bench: u32,
    },
    Persistence(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NoData { students, rooms } => {
                write!(f, "no students or rooms available ({students} students, {rooms} rooms)")
            }
            EngineError::BenchFull { room_id, bench } => {
                write!(f, "bench {bench} in room {room_id} is full")
            }
            EngineError::UnknownBench { room_id, bench } => {
                write!(f, "room {room_id} has no bench {bench}")
            }
            EngineError::Persistence(e) => write!(f, "persistence error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Persistence(e)
    }
}
