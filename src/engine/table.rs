use std::collections::HashMap;

use crate::limits::SEATS_PER_BENCH;
use crate::model::{Room, RoomId};

use super::EngineError;

/// Subject codes currently seated on one bench, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bench {
    occupants: Vec<String>,
}

impl Bench {
    pub fn occupancy(&self) -> u8 {
        self.occupants.len() as u8
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= SEATS_PER_BENCH
    }

    pub fn has_subject(&self, code: &str) -> bool {
        self.occupants.iter().any(|c| c == code)
    }
}

/// Per-run occupancy of every bench in every room.
///
/// Enforces the two-slot capacity itself; subject exclusion is checked by the
/// caller with [`Bench::has_subject`] before calling [`BenchTable::place`].
#[derive(Debug, Clone)]
pub struct BenchTable {
    rooms: HashMap<RoomId, Vec<Bench>>,
}

impl BenchTable {
    /// Every bench of every room, all empty.
    pub fn new(rooms: &[Room]) -> Self {
        Self {
            rooms: rooms
                .iter()
                .map(|r| (r.id, vec![Bench::default(); r.benches as usize]))
                .collect(),
        }
    }

    /// `index` is 1-based.
    pub fn bench(&self, room_id: RoomId, index: u32) -> Option<&Bench> {
        let benches = self.rooms.get(&room_id)?;
        benches.get((index as usize).checked_sub(1)?)
    }

    pub fn occupancy(&self, room_id: RoomId, index: u32) -> u8 {
        self.bench(room_id, index).map_or(0, Bench::occupancy)
    }

    pub fn has_subject(&self, room_id: RoomId, index: u32, code: &str) -> bool {
        self.bench(room_id, index).is_some_and(|b| b.has_subject(code))
    }

    /// Seat `code` on the bench and return the seat number it received.
    pub fn place(&mut self, room_id: RoomId, index: u32, code: &str) -> Result<u8, EngineError> {
        let bench = self
            .rooms
            .get_mut(&room_id)
            .and_then(|b| b.get_mut((index as usize).checked_sub(1)?))
            .ok_or(EngineError::UnknownBench { room_id, bench: index })?;
        if bench.is_full() {
            return Err(EngineError::BenchFull { room_id, bench: index });
        }
        bench.occupants.push(code.to_string());
        Ok(bench.occupancy())
    }
}
