use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::StoreEvent;

fn encode_frame(writer: &mut impl Write, event: &StoreEvent) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())
}

/// Fill `buf` completely. `Ok(false)` means the file ended first.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Next intact record, or `None` at end of log, a torn tail or a bad checksum.
fn decode_frame(reader: &mut impl Read) -> io::Result<Option<StoreEvent>> {
    let mut word = [0u8; 4];
    if !read_full(reader, &mut word)? {
        return Ok(None);
    }
    let mut payload = vec![0u8; u32::from_le_bytes(word) as usize];
    if !read_full(reader, &mut payload)? || !read_full(reader, &mut word)? {
        return Ok(None);
    }
    if u32::from_le_bytes(word) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(bincode::deserialize(&payload).ok())
}

/// Append-only log of store events.
///
/// Each record is `[u32 len][bincode StoreEvent][u32 crc32]`, little endian.
/// A whole arrangement for one date travels in a single record, so a torn
/// write loses the replacement entirely instead of half of it.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(Self::open_for_append(path)?),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    fn open_for_append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Buffer one record. Nothing is durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &StoreEvent) -> io::Result<()> {
        encode_frame(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Replace the log with `snapshot`. The new log is written and synced
    /// beside the old one, then renamed over it.
    pub fn rewrite(&mut self, snapshot: &[StoreEvent]) -> io::Result<()> {
        let staging = self.path.with_extension("wal.tmp");
        {
            let mut out = BufWriter::new(File::create(&staging)?);
            for event in snapshot {
                encode_frame(&mut out, event)?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        self.writer = BufWriter::new(Self::open_for_append(&self.path)?);
        self.appends_since_compact = 0;
        Ok(())
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Every intact record in the log, in append order. Reading stops at the
    /// first torn or corrupt record. A missing file is an empty log.
    pub fn replay(path: &Path) -> io::Result<Vec<StoreEvent>> {
        let mut reader = match File::open(path) {
            Ok(f) => BufReader::new(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut events = Vec::new();
        while let Some(event) = decode_frame(&mut reader)? {
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Room, SeatAssignment, Student};
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("seatplan_test_wal");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn student(external: &str) -> Student {
        Student {
            id: Ulid::new(),
            student_id: external.into(),
            name: format!("Student {external}"),
            subject_code: "CS101".into(),
            email: format!("{external}@example.edu"),
        }
    }

    fn room(number: &str) -> Room {
        Room {
            id: Ulid::new(),
            room_number: number.into(),
            capacity: 20,
            benches: 10,
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let _ = fs::remove_file(&path);

        let s = student("CS001");
        let r = room("A101");
        let events = vec![
            StoreEvent::StudentAdded(s.clone()),
            StoreEvent::RoomAdded(r.clone()),
            StoreEvent::ArrangementReplaced {
                exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                assignments: vec![SeatAssignment {
                    student_id: s.id,
                    room_id: r.id,
                    bench: 1,
                    seat: 1,
                    exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                }],
            },
        ];

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append_buffered(e).unwrap();
            }
            wal.flush_sync().unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, events);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.wal");
        let _ = fs::remove_file(&path);

        let event = StoreEvent::RoomAdded(room("B201"));
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append_buffered(&event).unwrap();
            wal.flush_sync().unwrap();
        }

        // Simulate a crash mid-way through the second entry
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, vec![event]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let _ = fs::remove_file(&path);
        assert!(Wal::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn unflushed_records_are_not_replayed_until_synced() {
        let path = tmp_path("unflushed.wal");
        let _ = fs::remove_file(&path);

        let event = StoreEvent::RoomAdded(room("D401"));
        let mut wal = Wal::open(&path).unwrap();
        wal.append_buffered(&event).unwrap();
        assert!(Wal::replay(&path).unwrap().is_empty());
        wal.flush_sync().unwrap();
        assert_eq!(Wal::replay(&path).unwrap(), vec![event]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_corrupt_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let _ = fs::remove_file(&path);

        let event = StoreEvent::StudentRemoved { id: Ulid::new() };
        {
            let payload = bincode::serialize(&event).unwrap();
            let len = payload.len() as u32;
            let bad_crc: u32 = 0xDEADBEEF;

            let mut f = File::create(&path).unwrap();
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&bad_crc.to_le_bytes()).unwrap();
        }

        assert!(Wal::replay(&path).unwrap().is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rewrite_then_append() {
        let path = tmp_path("compact_append.wal");
        let _ = fs::remove_file(&path);

        let r = room("C301");
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let compacted = vec![StoreEvent::RoomAdded(r.clone())];
        let churn = StoreEvent::ArrangementReplaced { exam_date: date, assignments: vec![] };
        let new_event = StoreEvent::RoomRemoved { id: r.id };

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append_buffered(&compacted[0]).unwrap();
            for _ in 0..10 {
                wal.append_buffered(&churn).unwrap();
            }
            wal.flush_sync().unwrap();
            assert_eq!(wal.appends_since_compact(), 11);
            let before = fs::metadata(&path).unwrap().len();
            wal.rewrite(&compacted).unwrap();
            let after = fs::metadata(&path).unwrap().len();
            assert!(after < before, "rewritten log should be smaller: {after} < {before}");
            assert_eq!(wal.appends_since_compact(), 0);
            assert!(!path.with_extension("wal.tmp").exists());
            wal.append_buffered(&new_event).unwrap();
            wal.flush_sync().unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, vec![compacted[0].clone(), new_event]);

        let _ = fs::remove_file(&path);
    }
}
