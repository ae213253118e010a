pub const MAX_STUDENT_ID_LEN: usize = 20;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SUBJECT_CODE_LEN: usize = 10;
pub const MAX_EMAIL_LEN: usize = 120;
pub const MAX_ROOM_NUMBER_LEN: usize = 20;

pub const MAX_BENCHES_PER_ROOM: u32 = 500;
pub const MAX_STUDENTS: usize = 100_000;
pub const MAX_ROOMS: usize = 10_000;

/// Two slots per bench. Not configurable: the subject-exclusion rule is pairwise.
pub const SEATS_PER_BENCH: u8 = 2;
