use ulid::Ulid;

use crate::model::ExamDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(Ulid),
    UnknownStudent(String),
    UnknownRoom(String),
    DuplicateStudent(String),
    DuplicateRoom(String),
    InUse(Ulid),
    Invalid(&'static str),
    LimitExceeded(&'static str),
    DateMismatch {
        expected: ExamDate,
        found: ExamDate,
    },
    WalError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::UnknownStudent(sid) => write!(f, "no student with id {sid}"),
            StoreError::UnknownRoom(number) => write!(f, "no room numbered {number}"),
            StoreError::DuplicateStudent(sid) => write!(f, "student id already registered: {sid}"),
            StoreError::DuplicateRoom(number) => write!(f, "room number already registered: {number}"),
            StoreError::InUse(id) => {
                write!(f, "cannot delete {id}: referenced by a seating arrangement")
            }
            StoreError::Invalid(msg) => write!(f, "invalid: {msg}"),
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            StoreError::DateMismatch { expected, found } => {
                write!(f, "assignment dated {found} in a transaction for {expected}")
            }
            StoreError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
