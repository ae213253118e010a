pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod sample;
pub mod store;
pub mod wal;
