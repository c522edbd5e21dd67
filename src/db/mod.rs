//! Persistence layer

pub mod sqlite;
pub mod write_queue;

pub use write_queue::{WriteOp, WriteQueue};
