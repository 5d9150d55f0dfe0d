//! Offline action queue
//!
//! Mutations that failed to reach the network wait here, durably, until a
//! reconnect signal drains them. FIFO within a category; no ordering across
//! categories.

pub mod replay;
pub mod storage;

pub use replay::{DrainReport, drain};
pub use storage::{NewQueueItem, QueueItem, QueueStorage};
