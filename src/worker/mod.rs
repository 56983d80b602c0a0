//! Worker side of the coordinator protocol.
//!
//! - [`WorkerAgent`]: registers with the coordinator, keeps its slot alive with
//!   heartbeats and pulls queued jobs
//! - [`JobHandler`]: what the agent does with each pulled job
//!
//! # Agent Loop
//!
//! 1. Register and remember the assigned slot
//! 2. Heartbeat that slot on a fixed interval; a `NOT_FOUND` answer means the
//!    slot was evicted, so the agent registers again
//! 3. Pull on a fixed interval and hand every job to the handler in order

pub mod agent;
pub mod handler;

pub use agent::WorkerAgent;
pub use handler::{JobHandler, LoggingHandler};
