//! Background ingestion worker
//!
//! The scheduler in [`worker`] owns the lifecycle: an initial catch-up pass
//! over the full catalog, a queue-draining loop, and a stale-refresh loop
//! that sleeps on the configured cadence until cancelled.

pub mod fetch;
pub mod queue;
pub mod worker;

pub use fetch::FetchOutcome;
pub use worker::IngestScheduler;
