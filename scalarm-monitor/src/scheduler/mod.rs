//! Scheduler layer for the monitor
//!
//! Drives the periodic poll of the experiment manager: fetching records,
//! downloading their code and pushing local changes back.

pub mod poller;

pub use poller::{PollSummary, RecordPoller};
