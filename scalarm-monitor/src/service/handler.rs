//! Record handler
//!
//! The hook through which monitoring logic inspects and mutates the local
//! snapshot of a record between fetching it and pushing changes back.

use anyhow::Result;
use scalarm_client::SimulationManagerRecord;
use tracing::info;

/// Service trait for per-record monitoring logic
pub trait RecordHandler: Send + Sync {
    /// Called once per record on every poll pass
    ///
    /// Changes made to `record` are diffed against the last synced snapshot
    /// and pushed to the experiment manager after the call returns.
    ///
    /// # Arguments
    /// * `infrastructure` - Infrastructure the record was fetched for
    /// * `record` - Local snapshot, freely mutable
    fn handle(&self, infrastructure: &str, record: &mut SimulationManagerRecord) -> Result<()>;
}

/// Handler that only reports what it sees
pub struct LoggingHandler;

impl RecordHandler for LoggingHandler {
    fn handle(&self, infrastructure: &str, record: &mut SimulationManagerRecord) -> Result<()> {
        info!(
            "[{}] record {}: state={}, resource_status={}",
            infrastructure, record.id, record.state, record.resource_status
        );
        Ok(())
    }
}
