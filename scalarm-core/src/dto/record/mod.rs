//! Record DTOs

use serde::{Deserialize, Serialize};

use crate::domain::record::{SimulationManagerRecord, null_as_default};

/// Status value the experiment manager reports for a healthy response
pub const STATUS_OK: &str = "ok";

/// Response to `GET /simulation_managers`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationManagersResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sm_records: Vec<SimulationManagerRecord>,
}

impl SimulationManagersResponse {
    /// Whether the service marked the payload as usable
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}
