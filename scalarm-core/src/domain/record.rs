//! Simulation manager record domain types

use serde::{Deserialize, Deserializer, Serialize};

use crate::diff;

/// Simulation manager record
///
/// Point-in-time snapshot of one simulation job as reported by the
/// experiment manager. Every field is an opaque string owned by the service;
/// missing or `null` values decode to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationManagerRecord {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_status: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cmd_to_execute: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cmd_to_execute_code: String,

    /// Accumulated error output, appended to by the monitor
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_log: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub job_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub pid: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub vm_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub res_id: String,
}

/// Decodes JSON `null` as the type's default value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Last-synced and locally mutated snapshots of a single record
///
/// `old` is what the service last acknowledged; `current` is what local
/// logic has changed since. Only `current` may be mutated.
#[derive(Debug, Clone)]
pub struct RecordSync {
    old: SimulationManagerRecord,
    current: SimulationManagerRecord,
}

impl RecordSync {
    /// Starts tracking a record freshly fetched from the service
    pub fn new(record: SimulationManagerRecord) -> Self {
        Self {
            old: record.clone(),
            current: record,
        }
    }

    pub fn id(&self) -> &str {
        &self.current.id
    }

    /// Snapshot acknowledged by the service
    pub fn old(&self) -> &SimulationManagerRecord {
        &self.old
    }

    pub fn current(&self) -> &SimulationManagerRecord {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut SimulationManagerRecord {
        &mut self.current
    }

    /// Whether any tracked field differs between the two snapshots
    pub fn is_dirty(&self) -> bool {
        !diff::changed_fields(&self.current, &self.old).is_empty()
    }

    /// Encoded update payload for the pending local changes
    pub fn diff(&self) -> String {
        diff::encode_update(&self.current, &self.old)
    }

    /// Marks the local changes as acknowledged by the service
    pub fn commit(&mut self) {
        self.old = self.current.clone();
    }

    /// Adopts a newly fetched snapshot as authoritative, dropping local changes
    pub fn refresh(&mut self, record: SimulationManagerRecord) {
        self.old = record.clone();
        self.current = record;
    }
}
