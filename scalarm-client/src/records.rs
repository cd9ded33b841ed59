//! Simulation manager record endpoints

use reqwest::StatusCode;
use scalarm_core::diff;
use scalarm_core::domain::record::{RecordSync, SimulationManagerRecord};
use scalarm_core::dto::record::SimulationManagersResponse;
use tracing::{debug, warn};

use crate::ExperimentManagerClient;
use crate::error::{ClientError, Result};

/// Filter sent with every record listing: skip failed records, only
/// those monitored on site
pub const RECORD_FILTER: &str = r#"{"states_not":"error","onsite_monitoring":true}"#;

impl ExperimentManagerClient {
    // =============================================================================
    // Record Listing
    // =============================================================================

    /// Fetch the simulation manager records of an infrastructure
    ///
    /// # Arguments
    /// * `infrastructure` - Infrastructure name the records belong to
    ///
    /// # Returns
    /// The records, possibly empty
    ///
    /// # Errors
    /// [`ClientError::Remote`] ("Damaged data") if the response status is not `ok`
    pub async fn fetch_records(&self, infrastructure: &str) -> Result<Vec<SimulationManagerRecord>> {
        let url = format!("{}/simulation_managers", self.service_url()?);
        debug!("Fetching records for {} from {}", infrastructure, url);

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("infrastructure", infrastructure), ("options", RECORD_FILTER)])
            .send()
            .await?;

        let payload: SimulationManagersResponse = self.decode_json(response).await?;
        if !payload.is_ok() {
            warn!(
                "Experiment manager answered with status {:?} for {}",
                payload.status, infrastructure
            );
            return Err(ClientError::remote("Damaged data"));
        }

        Ok(payload.sm_records)
    }

    // =============================================================================
    // Record Updates
    // =============================================================================

    /// Push the fields of `current` that differ from `old`
    ///
    /// Sends `PUT /simulation_managers/<current.id>` with a form body of
    /// `parameters` (the encoded diff) and `infrastructure`.
    ///
    /// # Errors
    /// [`ClientError::Remote`] ("Update failed") for any status other than 200
    pub async fn notify(
        &self,
        current: &SimulationManagerRecord,
        old: &SimulationManagerRecord,
        infrastructure: &str,
    ) -> Result<()> {
        let url = format!("{}/simulation_managers/{}", self.service_url()?, current.id);
        let parameters = diff::encode_update(current, old);
        debug!("Update {}: {}", current.id, parameters);

        let response = self
            .authorized(self.client.put(&url))
            .form(&[
                ("parameters", parameters.as_str()),
                ("infrastructure", infrastructure),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Update of {} rejected with status {}", current.id, status.as_u16());
            return Err(ClientError::remote("Update failed"));
        }

        Ok(())
    }

    /// Push pending local changes of a tracked record and mark them synced
    ///
    /// Does nothing when the record has no pending changes.
    ///
    /// # Returns
    /// Whether an update was sent
    pub async fn sync(&self, record: &mut RecordSync, infrastructure: &str) -> Result<bool> {
        if !record.is_dirty() {
            return Ok(false);
        }

        self.notify(record.current(), record.old(), infrastructure).await?;
        record.commit();
        Ok(true)
    }
}
