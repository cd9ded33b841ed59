//! Information service endpoints

use tracing::{debug, info};

use crate::ExperimentManagerClient;
use crate::error::{ClientError, Result};

impl ExperimentManagerClient {
    // =============================================================================
    // Service Discovery
    // =============================================================================

    /// Resolve the experiment manager through the information service
    ///
    /// Asks `<scheme>://<directory_address>/experiment_managers` (no
    /// credentials) for the list of known managers and uses the first one.
    /// There is no failover or health checking between entries.
    ///
    /// # Arguments
    /// * `directory_address` - `host:port` of the information service
    ///
    /// # Returns
    /// The selected experiment manager address, also stored on the client
    ///
    /// # Errors
    /// - [`ClientError::Transport`] if the request fails
    /// - [`ClientError::Decode`] if the body is not a JSON array of strings
    /// - [`ClientError::NotFound`] if the array is empty
    pub async fn locate(&mut self, directory_address: &str) -> Result<String> {
        let url = format!("{}://{}/experiment_managers", self.scheme, directory_address);
        debug!("Locating experiment manager via {}", url);

        let response = self.client.get(&url).send().await?;
        let addresses: Vec<String> = self.decode_json(response).await?;

        let address = addresses.into_iter().next().ok_or_else(|| {
            ClientError::NotFound(format!(
                "no experiment manager registered at {}",
                directory_address
            ))
        })?;

        info!("Using experiment manager at {}", address);
        self.service_address = Some(address.clone());
        Ok(address)
    }
}
