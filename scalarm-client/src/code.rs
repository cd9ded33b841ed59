//! Simulation manager code endpoints

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::ExperimentManagerClient;
use crate::error::Result;

impl ExperimentManagerClient {
    /// Local file name of the code archive for a record
    pub fn sources_path(&self, record_id: &str) -> PathBuf {
        self.sources_dir.join(format!("sources_{}.zip", record_id))
    }

    /// Download the code archive of a simulation manager record
    ///
    /// The body is written verbatim to `sources_<record_id>.zip` in the
    /// sources directory, readable and writable by the owner only. The HTTP
    /// status is not inspected, so an error page is stored just like an
    /// archive would be.
    ///
    /// # Arguments
    /// * `record_id` - Id of the simulation manager record
    /// * `infrastructure` - Infrastructure the record belongs to
    ///
    /// # Returns
    /// Path of the written archive
    pub async fn fetch_code(&self, record_id: &str, infrastructure: &str) -> Result<PathBuf> {
        let url = format!("{}/simulation_managers/{}/code", self.service_url()?, record_id);
        debug!("Downloading code for {} from {}", record_id, url);

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("infrastructure", infrastructure)])
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let path = self.sources_path(record_id);
        write_private(&path, &body).await?;

        info!(
            "Saved {} bytes of code for {} to {} (status {})",
            body.len(),
            record_id,
            path.display(),
            status.as_u16()
        );
        Ok(path)
    }
}

/// Create or truncate `path` with mode 0600 and write `contents`
async fn write_private(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.flush().await?;

    // The mode above only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    Ok(())
}
