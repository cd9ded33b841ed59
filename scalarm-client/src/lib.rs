//! Scalarm HTTP Client
//!
//! A small client for the Scalarm information service and experiment manager.
//!
//! The information service is queried once to find an experiment manager;
//! after that every call goes to that manager, authenticated with HTTP Basic
//! credentials. All calls are plain request/response and are meant to be
//! awaited one after another.
//!
//! # Example
//!
//! ```no_run
//! use scalarm_client::{Credentials, ExperimentManagerClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = ExperimentManagerClient::new(
//!         Credentials::new("monitor", "secret"),
//!         "https",
//!     )?;
//!     client.locate("scalarm.example.org:11300").await?;
//!
//!     for record in client.fetch_records("private_machine").await? {
//!         println!("{} is {}", record.id, record.state);
//!     }
//!     Ok(())
//! }
//! ```

mod code;
mod directory;
pub mod error;
mod records;
pub mod tls;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use scalarm_core::domain::record::{RecordSync, SimulationManagerRecord};

use std::path::{Path, PathBuf};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Scheme used when none is configured
pub const DEFAULT_SCHEME: &str = "https";

/// HTTP Basic credentials for the experiment manager
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP client for the experiment manager API
///
/// Methods are grouped by endpoint family:
/// - Service discovery through the information service
/// - Simulation manager records (list, update)
/// - Simulation manager code archives
#[derive(Debug, Clone)]
pub struct ExperimentManagerClient {
    /// URL scheme for every request ("http" or "https")
    scheme: String,
    credentials: Credentials,
    /// Resolved experiment manager address (host:port)
    service_address: Option<String>,
    /// Directory downloaded code archives are written to
    sources_dir: PathBuf,
    /// HTTP client instance
    client: Client,
}

impl ExperimentManagerClient {
    /// Create a new client with a default HTTP client
    ///
    /// An empty scheme falls back to [`DEFAULT_SCHEME`]. The HTTP client
    /// comes from [`tls::client_builder`] and does not follow redirects.
    ///
    /// # Example
    /// ```
    /// use scalarm_client::{Credentials, ExperimentManagerClient};
    ///
    /// let client = ExperimentManagerClient::new(Credentials::new("user", "pass"), "https")?;
    /// assert_eq!(client.scheme(), "https");
    /// # Ok::<(), scalarm_client::ClientError>(())
    /// ```
    pub fn new(credentials: Credentials, scheme: impl Into<String>) -> Result<Self> {
        let client = tls::client_builder().build()?;
        Ok(Self::with_client(credentials, scheme, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// Use [`tls::build_http_client`] to get one that trusts a custom CA.
    /// A client that follows redirects would turn a redirected update into
    /// a reported success.
    pub fn with_client(credentials: Credentials, scheme: impl Into<String>, client: Client) -> Self {
        let scheme = scheme.into();
        Self {
            scheme: if scheme.is_empty() {
                DEFAULT_SCHEME.to_string()
            } else {
                scheme
            },
            credentials,
            service_address: None,
            sources_dir: PathBuf::from("."),
            client,
        }
    }

    /// Use a known experiment manager address instead of asking the directory
    pub fn with_service_address(mut self, address: impl Into<String>) -> Self {
        self.service_address = Some(address.into());
        self
    }

    /// Write downloaded code archives into `dir` instead of the working directory
    pub fn with_sources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sources_dir = dir.into();
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Resolved experiment manager address, if any
    pub fn service_address(&self) -> Option<&str> {
        self.service_address.as_deref()
    }

    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    /// Base URL of the resolved experiment manager
    fn service_url(&self) -> Result<String> {
        let address = self
            .service_address
            .as_deref()
            .ok_or(ClientError::NotLocated)?;
        Ok(format!("{}://{}", self.scheme, address))
    }

    /// Attach Basic credentials to a request
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.credentials.login, Some(&self.credentials.password))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Read the whole body and decode it as JSON
    ///
    /// The HTTP status is not checked; the service signals failures inside
    /// the payload, and anything that is not the expected JSON is a decode error.
    async fn decode_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        debug!(
            "Response ({}): {}",
            status.as_u16(),
            String::from_utf8_lossy(&body)
        );

        Ok(serde_json::from_slice(&body)?)
    }
}
