//! Monitor configuration
//!
//! Loads the JSON configuration file shared with the other Scalarm
//! monitoring tools (PascalCase keys) and normalises it: `~` in the
//! certificate path is expanded and an empty scheme becomes `https`.

use std::path::{Path, PathBuf};

use scalarm_client::DEFAULT_SCHEME;
use serde::Deserialize;
use thiserror::Error;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Monitor configuration
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// `host:port` of the information service
    pub information_service_address: String,

    pub login: String,

    pub password: String,

    /// Infrastructures whose records are monitored, polled in order
    #[serde(default)]
    pub infrastructures: Vec<String>,

    /// Extra CA certificate (PEM) trusted when talking to Scalarm
    #[serde(default)]
    pub scalarm_certificate_path: String,

    #[serde(default)]
    pub scalarm_scheme: String,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

impl Config {
    /// Reads, normalises and validates the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Config =
            serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Expands `~` in the certificate path and fills in the default scheme
    pub fn normalize(&mut self) {
        self.scalarm_certificate_path = expand_home(&self.scalarm_certificate_path);

        if self.scalarm_scheme.is_empty() {
            self.scalarm_scheme = DEFAULT_SCHEME.to_string();
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.information_service_address.is_empty() {
            return Err(ConfigError::Invalid(
                "InformationServiceAddress cannot be empty".to_string(),
            ));
        }

        if self.login.is_empty() {
            return Err(ConfigError::Invalid("Login cannot be empty".to_string()));
        }

        if self.infrastructures.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one infrastructure must be configured".to_string(),
            ));
        }

        if self.scalarm_scheme != "http" && self.scalarm_scheme != "https" {
            return Err(ConfigError::Invalid(format!(
                "ScalarmScheme must be http or https, got {}",
                self.scalarm_scheme
            )));
        }

        Ok(())
    }

    /// Certificate path, if one is configured
    pub fn certificate_path(&self) -> Option<&Path> {
        if self.scalarm_certificate_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.scalarm_certificate_path))
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("information_service_address", &self.information_service_address)
            .field("login", &self.login)
            .field("password", &"***")
            .field("infrastructures", &self.infrastructures)
            .field("scalarm_certificate_path", &self.scalarm_certificate_path)
            .field("scalarm_scheme", &self.scalarm_scheme)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// Replaces a leading `~` with the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{}", home.display(), rest),
        _ => path.to_string(),
    }
}
