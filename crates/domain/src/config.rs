//! Connector configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::{
    PRODUCTION_RECEIPT_URL, PRODUCTION_SERVER_URL, SANDBOX_RECEIPT_URL, SANDBOX_SERVER_URL,
};
use crate::encoding::is_valid_kra_pin;
use crate::errors::{EtimsError, Result};

/// Remote environment the device is registered against.
///
/// Sequence and session state is tracked per environment: a sandbox device
/// and a production device for the same taxpayer never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Base URL of the remote tax endpoint for this environment.
    pub fn server_url(self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_SERVER_URL,
            Environment::Production => PRODUCTION_SERVER_URL,
        }
    }

    /// Base URL of the public receipt verification portal.
    pub fn receipt_url(self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_RECEIPT_URL,
            Environment::Production => PRODUCTION_RECEIPT_URL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Sandbox => "Sandbox",
            Environment::Production => "Production",
        }
    }
}

/// Local state database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    4
}

/// Taxpayer/device identity and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Company the device is registered to (reference only).
    pub company: String,
    /// Taxpayer identification number (KRA PIN).
    pub tin: String,
    /// Branch id, always two characters ("00" for head office).
    pub branch_id: String,
    /// Device serial number supplied at registration.
    pub device_serial: String,
    #[serde(default)]
    pub environment: Environment,
    /// Override for the remote base URL; tests point this at a mock server.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Per-exchange timeout ceiling, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub database: DatabaseConfig,
}

fn default_request_timeout() -> u64 {
    300
}

impl ConnectorConfig {
    /// Resolved base URL for the configured environment.
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or_else(|| self.environment.server_url())
    }

    /// Validate identity fields before any device state is created.
    pub fn validate(&self) -> Result<()> {
        if self.company.trim().is_empty() {
            return Err(EtimsError::Config("company is mandatory".into()));
        }
        if !is_valid_kra_pin(&self.tin) {
            return Err(EtimsError::Config(format!(
                "taxpayer PIN {:?} does not resemble a valid KRA PIN",
                self.tin
            )));
        }
        if self.branch_id.len() != 2 {
            return Err(EtimsError::Config(format!(
                "branch id must be exactly two characters, got {:?}",
                self.branch_id
            )));
        }
        if self.device_serial.is_empty() || self.device_serial.len() > 100 {
            return Err(EtimsError::Config("invalid device serial number".into()));
        }
        Ok(())
    }
}
