//! TOML configuration loading.

use std::path::Path;

use etims_domain::config::ConnectorConfig;
use etims_domain::{EtimsError, Result};
use tracing::info;

/// Environment variable overriding the default configuration path.
pub const CONFIG_PATH_ENV: &str = "ETIMS_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "etims.toml";

/// Read and validate a connector configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConnectorConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|err| {
        EtimsError::Config(format!("cannot read config file {}: {err}", path.display()))
    })?;
    let config: ConnectorConfig = toml::from_str(&raw).map_err(|err| {
        EtimsError::Config(format!("cannot parse config file {}: {err}", path.display()))
    })?;
    config.validate()?;
    info!(
        path = %path.display(),
        tin = %config.tin,
        branch_id = %config.branch_id,
        environment = config.environment.as_str(),
        "configuration loaded"
    );
    Ok(config)
}

/// Load from `$ETIMS_CONFIG`, falling back to `etims.toml` in the working
/// directory.
pub fn load_default_config() -> Result<ConnectorConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use etims_domain::config::Environment;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_a_minimal_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            company = "Acme Traders"
            tin = "A123456789B"
            branch_id = "00"
            device_serial = "SN-0001"
            environment = "sandbox"

            [database]
            path = "/var/lib/etims/state.db"
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.tin, "A123456789B");
        assert_eq!(config.environment, Environment::Sandbox);
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.database.pool_size, 4);
    }

    #[test]
    fn invalid_identity_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            company = "Acme Traders"
            tin = "not-a-pin"
            branch_id = "00"
            device_serial = "SN-0001"

            [database]
            path = ":memory:"
            "#
        )
        .unwrap();

        assert!(matches!(load_config(file.path()), Err(EtimsError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_config("/nonexistent/etims.toml").unwrap_err();
        assert!(matches!(err, EtimsError::Config(_)));
    }
}
