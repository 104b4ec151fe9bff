//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, ResourceSyncError, Result};
use crate::registry::Credentials;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::SyncConfig;

/// Variable holding the registry user name.
pub const USERNAME_VAR: &str = "REGISTRY_USERNAME";
/// Variable holding the registry password.
pub const PASSWORD_VAR: &str = "REGISTRY_PASSWORD";
/// Variable pointing at the configuration file.
pub const CONFIG_PATH_VAR: &str = "RESOURCE_SYNC_CONFIG";

/// Configuration parser for loading sync configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path `.env` is looked up in.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SyncConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ResourceSyncError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ResourceSyncError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SyncConfig> {
        debug!("Parsing YAML configuration");

        let config: SyncConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ResourceSyncError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration for {} in {}",
            config.deployment.application, config.deployment.environment
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `RESOURCE_SYNC_REGISTRY_URL`,
    /// `RESOURCE_SYNC_ENVIRONMENT`, `RESOURCE_SYNC_ZONE` and
    /// `RESOURCE_SYNC_VERSION`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<SyncConfig> {
        let mut config = self.load_file(path)?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ResourceSyncError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads registry credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is not set.
    pub fn credentials() -> Result<Credentials> {
        credentials_from(|name| std::env::var(name).ok())
    }
}

/// Applies overrides read through `lookup` to the configuration.
pub fn apply_env_overrides(config: &mut SyncConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("RESOURCE_SYNC_REGISTRY_URL") {
        debug!("Overriding registry.url from environment");
        config.registry.url = url;
    }

    if let Some(environment) = lookup("RESOURCE_SYNC_ENVIRONMENT") {
        debug!("Overriding deployment.environment from environment");
        config.deployment.environment = environment;
    }

    if let Some(zone) = lookup("RESOURCE_SYNC_ZONE") {
        debug!("Overriding deployment.zone from environment");
        config.deployment.zone = if zone.is_empty() { None } else { Some(zone) };
    }

    if let Some(version) = lookup("RESOURCE_SYNC_VERSION") {
        debug!("Overriding deployment.version from environment");
        config.deployment.version = version;
    }
}

/// Reads registry credentials through `lookup`.
///
/// # Errors
///
/// Returns an error naming the first missing variable.
pub fn credentials_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
    let read = |name: &str| {
        lookup(name).ok_or_else(|| {
            ResourceSyncError::Config(ConfigError::MissingEnvVar {
                name: name.to_string(),
            })
        })
    };

    Ok(Credentials::new(read(USERNAME_VAR)?, read(PASSWORD_VAR)?))
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["resource-sync.yaml", "resource-sync.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ResourceSyncError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL_CONFIG: &str = r#"
registry:
  url: https://registry.example.local
  timeout_secs: 10
deployment:
  application: my-app
  environment: t1
  version: "1.0.3"
  zone: fss
  hostname: my-app.example.local
resources:
  used:
    - alias: appdb
      type: DataSource
    - alias: app_cert
      type: Certificate
  exposed:
    - alias: my-api
      type: RestService
      path: /api
      description: Public API
    - alias: my-ws
      type: WebserviceEndpoint
      path: /ws/Service
      all_zones: true
      wsdl:
        group_id: no.example
        artifact_id: service-wsdl
        version: "2.0"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ConfigParser::new().parse_yaml(FULL_CONFIG, None).unwrap();

        assert_eq!(config.registry.url, "https://registry.example.local");
        assert_eq!(config.registry.timeout_secs, 10);
        assert_eq!(config.deployment.application, "my-app");
        assert_eq!(config.deployment.zone.as_deref(), Some("fss"));
        assert_eq!(config.resources.used.len(), 2);
        assert_eq!(config.resources.used[1].resource_type, "Certificate");
        assert_eq!(config.resources.exposed.len(), 2);
        assert!(!config.resources.exposed[0].all_zones);
        assert!(config.resources.exposed[1].all_zones);
        assert_eq!(
            config.resources.exposed[1]
                .wsdl
                .as_ref()
                .map(|w| w.artifact_id.as_str()),
            Some("service-wsdl")
        );
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = ConfigParser::new()
            .parse_yaml("registry: [", None)
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceSyncError::Config(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_file_and_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let path = dir.path().join("resource-sync.yaml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, path);

        let config = ConfigParser::new().load_file(&found).unwrap();
        assert_eq!(config.deployment.version, "1.0.3");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigParser::new()
            .load_file(dir.path().join("nope.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceSyncError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConfigParser::new().parse_yaml(FULL_CONFIG, None).unwrap();
        let vars = HashMap::from([
            ("RESOURCE_SYNC_ENVIRONMENT", "q0"),
            ("RESOURCE_SYNC_ZONE", ""),
            ("RESOURCE_SYNC_VERSION", "1.0.4"),
        ]);

        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.deployment.environment, "q0");
        assert_eq!(config.deployment.zone, None);
        assert_eq!(config.deployment.version, "1.0.4");
        assert_eq!(config.registry.url, "https://registry.example.local");
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars = HashMap::from([(USERNAME_VAR, "deployer"), (PASSWORD_VAR, "hunter2")]);
        let credentials = credentials_from(|name| vars.get(name).map(|v| (*v).to_string())).unwrap();
        assert_eq!(credentials, Credentials::new("deployer", "hunter2"));

        let err = credentials_from(|name| {
            (name == USERNAME_VAR).then(|| String::from("deployer"))
        })
        .unwrap_err();
        assert!(err.to_string().contains(PASSWORD_VAR));
    }
}
