//! Configuration module for resource sync.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `resource-sync.yaml`
//! - Environment overrides and registry credentials
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    apply_env_overrides, credentials_from, find_config_file, ConfigParser, CONFIG_PATH_VAR,
    DEFAULT_CONFIG_FILES, PASSWORD_VAR, USERNAME_VAR,
};
pub use spec::{RegistrySettings, ResourcesConfig, SyncConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
