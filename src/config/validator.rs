//! Configuration validation for sync configs.
//!
//! This module checks a parsed configuration before any registry call is
//! made, collecting every error and warning rather than stopping at the first.

use crate::error::{ConfigError, ResourceSyncError, Result};
use crate::resource::{ExposedResource, ResourceRequest, ResourceType};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{RegistrySettings, SyncConfig};
use crate::resource::DeploymentMetadata;

/// Validator for sync configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a sync configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate(&self, config: &SyncConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ResourceSyncError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &SyncConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_registry(&config.registry, &mut result);
        Self::validate_deployment(&config.deployment, &mut result);
        Self::validate_used(&config.resources.used, &mut result);
        Self::validate_exposed(&config.resources.exposed, &mut result);

        result
    }

    /// Validates registry settings.
    fn validate_registry(registry: &RegistrySettings, result: &mut ValidationResult) {
        if !is_http_url(&registry.url) {
            result.errors.push(ValidationError {
                field: String::from("registry.url"),
                message: format!("Registry URL '{}' must start with http:// or https://", registry.url),
            });
        }

        if registry.timeout_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("registry.timeout_secs"),
                message: String::from("Timeout must be at least 1 second"),
            });
        }

        if !is_http_url(&registry.wsdl_repository) {
            result.errors.push(ValidationError {
                field: String::from("registry.wsdl_repository"),
                message: format!(
                    "WSDL repository '{}' must start with http:// or https://",
                    registry.wsdl_repository
                ),
            });
        }
    }

    /// Validates deployment metadata.
    fn validate_deployment(deployment: &DeploymentMetadata, result: &mut ValidationResult) {
        for (field, value) in [
            ("application", &deployment.application),
            ("environment", &deployment.environment),
            ("version", &deployment.version),
            ("hostname", &deployment.hostname),
        ] {
            if value.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("deployment.{field}"),
                    message: format!("Deployment {field} cannot be empty"),
                });
            }
        }

        if deployment.hostname.contains("://") {
            result.errors.push(ValidationError {
                field: String::from("deployment.hostname"),
                message: format!(
                    "Hostname '{}' must not include a scheme",
                    deployment.hostname
                ),
            });
        }
    }

    /// Validates used resource requests.
    fn validate_used(used: &[ResourceRequest], result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, request) in used.iter().enumerate() {
            let prefix = format!("resources.used[{i}]");
            Self::validate_identity(&request.alias, &request.resource_type, &prefix, result);

            if !seen.insert((request.alias.as_str(), request.resource_type.to_ascii_lowercase())) {
                result.errors.push(ValidationError {
                    field: prefix,
                    message: format!(
                        "Duplicate used resource: {} '{}'",
                        request.resource_type, request.alias
                    ),
                });
            }
        }
    }

    /// Validates exposed resources.
    fn validate_exposed(exposed: &[ExposedResource], result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, resource) in exposed.iter().enumerate() {
            let prefix = format!("resources.exposed[{i}]");
            Self::validate_identity(&resource.alias, &resource.resource_type, &prefix, result);

            if !seen.insert((resource.alias.as_str(), resource.resource_type.to_ascii_lowercase())) {
                result.errors.push(ValidationError {
                    field: prefix.clone(),
                    message: format!(
                        "Duplicate exposed resource: {} '{}'",
                        resource.resource_type, resource.alias
                    ),
                });
            }

            let kind = ResourceType::parse(&resource.resource_type);
            if !kind.is_exposable() {
                result.warnings.push(format!(
                    "{prefix}.type: {} is registered without properties",
                    resource.resource_type
                ));
                continue;
            }

            if !resource.path.starts_with('/') {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.path"),
                    message: format!(
                        "Path of {} '{}' must start with '/'",
                        resource.resource_type, resource.alias
                    ),
                });
            }

            if resource.description.is_empty() {
                result
                    .warnings
                    .push(format!("{prefix}.description: No description for '{}'", resource.alias));
            }

            if kind == ResourceType::WebserviceEndpoint {
                match &resource.wsdl {
                    None => result.errors.push(ValidationError {
                        field: format!("{prefix}.wsdl"),
                        message: format!(
                            "WebserviceEndpoint '{}' needs wsdl coordinates",
                            resource.alias
                        ),
                    }),
                    Some(wsdl) => {
                        for (field, value) in [
                            ("group_id", &wsdl.group_id),
                            ("artifact_id", &wsdl.artifact_id),
                            ("version", &wsdl.version),
                        ] {
                            if value.is_empty() {
                                result.errors.push(ValidationError {
                                    field: format!("{prefix}.wsdl.{field}"),
                                    message: format!("WSDL {field} cannot be empty"),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    /// Validates alias and type of a declared resource.
    fn validate_identity(
        alias: &str,
        resource_type: &str,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        if alias.trim().is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.alias"),
                message: String::from("Resource alias cannot be empty"),
            });
        }

        if resource_type.trim().is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.type"),
                message: String::from("Resource type cannot be empty"),
            });
        } else if !ResourceType::is_known(resource_type) {
            result.warnings.push(format!(
                "{prefix}.type: Unknown resource type '{resource_type}'"
            ));
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> SyncConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    const VALID: &str = r"
registry:
  url: https://registry.local
deployment:
  application: app
  environment: t1
  version: '1.0'
  hostname: app.local
resources:
  used:
    - alias: appdb
      type: DataSource
  exposed:
    - alias: api
      type: RestService
      path: /api
      description: API
";

    #[test]
    fn test_valid_config() {
        let result = ConfigValidator::new().validate(&parse(VALID)).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_invalid_registry_and_deployment() {
        let yaml = r"
registry:
  url: registry.local
deployment:
  application: ''
  environment: t1
  version: '1.0'
  hostname: https://app.local
";
        let result = ConfigValidator::new().check(&parse(yaml));
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["registry.url", "deployment.application", "deployment.hostname"]
        );
        assert!(ConfigValidator::new().validate(&parse(yaml)).is_err());
    }

    #[test]
    fn test_duplicate_and_unknown_resources() {
        let yaml = r"
registry:
  url: https://registry.local
deployment:
  application: app
  environment: t1
  version: '1.0'
  hostname: app.local
resources:
  used:
    - alias: appdb
      type: DataSource
    - alias: appdb
      type: datasource
    - alias: thing
      type: Gizmo
";
        let result = ConfigValidator::new().check(&parse(yaml));
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "resources.used[1]");
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].contains("Gizmo"));
    }

    #[test]
    fn test_exposed_rules() {
        let yaml = r"
registry:
  url: https://registry.local
deployment:
  application: app
  environment: t1
  version: '1.0'
  hostname: app.local
resources:
  exposed:
    - alias: api
      type: RestService
      path: api
      description: API
    - alias: ws
      type: WebserviceEndpoint
      path: /ws
      description: WS
    - alias: lb
      type: LoadBalancerConfig
";
        let result = ConfigValidator::new().check(&parse(yaml));
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["resources.exposed[0].path", "resources.exposed[1].wsdl"]
        );
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].contains("LoadBalancerConfig"));
    }
}
