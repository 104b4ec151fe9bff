//! Error types for the resource sync engine.
//!
//! This module provides the error hierarchy for every stage of a sync pass:
//! configuration, raw registry calls, resource mapping, resolution,
//! reconciliation and application-instance registration.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the resource sync engine.
#[derive(Debug, Error)]
pub enum ResourceSyncError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Raw registry errors outside of resolution and reconciliation.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Resolution of used resources failed.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Reconciliation of exposed resources failed.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Application instance registration failed.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Errors raised by a single call against the registry HTTP surface.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The request could not be built (bad URL, unserializable payload).
    #[error("Failed creating registry request: {message}")]
    InvalidRequest {
        /// Description of the construction failure.
        message: String,
    },

    /// The registry could not be reached or the body could not be read.
    #[error("Error contacting registry: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The registry answered 404.
    #[error("Resource not found in registry: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// The registry answered with any other non-success status.
    #[error("Registry returned: {body} ({status})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Could not decode registry response: {message}")]
    InvalidResponse {
        /// Description of the decoding failure.
        message: String,
    },
}

/// Errors raised while converting a registry record into an internal resource.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The record carries more than one secret.
    #[error("Resource carries {count} secrets ({names}); exactly one is supported")]
    MultipleSecrets {
        /// Number of secrets on the record.
        count: usize,
        /// Comma-separated secret names.
        names: String,
    },

    /// A secret entry has no reference URL.
    #[error("Secret '{name}' has no ref")]
    MissingSecretReference {
        /// Secret name.
        name: String,
    },

    /// The secret value could not be fetched.
    #[error("Unable to resolve secret: {source}")]
    SecretUnresolved {
        /// Underlying registry failure.
        #[source]
        source: RegistryError,
    },

    /// The files object is not a JSON object of objects.
    #[error("Error parsing files object: {message}")]
    InvalidFilesObject {
        /// Description of the shape problem.
        message: String,
    },

    /// A file role lacks its `filename` or `ref` field.
    #[error("Error parsing files object. Field '{field}' not found for file '{role}'")]
    MissingFileField {
        /// File role (e.g. `keystore`).
        role: String,
        /// Missing field name.
        field: &'static str,
    },

    /// A certificate file could not be fetched.
    #[error("Unable to resolve certificate file '{filename}': {source}")]
    FileUnresolved {
        /// File name being fetched.
        filename: String,
        /// Underlying registry failure.
        #[source]
        source: RegistryError,
    },

    /// An application properties line has no `=`.
    #[error("Malformed application property on line {line}: '{entry}'")]
    MalformedProperty {
        /// One-based line number.
        line: usize,
        /// The offending entry.
        entry: String,
    },
}

/// Failure of a single scoped lookup, carrying a status code so not-found
/// can be told apart from a broken registry.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The registry call failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The record was fetched but could not be mapped.
    #[error("Could not map response to internal resource: {0}")]
    Mapping(#[from] MappingError),
}

/// Resolution of a used resource failed. Resolution is all-or-nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A single request in the batch failed.
    #[error("Failed to get resource '{alias}' of type {resource_type}: {reason}")]
    ResourceUnavailable {
        /// Alias of the failing request.
        alias: String,
        /// Type of the failing request.
        resource_type: String,
        /// Status code of the underlying lookup failure.
        status: u16,
        /// Reason for failure.
        reason: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The lookup failed with anything other than not-found.
    #[error("Encountered a problem while looking up {resource_type} '{alias}' in the registry: {reason}")]
    LookupFailed {
        /// Alias of the exposed resource.
        alias: String,
        /// Type of the exposed resource.
        resource_type: String,
        /// Reason for failure.
        reason: String,
    },

    /// The registry returned a record without an id.
    #[error("Registry record for {resource_type} '{alias}' has no id")]
    MissingResourceId {
        /// Alias of the exposed resource.
        alias: String,
        /// Type of the exposed resource.
        resource_type: String,
    },

    /// Creating the resource failed.
    #[error("Failed creating resource: {alias} of type {resource_type} with path {path}. ({reason})")]
    CreateFailed {
        /// Alias of the exposed resource.
        alias: String,
        /// Type of the exposed resource.
        resource_type: String,
        /// Path of the exposed resource.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Updating the resource failed.
    #[error("Failed updating resource {id}: {alias} of type {resource_type} with path {path}. ({reason})")]
    UpdateFailed {
        /// Registry id of the existing resource.
        id: i64,
        /// Alias of the exposed resource.
        alias: String,
        /// Type of the exposed resource.
        resource_type: String,
        /// Path of the exposed resource.
        path: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Errors from the application instance registration and presence checks.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The environment does not exist in the registry.
    #[error("Could not find environment {environment} in registry: {reason}")]
    EnvironmentMissing {
        /// Environment name.
        environment: String,
        /// Reason for failure.
        reason: String,
    },

    /// The application does not exist in the registry.
    #[error("Could not find application {application} in registry: {reason}")]
    ApplicationMissing {
        /// Application name.
        application: String,
        /// Reason for failure.
        reason: String,
    },

    /// Posting the application instance failed.
    #[error("Failed registering {application}:{version} in {environment}: {reason}")]
    InstanceRejected {
        /// Application name.
        application: String,
        /// Application version.
        version: String,
        /// Environment name.
        environment: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type alias for resource sync operations.
pub type Result<T> = std::result::Result<T, ResourceSyncError>;

impl ResourceSyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl RegistryError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an API error.
    #[must_use]
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP-like status code for this failure.
    ///
    /// Failures that never produced a registry status report 500.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Api { status, .. } => *status,
            Self::InvalidRequest { .. } | Self::Transport { .. } | Self::InvalidResponse { .. } => {
                500
            }
        }
    }
}

impl LookupError {
    /// Returns the status code of the failure: 404 for not-found, the
    /// registry's status for other registry errors, 500 otherwise.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Registry(err) => err.status_code(),
            Self::Mapping(_) => 500,
        }
    }

    /// Returns true if the registry reported the resource as absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_status_codes() {
        let not_found = LookupError::from(RegistryError::NotFound {
            resource: String::from("db"),
        });
        assert_eq!(not_found.status_code(), 404);
        assert!(not_found.is_not_found());

        let api = LookupError::from(RegistryError::api(503, "down"));
        assert_eq!(api.status_code(), 503);
        assert!(!api.is_not_found());

        let mapping = LookupError::from(MappingError::MalformedProperty {
            line: 1,
            entry: String::from("novalue"),
        });
        assert_eq!(mapping.status_code(), 500);
        assert!(!mapping.is_not_found());
    }

    #[test]
    fn test_api_error_carries_body_verbatim() {
        let err = RegistryError::api(400, "{\"message\":\"bad scope\"}");
        assert_eq!(
            err.to_string(),
            "Registry returned: {\"message\":\"bad scope\"} (400)"
        );
    }
}
