//! Internal resource model.
//!
//! These are the types the engine works with once registry responses have
//! been mapped, and the declarations the caller hands in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Resource types the registry knows about.
pub const KNOWN_RESOURCE_TYPES: &[&str] = &[
    "DataSource",
    "MSSQLDataSource",
    "DB2DataSource",
    "LDAP",
    "BaseUrl",
    "Credential",
    "Certificate",
    "OpenAm",
    "Cics",
    "RoleMapping",
    "QueueManager",
    "WebserviceEndpoint",
    "RestService",
    "WebserviceGateway",
    "EJB",
    "Datapower",
    "EmailAddress",
    "SMTPServer",
    "Queue",
    "Topic",
    "DeploymentManager",
    "ApplicationProperties",
    "MemoryParameters",
    "LoadBalancer",
    "LoadBalancerConfig",
    "FileLibrary",
    "Channel",
];

/// Resource types the engine treats specially.
///
/// Parsing is case-insensitive since the registry reports types in lowercase
/// while manifests use the capitalized names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    /// A REST endpoint exposed by an application.
    RestService,
    /// A SOAP endpoint with a published WSDL.
    WebserviceEndpoint,
    /// A database connection.
    DataSource,
    /// A keystore or other certificate bundle.
    Certificate,
    /// A block of `key=value` application properties.
    ApplicationProperties,
    /// Any other registry type.
    Other(String),
}

impl ResourceType {
    /// Parses a type name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "restservice" => Self::RestService,
            "webserviceendpoint" => Self::WebserviceEndpoint,
            "datasource" => Self::DataSource,
            "certificate" => Self::Certificate,
            "applicationproperties" => Self::ApplicationProperties,
            _ => Self::Other(value.to_string()),
        }
    }

    /// Returns true if the registry recognizes this type name.
    #[must_use]
    pub fn is_known(value: &str) -> bool {
        KNOWN_RESOURCE_TYPES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(value))
    }

    /// Returns true if the payload builder produces properties for this type.
    #[must_use]
    pub const fn is_exposable(&self) -> bool {
        matches!(self, Self::RestService | Self::WebserviceEndpoint)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestService => write!(f, "RestService"),
            Self::WebserviceEndpoint => write!(f, "WebserviceEndpoint"),
            Self::DataSource => write!(f, "DataSource"),
            Self::Certificate => write!(f, "Certificate"),
            Self::ApplicationProperties => write!(f, "ApplicationProperties"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A dependency to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Alias the application knows the resource by.
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl ResourceRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(alias: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// Maven coordinates of a published WSDL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsdlCoordinates {
    /// Maven group id.
    pub group_id: String,
    /// Maven artifact id.
    pub artifact_id: String,
    /// Artifact version.
    pub version: String,
}

/// A capability the application offers to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedResource {
    /// Alias to register under.
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Path below the application's hostname.
    #[serde(default)]
    pub path: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// WSDL coordinates, for `WebserviceEndpoint`.
    #[serde(default)]
    pub wsdl: Option<WsdlCoordinates>,
    /// Register for every zone of the environment instead of only the current one.
    #[serde(default)]
    pub all_zones: bool,
}

impl ExposedResource {
    /// Request for looking this resource up in the registry.
    #[must_use]
    pub fn as_request(&self) -> ResourceRequest {
        ResourceRequest::new(&self.alias, &self.resource_type)
    }
}

/// A resolved resource, ready to hand to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalResource {
    /// Registry-assigned id.
    pub id: Option<i64>,
    /// Alias of the resource.
    pub name: String,
    /// Registry type name.
    pub resource_type: String,
    /// Flat properties.
    pub properties: HashMap<String, String>,
    /// At most one entry, keyed `password`.
    pub secret: HashMap<String, String>,
    /// Certificate files keyed `<alias>_<filename>`.
    pub certificates: HashMap<String, Vec<u8>>,
}

impl InternalResource {
    /// Returns true if a secret was materialized.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }
}

/// Query scope shared by resolution and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupScope {
    /// Environment name.
    pub environment: String,
    /// Application name.
    pub application: String,
    /// Zone, if the deployment is zone-bound.
    pub zone: Option<String>,
}

impl LookupScope {
    /// Creates a new scope.
    #[must_use]
    pub fn new(
        environment: impl Into<String>,
        application: impl Into<String>,
        zone: Option<String>,
    ) -> Self {
        Self {
            environment: environment.into(),
            application: application.into(),
            zone,
        }
    }
}

/// What is being deployed and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment: String,
    /// Application version.
    pub version: String,
    /// Zone within the environment.
    #[serde(default)]
    pub zone: Option<String>,
    /// Hostname the application is reachable on.
    pub hostname: String,
}

impl DeploymentMetadata {
    /// Lookup scope for this deployment.
    #[must_use]
    pub fn scope(&self) -> LookupScope {
        LookupScope::new(&self.environment, &self.application, self.zone.clone())
    }
}
