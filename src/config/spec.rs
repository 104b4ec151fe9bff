//! Configuration types for resource sync.
//!
//! This module defines the structs that map to the `resource-sync.yaml` file:
//! where the registry lives, what is being deployed, and which resources the
//! application uses and exposes.

use serde::{Deserialize, Serialize};

use crate::payload::DEFAULT_WSDL_REPOSITORY;
use crate::registry::DEFAULT_TIMEOUT_SECS;
use crate::resource::{DeploymentMetadata, ExposedResource, LookupScope, ResourceRequest};

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Registry connection settings.
    pub registry: RegistrySettings,
    /// What is being deployed and where.
    pub deployment: DeploymentMetadata,
    /// Used and exposed resources.
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl SyncConfig {
    /// Lookup scope of the deployment.
    #[must_use]
    pub fn scope(&self) -> LookupScope {
        self.deployment.scope()
    }
}

/// Registry connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Registry base URL.
    pub url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maven repository WSDL URLs point into.
    #[serde(default = "default_wsdl_repository")]
    pub wsdl_repository: String,
}

/// Resources declared by the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcesConfig {
    /// Resources the application depends on.
    #[serde(default)]
    pub used: Vec<ResourceRequest>,
    /// Resources the application offers.
    #[serde(default)]
    pub exposed: Vec<ExposedResource>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_wsdl_repository() -> String {
    DEFAULT_WSDL_REPOSITORY.to_string()
}
