//! Registry wire types.
//!
//! This module defines the JSON shapes exchanged with the resource registry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A resource record as returned by a scoped lookup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawResource {
    /// Registry-assigned id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Alias of the resource.
    #[serde(default)]
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Flat properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// Secrets keyed by secret name.
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretReference>,
    /// Files object, keyed by file role.
    #[serde(default)]
    pub files: Option<serde_json::Value>,
}

/// Pointer to a secret value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecretReference {
    /// URL the secret value is served from.
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

/// Query parameters of a scoped lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedQuery {
    /// Resource alias.
    pub alias: String,
    /// Resource type.
    pub resource_type: String,
    /// Environment name.
    pub environment: String,
    /// Application name.
    pub application: String,
    /// Zone, omitted from the query when absent.
    pub zone: Option<String>,
}

impl ScopedQuery {
    /// Query pairs in the order the registry documents them.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("alias", self.alias.as_str()),
            ("type", self.resource_type.as_str()),
            ("environment", self.environment.as_str()),
            ("application", self.application.as_str()),
        ];
        if let Some(zone) = &self.zone {
            pairs.push(("zone", zone.as_str()));
        }
        pairs
    }
}

/// Visibility of a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Environment name.
    pub environment: String,
    /// Zone, absent when the resource is visible in every zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Body of a create or update resource call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePayload {
    /// Resource alias.
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Type-specific properties.
    pub properties: BTreeMap<String, String>,
    /// Visibility.
    pub scope: Scope,
}

/// Body of the application instance registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInstancePayload {
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment: String,
    /// Application version.
    pub version: String,
    /// Ids of the resources the application exposes, in declaration order.
    #[serde(rename = "exposedResources")]
    pub exposed_resource_ids: Vec<i64>,
    /// Ids of the resources the application uses, in declaration order.
    #[serde(rename = "usedResources")]
    pub used_resource_ids: Vec<i64>,
}

/// Response of a create or update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedResource {
    /// Id of the stored resource.
    pub id: i64,
}
