//! Construction of outbound registry payloads.
//!
//! Everything here is pure: the same inputs always produce the same payload.

use std::collections::BTreeMap;

use crate::registry::{ApplicationInstancePayload, ResourcePayload, Scope};
use crate::resource::{DeploymentMetadata, ExposedResource, ResourceType, WsdlCoordinates};

/// Default Maven repository the WSDL redirect URL points into.
pub const DEFAULT_WSDL_REPOSITORY: &str = "http://maven.adeo.no/nexus";

/// Builds create/update and instance registration payloads.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    /// Maven repository base URL, without trailing slash.
    wsdl_repository: String,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuilder {
    /// Creates a builder using the default WSDL repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wsdl_repository: DEFAULT_WSDL_REPOSITORY.to_string(),
        }
    }

    /// Sets the Maven repository used for WSDL URLs.
    #[must_use]
    pub fn with_wsdl_repository(mut self, repository: &str) -> Self {
        self.wsdl_repository = repository.trim_end_matches('/').to_string();
        self
    }

    /// Builds the create/update payload for an exposed resource.
    ///
    /// Types other than `RestService` and `WebserviceEndpoint` get no properties.
    /// A `WebserviceEndpoint` without WSDL coordinates still gets a `wsdlUrl`,
    /// built from empty coordinates.
    #[must_use]
    pub fn build_resource_payload(
        &self,
        resource: &ExposedResource,
        environment: &str,
        zone: Option<&str>,
        hostname: &str,
    ) -> ResourcePayload {
        let mut properties = BTreeMap::new();

        match ResourceType::parse(&resource.resource_type) {
            ResourceType::RestService => {
                properties.insert(String::from("url"), endpoint_url(hostname, &resource.path));
                properties.insert(String::from("description"), resource.description.clone());
            }
            ResourceType::WebserviceEndpoint => {
                properties.insert(
                    String::from("endpointUrl"),
                    endpoint_url(hostname, &resource.path),
                );
                let wsdl = resource.wsdl.clone().unwrap_or_default();
                properties.insert(String::from("wsdlUrl"), self.wsdl_url(&wsdl));
                properties.insert(String::from("description"), resource.description.clone());
            }
            _ => {}
        }

        ResourcePayload {
            alias: resource.alias.clone(),
            resource_type: resource.resource_type.clone(),
            properties,
            scope: generate_scope(resource, environment, zone),
        }
    }

    /// Redirect URL serving the zipped WSDL artifact.
    #[must_use]
    pub fn wsdl_url(&self, wsdl: &WsdlCoordinates) -> String {
        format!(
            "{}/service/local/artifact/maven/redirect?r=m2internal&g={}&a={}&v={}&e=zip",
            self.wsdl_repository, wsdl.group_id, wsdl.artifact_id, wsdl.version
        )
    }
}

/// Joins hostname and path into an https URL with exactly one `/` between them.
#[must_use]
pub fn endpoint_url(hostname: &str, path: &str) -> String {
    let hostname = hostname.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("https://{hostname}/{path}")
}

/// Scope a resource is registered in. `all_zones` drops the zone.
#[must_use]
pub fn generate_scope(resource: &ExposedResource, environment: &str, zone: Option<&str>) -> Scope {
    Scope {
        environment: environment.to_string(),
        zone: if resource.all_zones {
            None
        } else {
            zone.map(str::to_string)
        },
    }
}

/// Builds the application instance registration body.
#[must_use]
pub fn build_application_instance_payload(
    metadata: &DeploymentMetadata,
    exposed_resource_ids: &[i64],
    used_resource_ids: &[i64],
) -> ApplicationInstancePayload {
    ApplicationInstancePayload {
        application: metadata.application.clone(),
        environment: metadata.environment.clone(),
        version: metadata.version.clone(),
        exposed_resource_ids: exposed_resource_ids.to_vec(),
        used_resource_ids: used_resource_ids.to_vec(),
    }
}
