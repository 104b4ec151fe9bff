//! Application instance registration and registry presence checks.

use tracing::{debug, info};

use crate::error::{RegistrationError, RegistryError};
use crate::payload::build_application_instance_payload;
use crate::registry::ResourceRegistry;
use crate::resource::DeploymentMetadata;

/// Posts application instances and checks that their environment and
/// application exist.
#[derive(Debug)]
pub struct InstanceRegistrar<'a, R: ResourceRegistry + ?Sized> {
    /// Registry client.
    registry: &'a R,
}

impl<'a, R: ResourceRegistry + ?Sized> InstanceRegistrar<'a, R> {
    /// Creates a registrar.
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Fails unless the environment exists in the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry does not answer 200.
    pub async fn check_environment(&self, environment: &str) -> Result<(), RegistrationError> {
        self.registry
            .environment_exists(environment)
            .await
            .map_err(|err| RegistrationError::EnvironmentMissing {
                environment: environment.to_string(),
                reason: err.to_string(),
            })?;
        debug!("Environment {environment} exists");
        Ok(())
    }

    /// Fails unless the application exists in the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry does not answer 200.
    pub async fn check_application(&self, application: &str) -> Result<(), RegistrationError> {
        self.registry
            .application_exists(application)
            .await
            .map_err(|err| RegistrationError::ApplicationMissing {
                application: application.to_string(),
                reason: err.to_string(),
            })?;
        debug!("Application {application} exists");
        Ok(())
    }

    /// Registers the deployed instance with the ids of the resources it
    /// exposes and uses.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the registry's response body if it does
    /// not answer 200.
    pub async fn register(
        &self,
        metadata: &DeploymentMetadata,
        exposed_resource_ids: &[i64],
        used_resource_ids: &[i64],
    ) -> Result<(), RegistrationError> {
        let payload =
            build_application_instance_payload(metadata, exposed_resource_ids, used_resource_ids);

        self.registry
            .create_application_instance(&payload)
            .await
            .map_err(|err| RegistrationError::InstanceRejected {
                application: metadata.application.clone(),
                version: metadata.version.clone(),
                environment: metadata.environment.clone(),
                reason: rejection_reason(err),
            })?;

        info!(
            "Registered {}:{} in {} ({} exposed, {} used)",
            metadata.application,
            metadata.version,
            metadata.environment,
            exposed_resource_ids.len(),
            used_resource_ids.len()
        );
        Ok(())
    }
}

fn rejection_reason(err: RegistryError) -> String {
    match err {
        RegistryError::Api { status, body } => format!("{body} ({status})"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{build_http_client, Credentials, RegistryClient};
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RegistryClient {
        RegistryClient::new(
            &server.uri(),
            Credentials::new("deployer", "hunter2"),
            build_http_client(5).unwrap(),
        )
    }

    fn metadata() -> DeploymentMetadata {
        DeploymentMetadata {
            application: String::from("appName"),
            environment: String::from("t1000"),
            version: String::from("2.1"),
            zone: Some(String::from("fss")),
            hostname: String::from("app.local"),
        }
    }

    #[tokio::test]
    async fn test_register_posts_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .and(basic_auth("deployer", "hunter2"))
            .and(body_json(json!({
                "application": "appName",
                "environment": "t1000",
                "version": "2.1",
                "exposedResources": [1, 2, 3],
                "usedResources": [4, 5, 6]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        InstanceRegistrar::new(&client)
            .register(&metadata(), &[1, 2, 3], &[4, 5, 6])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_rejection_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown resource 6"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = InstanceRegistrar::new(&client)
            .register(&metadata(), &[], &[6])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed registering appName:2.1 in t1000: unknown resource 6 (400)"
        );
    }

    #[tokio::test]
    async fn test_register_not_found_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such application 'appName'"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = InstanceRegistrar::new(&client)
            .register(&metadata(), &[], &[])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed registering appName:2.1 in t1000: no such application 'appName' (404)"
        );
    }

    #[tokio::test]
    async fn test_presence_checks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/environments/t1000"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/appName"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let registrar = InstanceRegistrar::new(&client);

        registrar.check_environment("t1000").await.unwrap();
        let err = registrar.check_application("appName").await.unwrap_err();
        assert!(matches!(err, RegistrationError::ApplicationMissing { .. }));
    }
}
