//! A single sync pass.
//!
//! A pass checks that the environment and application exist, resolves the
//! used resources, reconciles the exposed ones and registers the application
//! instance with both id lists. Any failure ends the pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::metrics::{self, SharedMetrics};
use crate::payload::PayloadBuilder;
use crate::reconciler::{ReconciledResource, Reconciler};
use crate::registrar::InstanceRegistrar;
use crate::registry::ResourceRegistry;
use crate::resolver::{resource_ids, Resolver};
use crate::resource::InternalResource;

/// Summary of a resolved resource. Secret values and file contents are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    /// Alias of the resource.
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Registry id.
    pub id: Option<i64>,
    /// Property names, sorted.
    pub properties: Vec<String>,
    /// Whether a secret was materialized.
    pub has_secret: bool,
    /// Names of materialized certificate files, sorted.
    pub certificates: Vec<String>,
}

impl From<&InternalResource> for ResourceSummary {
    fn from(resource: &InternalResource) -> Self {
        let mut properties: Vec<String> = resource.properties.keys().cloned().collect();
        properties.sort();
        let mut certificates: Vec<String> = resource.certificates.keys().cloned().collect();
        certificates.sort();

        Self {
            alias: resource.name.clone(),
            resource_type: resource.resource_type.clone(),
            id: resource.id,
            properties,
            has_secret: resource.has_secret(),
            certificates,
        }
    }
}

/// Outcome of a completed sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Identifier of the pass, also attached to its log lines.
    pub pass_id: Uuid,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    pub finished_at: DateTime<Utc>,
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment: String,
    /// Application version.
    pub version: String,
    /// Resolved used resources.
    pub used: Vec<ResourceSummary>,
    /// Reconciled exposed resources.
    pub exposed: Vec<ReconciledResource>,
    /// Ids sent as `usedResources`.
    pub used_resource_ids: Vec<i64>,
    /// Ids sent as `exposedResources`.
    pub exposed_resource_ids: Vec<i64>,
}

impl SyncReport {
    /// Wall-clock duration of the pass in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Runs sync passes for one configuration.
#[derive(Debug)]
pub struct SyncPass<'a, R: ResourceRegistry + ?Sized> {
    /// Registry client.
    registry: &'a R,
    /// Configuration being synced.
    config: &'a SyncConfig,
    /// Metrics sink.
    metrics: SharedMetrics,
}

impl<'a, R: ResourceRegistry + ?Sized> SyncPass<'a, R> {
    /// Creates a sync pass.
    #[must_use]
    pub fn new(registry: &'a R, config: &'a SyncConfig) -> Self {
        Self {
            registry,
            config,
            metrics: metrics::noop(),
        }
    }

    /// Sets the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Runs the pass.
    ///
    /// # Errors
    ///
    /// Returns the first presence check, resolve, reconcile or registration failure.
    pub async fn run(&self) -> Result<SyncReport> {
        let pass_id = Uuid::new_v4();
        let span = info_span!("sync", pass_id = %pass_id);
        self.run_pass(pass_id).instrument(span).await
    }

    async fn run_pass(&self, pass_id: Uuid) -> Result<SyncReport> {
        let started_at = Utc::now();
        let deployment = &self.config.deployment;
        let scope = self.config.scope();

        info!(
            "Starting sync of {}:{} in {}",
            deployment.application, deployment.version, deployment.environment
        );

        let registrar = InstanceRegistrar::new(self.registry);
        registrar.check_environment(&deployment.environment).await?;
        registrar.check_application(&deployment.application).await?;

        let used = Resolver::new(self.registry)
            .with_metrics(self.metrics.clone())
            .resolve(&self.config.resources.used, &scope)
            .await?;

        let payload_builder =
            PayloadBuilder::new().with_wsdl_repository(&self.config.registry.wsdl_repository);
        let exposed = Reconciler::new(self.registry)
            .with_payload_builder(payload_builder)
            .with_metrics(self.metrics.clone())
            .reconcile_detailed(&self.config.resources.exposed, &deployment.hostname, &scope)
            .await?;

        let used_resource_ids = resource_ids(&used);
        let exposed_resource_ids: Vec<i64> = exposed.iter().map(|r| r.id).collect();

        registrar
            .register(deployment, &exposed_resource_ids, &used_resource_ids)
            .await?;

        let report = SyncReport {
            pass_id,
            started_at,
            finished_at: Utc::now(),
            application: deployment.application.clone(),
            environment: deployment.environment.clone(),
            version: deployment.version.clone(),
            used: used.iter().map(ResourceSummary::from).collect(),
            exposed,
            used_resource_ids,
            exposed_resource_ids,
        };

        info!("Sync finished in {} ms", report.duration_ms());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::error::{RegistrationError, ResourceSyncError, ResolveError};
    use crate::registry::{build_http_client, Credentials, RegistryClient};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SyncConfig {
        let yaml = format!(
            r"
registry:
  url: {}
deployment:
  application: app
  environment: t1
  version: '1.0'
  zone: fss
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
",
            server.uri()
        );
        ConfigParser::new().parse_yaml(&yaml, None).unwrap()
    }

    fn client_for(server: &MockServer) -> RegistryClient {
        RegistryClient::new(
            &server.uri(),
            Credentials::new("deployer", "hunter2"),
            build_http_client(5).unwrap(),
        )
    }

    async fn mount_presence(server: &MockServer, application_status: u16) {
        Mock::given(method("GET"))
            .and(path("/api/v2/environments/t1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/app"))
            .respond_with(ResponseTemplate::new(application_status))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_full_pass() {
        let server = MockServer::start().await;
        mount_presence(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .and(query_param("alias", "appdb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 11,
                "alias": "appdb",
                "type": "datasource",
                "properties": {"url": "jdbc:oracle:thin:@//db:1521/app", "username": "app"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .and(query_param("alias", "api"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/resources/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .and(body_json(json!({
                "application": "app",
                "environment": "t1",
                "version": "1.0",
                "exposedResources": [77],
                "usedResources": [11]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = client_for(&server);
        let report = SyncPass::new(&client, &config).run().await.unwrap();

        assert_eq!(report.used_resource_ids, vec![11]);
        assert_eq!(report.exposed_resource_ids, vec![77]);
        assert_eq!(report.used[0].properties, vec!["url", "username"]);
        assert!(!report.used[0].has_secret);
        assert!(report.finished_at >= report.started_at);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["exposed"][0]["action"], "created");
        assert_eq!(json["used"][0]["type"], "datasource");
    }

    #[tokio::test]
    async fn test_missing_application_stops_pass() {
        let server = MockServer::start().await;
        mount_presence(&server, 404).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = client_for(&server);
        let err = SyncPass::new(&client, &config).run().await.unwrap_err();

        assert!(matches!(
            err,
            ResourceSyncError::Registration(RegistrationError::ApplicationMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_unresolved_dependency_skips_registration() {
        let server = MockServer::start().await;
        mount_presence(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = client_for(&server);
        let err = SyncPass::new(&client, &config).run().await.unwrap_err();

        match err {
            ResourceSyncError::Resolve(ResolveError::ResourceUnavailable { alias, status, .. }) => {
                assert_eq!(alias, "appdb");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
