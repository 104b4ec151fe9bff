//! Resource registry client implementation.
//!
//! This module provides the HTTP client for the registry's REST surface. It
//! builds and executes requests and classifies responses; it holds no
//! business logic.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{RegistryError, ResourceSyncError, Result};
use crate::metrics::{self, ErrorKind, SharedMetrics};

use super::api::ResourceRegistry;
use super::types::{
    ApplicationInstancePayload, CreatedResource, RawResource, ResourcePayload, ScopedQuery,
};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SCOPED_RESOURCE_PATH: &str = "/api/v2/scopedresource";
const RESOURCES_PATH: &str = "/api/v2/resources";
const ENVIRONMENTS_PATH: &str = "/api/v2/environments";
const APPLICATIONS_PATH: &str = "/api/v2/applications";
const APPLICATION_INSTANCES_PATH: &str = "/api/v2/applicationinstances/";

/// Builds the HTTP client shared by every registry call of a pass.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| {
            ResourceSyncError::Registry(RegistryError::transport(format!(
                "Failed to create HTTP client: {e}"
            )))
        })
}

/// Registry credentials used for HTTP Basic authentication.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resource registry API client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// HTTP client, owned by the caller and reused across calls.
    http: Client,
    /// Registry base URL without trailing slash.
    base_url: String,
    /// Credentials for secret and write calls.
    credentials: Credentials,
    /// Metrics sink.
    metrics: SharedMetrics,
}

impl RegistryClient {
    /// Creates a client for the registry at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, credentials: Credentials, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            metrics: metrics::noop(),
        }
    }

    /// Sets the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registry base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Builds `<base><collection>/<segment>` with `segment` percent-encoded.
    fn segment_url(
        &self,
        collection: &str,
        segment: &str,
    ) -> std::result::Result<Url, RegistryError> {
        let invalid = |message: String| {
            self.metrics.record_error(ErrorKind::Request);
            RegistryError::InvalidRequest { message }
        };

        let mut url = Url::parse(&self.url(collection))
            .map_err(|e| invalid(format!("Invalid registry URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("Registry URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// Sends a request and records the response status.
    async fn send(
        &self,
        method: &'static str,
        request: RequestBuilder,
        target: &str,
    ) -> std::result::Result<Response, RegistryError> {
        trace!("{method} {target}");

        let response = request.send().await.map_err(|e| {
            self.metrics.record_error(ErrorKind::Transport);
            RegistryError::transport(format!("{method} {target} failed: {e}"))
        })?;

        self.metrics
            .record_response(method, response.status().as_u16());
        Ok(response)
    }

    /// Fails unless `accept` holds for the response status.
    ///
    /// 404 maps to [`RegistryError::NotFound`]; anything else carries the body.
    async fn check_status(
        &self,
        response: Response,
        target: &str,
        accept: fn(StatusCode) -> bool,
    ) -> std::result::Result<Response, RegistryError> {
        let status = response.status();
        if accept(status) {
            return Ok(response);
        }

        self.metrics.record_error(ErrorKind::RegistryStatus);

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound {
                resource: target.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::api(status.as_u16(), body))
    }

    async fn read_text(&self, response: Response) -> std::result::Result<String, RegistryError> {
        response.text().await.map_err(|e| {
            self.metrics.record_error(ErrorKind::ReadBody);
            RegistryError::transport(format!("Could not read body: {e}"))
        })
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> std::result::Result<T, RegistryError> {
        let body = self.read_text(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            self.metrics.record_error(ErrorKind::Decode);
            RegistryError::InvalidResponse {
                message: format!("Could not unmarshal registry response: {e}"),
            }
        })
    }

    fn encode<T: serde::Serialize>(&self, payload: &T) -> std::result::Result<Vec<u8>, RegistryError> {
        serde_json::to_vec(payload).map_err(|e| {
            self.metrics.record_error(ErrorKind::Request);
            RegistryError::InvalidRequest {
                message: format!("Unable to create payload ({e})"),
            }
        })
    }

    /// Sends a resource payload with `method` and returns the stored id.
    async fn store_resource(
        &self,
        method: &'static str,
        request: RequestBuilder,
        payload: &ResourcePayload,
    ) -> std::result::Result<i64, RegistryError> {
        let body = self.encode(payload)?;
        let request = self
            .authenticated(request)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);

        let target = format!("{} '{}'", payload.resource_type, payload.alias);
        let response = self.send(method, request, &target).await?;
        let response = self
            .check_status(response, &target, |s| s.is_success())
            .await?;
        let created: CreatedResource = self.read_json(response).await?;

        debug!("{method} stored {target} as {}", created.id);
        Ok(created.id)
    }

    /// Succeeds only on a 200 response from `url`.
    async fn presence_check(
        &self,
        url: Url,
        target: &str,
    ) -> std::result::Result<(), RegistryError> {
        let response = self.send("GET", self.http.get(url), target).await?;
        self.check_status(response, target, |s| s == StatusCode::OK)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ResourceRegistry for RegistryClient {
    async fn scoped_lookup(
        &self,
        query: &ScopedQuery,
    ) -> std::result::Result<RawResource, RegistryError> {
        self.metrics.record_request("scoped_lookup");

        let request = self
            .http
            .get(self.url(SCOPED_RESOURCE_PATH))
            .query(&query.pairs());

        let target = format!("{} '{}'", query.resource_type, query.alias);
        let response = self.send("GET", request, &target).await?;
        let response = self
            .check_status(response, &target, |s| s.is_success())
            .await?;
        self.read_json(response).await
    }

    async fn create_resource(
        &self,
        payload: &ResourcePayload,
    ) -> std::result::Result<i64, RegistryError> {
        self.metrics.record_request("create_resource");
        let request = self.http.post(self.url(&format!("{RESOURCES_PATH}/")));
        self.store_resource("POST", request, payload).await
    }

    async fn update_resource(
        &self,
        id: i64,
        payload: &ResourcePayload,
    ) -> std::result::Result<i64, RegistryError> {
        self.metrics.record_request("update_resource");
        let request = self.http.put(self.url(&format!("{RESOURCES_PATH}/{id}")));
        self.store_resource("PUT", request, payload).await
    }

    async fn environment_exists(&self, environment: &str) -> std::result::Result<(), RegistryError> {
        self.metrics.record_request("environment_exists");
        let url = self.segment_url(ENVIRONMENTS_PATH, environment)?;
        self.presence_check(url, &format!("environment {environment}"))
            .await
    }

    async fn application_exists(&self, application: &str) -> std::result::Result<(), RegistryError> {
        self.metrics.record_request("application_exists");
        let url = self.segment_url(APPLICATIONS_PATH, application)?;
        self.presence_check(url, &format!("application {application}"))
            .await
    }

    async fn fetch_secret(&self, reference: &str) -> std::result::Result<String, RegistryError> {
        self.metrics.record_request("fetch_secret");

        let request = self.authenticated(self.http.get(reference));
        let response = self.send("GET", request, "secret").await?;
        let response = self
            .check_status(response, "secret", |s| s.is_success())
            .await?;
        self.read_text(response).await
    }

    async fn fetch_file(&self, reference: &str) -> std::result::Result<Vec<u8>, RegistryError> {
        self.metrics.record_request("fetch_file");

        let response = self.send("GET", self.http.get(reference), reference).await?;
        let response = self
            .check_status(response, reference, |s| s.is_success())
            .await?;
        let bytes = response.bytes().await.map_err(|e| {
            self.metrics.record_error(ErrorKind::ReadBody);
            RegistryError::transport(format!("Error downloading file: {e}"))
        })?;
        Ok(bytes.to_vec())
    }

    async fn create_application_instance(
        &self,
        payload: &ApplicationInstancePayload,
    ) -> std::result::Result<(), RegistryError> {
        self.metrics.record_request("create_application_instance");

        let body = self.encode(payload)?;
        let request = self
            .authenticated(self.http.post(self.url(APPLICATION_INSTANCES_PATH)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);

        let target = format!("application instance {}", payload.application);
        let response = self.send("POST", request, &target).await?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        // Every rejection, 404 included, keeps the registry's body.
        self.metrics.record_error(ErrorKind::RegistryStatus);
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::api(status.as_u16(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PrometheusMetrics;
    use crate::registry::types::Scope;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RegistryClient {
        RegistryClient::new(
            &server.uri(),
            Credentials::new("deployer", "hunter2"),
            build_http_client(5).unwrap(),
        )
    }

    fn query(zone: Option<&str>) -> ScopedQuery {
        ScopedQuery {
            alias: String::from("alias1"),
            resource_type: String::from("datasource"),
            environment: String::from("environment"),
            application: String::from("application"),
            zone: zone.map(String::from),
        }
    }

    fn rest_payload() -> ResourcePayload {
        ResourcePayload {
            alias: String::from("api"),
            resource_type: String::from("RestService"),
            properties: BTreeMap::from([
                (String::from("url"), String::from("https://app.local/api")),
                (String::from("description"), String::from("desc")),
            ]),
            scope: Scope {
                environment: String::from("t1"),
                zone: Some(String::from("fss")),
            },
        }
    }

    #[tokio::test]
    async fn test_scoped_lookup_sends_all_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .and(query_param("alias", "alias1"))
            .and(query_param("type", "datasource"))
            .and(query_param("environment", "environment"))
            .and(query_param("application", "application"))
            .and(query_param("zone", "zone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "alias": "alias1",
                "type": "datasource",
                "properties": {"url": "jdbc:oracle:thin:@//db.local:1521/app", "username": "app"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let raw = client_for(&server)
            .scoped_lookup(&query(Some("zone")))
            .await
            .unwrap();

        assert_eq!(raw.id, Some(42));
        assert_eq!(raw.alias, "alias1");
        assert_eq!(raw.properties["username"], "app");
    }

    #[tokio::test]
    async fn test_scoped_lookup_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .scoped_lookup(&query(None))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_scoped_lookup_server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .scoped_lookup(&query(None))
            .await
            .unwrap_err();

        match err {
            RegistryError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_scoped_lookup_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/scopedresource"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .scoped_lookup(&query(None))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_create_and_update_resource() {
        let server = MockServer::start().await;
        let expected_body = serde_json::json!({
            "alias": "api",
            "type": "RestService",
            "properties": {"url": "https://app.local/api", "description": "desc"},
            "scope": {"environment": "t1", "zone": "fss"}
        });

        Mock::given(method("POST"))
            .and(path("/api/v2/resources/"))
            .and(basic_auth("deployer", "hunter2"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 7})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/api/v2/resources/7"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.create_resource(&rest_payload()).await.unwrap(), 7);
        assert_eq!(client.update_resource(7, &rest_payload()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_create_resource_rejected_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/resources/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("alias already taken"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_resource(&rest_payload())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Registry returned: alias already taken (400)");
    }

    #[tokio::test]
    async fn test_presence_checks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/environments/t1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.environment_exists("t1").await.is_ok());
        assert!(matches!(
            client.application_exists("ghost").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_secret_uses_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/secrets/696969"))
            .and(basic_auth("deployer", "hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hemmelig"))
            .expect(1)
            .mount(&server)
            .await;

        let secret = client_for(&server)
            .fetch_secret(&format!("{}/api/v2/secrets/696969", server.uri()))
            .await
            .unwrap();

        assert_eq!(secret, "hemmelig");
    }

    #[tokio::test]
    async fn test_fetch_file_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/resources/3024713/file/keystore"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8, 159, 146, 150]))
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .fetch_file(&format!(
                "{}/api/v2/resources/3024713/file/keystore",
                server.uri()
            ))
            .await
            .unwrap();

        assert_eq!(bytes, vec![0_u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_application_instance_requires_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created elsewhere"))
            .mount(&server)
            .await;

        let payload = ApplicationInstancePayload {
            application: String::from("app"),
            environment: String::from("t1"),
            version: String::from("1.0"),
            exposed_resource_ids: vec![1],
            used_resource_ids: vec![2],
        };

        let err = client_for(&server)
            .create_application_instance(&payload)
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::Api { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_application_instance_not_found_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationinstances/"))
            .and(basic_auth("deployer", "hunter2"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such application 'app'"))
            .mount(&server)
            .await;

        let payload = ApplicationInstancePayload {
            application: String::from("app"),
            environment: String::from("t1"),
            version: String::from("1.0"),
            exposed_resource_ids: vec![],
            used_resource_ids: vec![],
        };

        let err = client_for(&server)
            .create_application_instance(&payload)
            .await
            .unwrap_err();

        match err {
            RegistryError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such application 'app'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_presence_check_names_are_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/environments/q1%2Fq2%3Fx=1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/my%20app"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.environment_exists("q1/q2?x=1").await.unwrap();
        client.application_exists("my app").await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_failure_is_counted() {
        let metrics = Arc::new(PrometheusMetrics::new(prometheus::Registry::new()).unwrap());
        let client = RegistryClient::new(
            "http://127.0.0.1:9",
            Credentials::default(),
            build_http_client(2).unwrap(),
        )
        .with_metrics(metrics.clone());

        let err = client.scoped_lookup(&query(None)).await.unwrap_err();

        assert!(matches!(err, RegistryError::Transport { .. }));
        assert_eq!(metrics.requests(), 1);
        assert_eq!(metrics.errors(ErrorKind::Transport), 1);
    }
}
