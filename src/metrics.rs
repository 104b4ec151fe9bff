//! Metrics recording for registry traffic.
//!
//! Components never reach for process-wide counters; they receive a
//! [`MetricsRecorder`] and report through it. [`NoopMetrics`] is the default,
//! [`PrometheusMetrics`] registers counters on a caller-owned registry.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::error::{ResourceSyncError, Result};

/// Category of a failure, used as the `kind` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A request or payload could not be built.
    Request,
    /// The registry could not be reached.
    Transport,
    /// The response body could not be read.
    ReadBody,
    /// The registry answered with a non-success status.
    RegistryStatus,
    /// The response body could not be decoded.
    Decode,
    /// A secret could not be resolved.
    Secret,
    /// A certificate file could not be resolved.
    File,
    /// A record could not be mapped.
    Mapping,
    /// An exposed resource could not be reconciled.
    Reconcile,
}

impl ErrorKind {
    /// Label value for this kind.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Request => "create_request",
            Self::Transport => "contact_registry",
            Self::ReadBody => "read_body",
            Self::RegistryStatus => "registry_status",
            Self::Decode => "decode_body",
            Self::Secret => "resolve_secret",
            Self::File => "resolve_file",
            Self::Mapping => "mapping",
            Self::Reconcile => "reconcile",
        }
    }
}

/// Capability for recording registry traffic and failures.
pub trait MetricsRecorder: Send + Sync + std::fmt::Debug {
    /// Records that an operation was started against the registry.
    fn record_request(&self, operation: &str);

    /// Records an HTTP response by method and status code.
    fn record_response(&self, method: &str, status: u16);

    /// Records a failure of the given kind.
    fn record_error(&self, kind: ErrorKind);
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn record_request(&self, _operation: &str) {}

    fn record_response(&self, _method: &str, _status: u16) {}

    fn record_error(&self, _kind: ErrorKind) {}
}

/// Shared handle to a recorder.
pub type SharedMetrics = Arc<dyn MetricsRecorder>;

/// Returns a shared no-op recorder.
#[must_use]
pub fn noop() -> SharedMetrics {
    Arc::new(NoopMetrics)
}

/// Prometheus-backed recorder.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    requests_total: IntCounter,
    operations_total: IntCounterVec,
    responses_total: IntCounterVec,
    errors_total: IntCounterVec,
}

impl PrometheusMetrics {
    /// Creates the counters and registers them on `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a counter cannot be created or is already registered.
    pub fn new(registry: Registry) -> Result<Self> {
        let requests_total = IntCounter::with_opts(Opts::new(
            "registry_requests_total",
            "Operations started against the resource registry",
        ))
        .map_err(prometheus_error)?;

        let operations_total = IntCounterVec::new(
            Opts::new(
                "registry_operations_total",
                "Operations started against the resource registry, by operation",
            ),
            &["operation"],
        )
        .map_err(prometheus_error)?;

        let responses_total = IntCounterVec::new(
            Opts::new(
                "registry_http_responses_total",
                "HTTP responses from the resource registry, by status code and method",
            ),
            &["code", "method"],
        )
        .map_err(prometheus_error)?;

        let errors_total = IntCounterVec::new(
            Opts::new("registry_errors_total", "Failures while talking to the registry"),
            &["kind"],
        )
        .map_err(prometheus_error)?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(prometheus_error)?;
        registry
            .register(Box::new(operations_total.clone()))
            .map_err(prometheus_error)?;
        registry
            .register(Box::new(responses_total.clone()))
            .map_err(prometheus_error)?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(prometheus_error)?;

        Ok(Self {
            registry,
            requests_total,
            operations_total,
            responses_total,
            errors_total,
        })
    }

    /// Total operations recorded so far.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests_total.get()
    }

    /// Errors recorded so far for `kind`.
    #[must_use]
    pub fn errors(&self, kind: ErrorKind) -> u64 {
        self.errors_total.with_label_values(&[kind.as_label()]).get()
    }

    /// Responses recorded so far for `method` and `status`.
    #[must_use]
    pub fn responses(&self, method: &str, status: u16) -> u64 {
        let code = status.to_string();
        self.responses_total
            .with_label_values(&[code.as_str(), method])
            .get()
    }

    /// Renders all registered metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(prometheus_error)?;
        String::from_utf8(buffer)
            .map_err(|e| ResourceSyncError::internal(format!("Metrics output is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics")
            .field("requests_total", &self.requests_total.get())
            .finish_non_exhaustive()
    }
}

impl MetricsRecorder for PrometheusMetrics {
    fn record_request(&self, operation: &str) {
        self.requests_total.inc();
        self.operations_total.with_label_values(&[operation]).inc();
    }

    fn record_response(&self, method: &str, status: u16) {
        let code = status.to_string();
        self.responses_total
            .with_label_values(&[code.as_str(), method])
            .inc();
    }

    fn record_error(&self, kind: ErrorKind) {
        self.errors_total.with_label_values(&[kind.as_label()]).inc();
    }
}

fn prometheus_error(err: prometheus::Error) -> ResourceSyncError {
    ResourceSyncError::internal(format!("Metrics error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_counts() {
        let metrics = PrometheusMetrics::new(Registry::new()).unwrap();

        metrics.record_request("scoped_lookup");
        metrics.record_request("create_resource");
        metrics.record_response("GET", 404);
        metrics.record_error(ErrorKind::RegistryStatus);

        assert_eq!(metrics.requests(), 2);
        assert_eq!(metrics.responses("GET", 404), 1);
        assert_eq!(metrics.errors(ErrorKind::RegistryStatus), 1);
        assert_eq!(metrics.errors(ErrorKind::Secret), 0);

        let text = metrics.render().unwrap();
        assert!(text.contains("registry_requests_total 2"));
        assert!(text.contains("registry_errors_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        assert!(PrometheusMetrics::new(registry.clone()).is_ok());
        assert!(PrometheusMetrics::new(registry).is_err());
    }
}
