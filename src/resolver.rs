//! Resolution of used resources.
//!
//! Every request is looked up in the registry and mapped. Resolution is
//! all-or-nothing: the first failure, not-found included, aborts the batch.

use tracing::{debug, info, warn};

use crate::error::{LookupError, ResolveError};
use crate::mapper::ResourceMapper;
use crate::metrics::{self, SharedMetrics};
use crate::registry::{ResourceRegistry, ScopedQuery};
use crate::resource::{InternalResource, LookupScope, ResourceRequest};

/// Builds the scoped lookup query for `request` within `scope`.
#[must_use]
pub fn scoped_query(request: &ResourceRequest, scope: &LookupScope) -> ScopedQuery {
    ScopedQuery {
        alias: request.alias.clone(),
        resource_type: request.resource_type.clone(),
        environment: scope.environment.clone(),
        application: scope.application.clone(),
        zone: scope.zone.clone(),
    }
}

/// Resolves used resources against the registry.
#[derive(Debug)]
pub struct Resolver<'a, R: ResourceRegistry + ?Sized> {
    /// Registry client.
    registry: &'a R,
    /// Metrics sink.
    metrics: SharedMetrics,
}

impl<'a, R: ResourceRegistry + ?Sized> Resolver<'a, R> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            metrics: metrics::noop(),
        }
    }

    /// Sets the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Resolves every request, in order.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first request that could not be resolved.
    /// No partial result is returned.
    pub async fn resolve(
        &self,
        requests: &[ResourceRequest],
        scope: &LookupScope,
    ) -> Result<Vec<InternalResource>, ResolveError> {
        info!(
            "Resolving {} resources for {} in {}",
            requests.len(),
            scope.application,
            scope.environment
        );

        let mut resources = Vec::with_capacity(requests.len());
        for request in requests {
            let resource = self.resolve_one(request, scope).await.map_err(|err| {
                warn!(
                    "Failed to resolve {} '{}': {err}",
                    request.resource_type, request.alias
                );
                ResolveError::ResourceUnavailable {
                    alias: request.alias.clone(),
                    resource_type: request.resource_type.clone(),
                    status: err.status_code(),
                    reason: err.to_string(),
                }
            })?;
            resources.push(resource);
        }

        Ok(resources)
    }

    /// Looks up and maps a single request.
    ///
    /// # Errors
    ///
    /// Returns the lookup failure, with not-found distinguishable through
    /// [`LookupError::is_not_found`].
    pub async fn resolve_one(
        &self,
        request: &ResourceRequest,
        scope: &LookupScope,
    ) -> Result<InternalResource, LookupError> {
        let raw = self
            .registry
            .scoped_lookup(&scoped_query(request, scope))
            .await?;

        let mut resource = ResourceMapper::new(self.registry)
            .with_metrics(self.metrics.clone())
            .map(raw)
            .await?;

        if resource.name.is_empty() {
            resource.name.clone_from(&request.alias);
        }
        if resource.resource_type.is_empty() {
            resource.resource_type.clone_from(&request.resource_type);
        }

        debug!(
            "Resolved {} '{}' (id {:?}, {} properties)",
            resource.resource_type,
            resource.name,
            resource.id,
            resource.properties.len()
        );
        Ok(resource)
    }
}

/// Registry ids of resolved resources, in order. Resources without an id are skipped.
#[must_use]
pub fn resource_ids(resources: &[InternalResource]) -> Vec<i64> {
    resources.iter().filter_map(|resource| resource.id).collect()
}
