//! Reconciler for exposed resources.
//!
//! Each exposed resource is looked up in the registry and then created or
//! updated so the registry matches the local declaration. A not-found lookup
//! means "needs creation"; any other lookup failure aborts the pass.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LookupError, ReconcileError};
use crate::metrics::{self, ErrorKind, SharedMetrics};
use crate::payload::PayloadBuilder;
use crate::registry::ResourceRegistry;
use crate::resolver::scoped_query;
use crate::resource::{ExposedResource, LookupScope};

/// Result of looking up an exposed resource before writing it.
#[derive(Debug)]
pub enum LookupOutcome {
    /// The resource exists; carries the id the registry reported, if any.
    Found(Option<i64>),
    /// The registry has no such resource.
    NotFound,
    /// The lookup failed for any other reason.
    Failed(LookupError),
}

impl LookupOutcome {
    /// Classifies the result of a scoped lookup.
    #[must_use]
    pub fn from_lookup<T>(result: Result<T, LookupError>, id: impl FnOnce(&T) -> Option<i64>) -> Self {
        match result {
            Ok(record) => Self::Found(id(&record)),
            Err(err) if err.is_not_found() => Self::NotFound,
            Err(err) => Self::Failed(err),
        }
    }
}

/// What the reconciler did to a single exposed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    /// The resource was created.
    Created,
    /// The existing resource was updated.
    Updated,
}

/// A reconciled exposed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledResource {
    /// Alias of the exposed resource.
    pub alias: String,
    /// Registry type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Registry id after the write.
    pub id: i64,
    /// Whether the resource was created or updated.
    pub action: ReconcileAction,
}

/// Reconciles exposed resources into the registry.
#[derive(Debug)]
pub struct Reconciler<'a, R: ResourceRegistry + ?Sized> {
    /// Registry client.
    registry: &'a R,
    /// Payload builder.
    payload_builder: PayloadBuilder,
    /// Metrics sink.
    metrics: SharedMetrics,
}

impl<'a, R: ResourceRegistry + ?Sized> Reconciler<'a, R> {
    /// Creates a reconciler with the default payload builder.
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            payload_builder: PayloadBuilder::new(),
            metrics: metrics::noop(),
        }
    }

    /// Sets the payload builder.
    #[must_use]
    pub fn with_payload_builder(mut self, payload_builder: PayloadBuilder) -> Self {
        self.payload_builder = payload_builder;
        self
    }

    /// Sets the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Reconciles every exposed resource and returns the registry ids, in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error on the first lookup, create or update failure.
    pub async fn reconcile(
        &self,
        exposed: &[ExposedResource],
        hostname: &str,
        scope: &LookupScope,
    ) -> Result<Vec<i64>, ReconcileError> {
        let reconciled = self.reconcile_detailed(exposed, hostname, scope).await?;
        Ok(reconciled.into_iter().map(|resource| resource.id).collect())
    }

    /// Like [`Reconciler::reconcile`], but also reports what was done to each resource.
    ///
    /// # Errors
    ///
    /// Returns an error on the first lookup, create or update failure.
    pub async fn reconcile_detailed(
        &self,
        exposed: &[ExposedResource],
        hostname: &str,
        scope: &LookupScope,
    ) -> Result<Vec<ReconciledResource>, ReconcileError> {
        info!(
            "Reconciling {} exposed resources for {} in {}",
            exposed.len(),
            scope.application,
            scope.environment
        );

        let mut reconciled = Vec::with_capacity(exposed.len());
        for resource in exposed {
            let outcome = self
                .reconcile_one(resource, hostname, scope)
                .await
                .inspect_err(|_| self.metrics.record_error(ErrorKind::Reconcile))?;
            reconciled.push(outcome);
        }

        let created = reconciled
            .iter()
            .filter(|r| r.action == ReconcileAction::Created)
            .count();
        info!(
            "Reconciled exposed resources: {created} created, {} updated",
            reconciled.len() - created
        );

        Ok(reconciled)
    }

    async fn reconcile_one(
        &self,
        resource: &ExposedResource,
        hostname: &str,
        scope: &LookupScope,
    ) -> Result<ReconciledResource, ReconcileError> {
        let outcome = self.lookup(resource, scope).await;

        let payload = self.payload_builder.build_resource_payload(
            resource,
            &scope.environment,
            scope.zone.as_deref(),
            hostname,
        );

        let (id, action) = match outcome {
            LookupOutcome::Failed(err) => {
                warn!(
                    "Lookup of {} '{}' failed: {err}",
                    resource.resource_type, resource.alias
                );
                return Err(ReconcileError::LookupFailed {
                    alias: resource.alias.clone(),
                    resource_type: resource.resource_type.clone(),
                    reason: err.to_string(),
                });
            }
            LookupOutcome::Found(None) => {
                return Err(ReconcileError::MissingResourceId {
                    alias: resource.alias.clone(),
                    resource_type: resource.resource_type.clone(),
                });
            }
            LookupOutcome::NotFound => {
                debug!(
                    "{} '{}' not in registry, creating",
                    resource.resource_type, resource.alias
                );
                let id = self
                    .registry
                    .create_resource(&payload)
                    .await
                    .map_err(|err| ReconcileError::CreateFailed {
                        alias: resource.alias.clone(),
                        resource_type: resource.resource_type.clone(),
                        path: resource.path.clone(),
                        reason: err.to_string(),
                    })?;
                (id, ReconcileAction::Created)
            }
            LookupOutcome::Found(Some(existing)) => {
                debug!(
                    "{} '{}' exists as {existing}, updating",
                    resource.resource_type, resource.alias
                );
                let id = self
                    .registry
                    .update_resource(existing, &payload)
                    .await
                    .map_err(|err| ReconcileError::UpdateFailed {
                        id: existing,
                        alias: resource.alias.clone(),
                        resource_type: resource.resource_type.clone(),
                        path: resource.path.clone(),
                        reason: err.to_string(),
                    })?;
                (id, ReconcileAction::Updated)
            }
        };

        info!(
            "{} {} '{}' ({id})",
            match action {
                ReconcileAction::Created => "Created",
                ReconcileAction::Updated => "Updated",
            },
            resource.resource_type,
            resource.alias
        );

        Ok(ReconciledResource {
            alias: resource.alias.clone(),
            resource_type: resource.resource_type.clone(),
            id,
            action,
        })
    }

    /// Looks up an exposed resource. Only the record's id is inspected.
    async fn lookup(&self, resource: &ExposedResource, scope: &LookupScope) -> LookupOutcome {
        let result = self
            .registry
            .scoped_lookup(&scoped_query(&resource.as_request(), scope))
            .await
            .map_err(LookupError::from);

        LookupOutcome::from_lookup(result, |raw| raw.id)
    }
}
