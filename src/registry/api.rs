//! Registry trait definition.
//!
//! This module defines the interface the resolver, mapper, reconciler and
//! registrar use to talk to the resource registry.

use async_trait::async_trait;

use crate::error::RegistryError;

use super::types::{ApplicationInstancePayload, RawResource, ResourcePayload, ScopedQuery};

/// Raw operations exposed by the resource registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    /// Looks up a single resource by alias, type and scope.
    ///
    /// A 404 from the registry is reported as [`RegistryError::NotFound`].
    async fn scoped_lookup(&self, query: &ScopedQuery) -> Result<RawResource, RegistryError>;

    /// Creates a resource and returns its id.
    async fn create_resource(&self, payload: &ResourcePayload) -> Result<i64, RegistryError>;

    /// Updates the resource with the given id and returns the stored id.
    async fn update_resource(
        &self,
        id: i64,
        payload: &ResourcePayload,
    ) -> Result<i64, RegistryError>;

    /// Succeeds if the environment exists.
    async fn environment_exists(&self, environment: &str) -> Result<(), RegistryError>;

    /// Succeeds if the application exists.
    async fn application_exists(&self, application: &str) -> Result<(), RegistryError>;

    /// Fetches a secret value with the client's credentials.
    async fn fetch_secret(&self, reference: &str) -> Result<String, RegistryError>;

    /// Fetches a file without credentials.
    async fn fetch_file(&self, reference: &str) -> Result<Vec<u8>, RegistryError>;

    /// Registers an application instance.
    async fn create_application_instance(
        &self,
        payload: &ApplicationInstancePayload,
    ) -> Result<(), RegistryError>;
}
