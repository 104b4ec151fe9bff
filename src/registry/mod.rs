//! Resource registry integration module.
//!
//! This module provides the raw HTTP surface of the resource registry: the
//! [`ResourceRegistry`] trait, its reqwest-backed implementation and the wire
//! types exchanged with it.

mod api;
mod client;
mod types;

pub use api::ResourceRegistry;
#[cfg(test)]
pub use api::MockResourceRegistry;
pub use client::{build_http_client, Credentials, RegistryClient, DEFAULT_TIMEOUT_SECS};
pub use types::{
    ApplicationInstancePayload, CreatedResource, RawResource, ResourcePayload, Scope,
    ScopedQuery, SecretReference,
};
