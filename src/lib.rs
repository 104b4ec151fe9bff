// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![warn(dead_code)]                   // Unused code is flagged
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests unwrap freely.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # resource_sync
//!
//! Resolves an application's runtime dependencies against an
//! environment-scoped resource registry, and registers the capabilities the
//! application exposes back into it.
//!
//! ## Overview
//!
//! A deployment declares which resources it **uses** (data sources, REST
//! endpoints, certificates, application properties) and which it **exposes**
//! (REST services, web service endpoints). A sync pass:
//!
//! 1. Checks that the environment and application exist in the registry
//! 2. Resolves every used resource, materializing secrets and certificate files
//! 3. Creates or updates every exposed resource
//! 4. Registers the application instance with both id lists
//!
//! Resolution is all-or-nothing: the first missing or broken dependency
//! fails the pass.
//!
//! ## Modules
//!
//! - [`registry`]: Registry trait, HTTP client and wire types
//! - [`mapper`]: Registry record to internal resource mapping
//! - [`resolver`]: Batch resolution of used resources
//! - [`reconciler`]: Create-or-update of exposed resources
//! - [`payload`]: Outbound payload construction
//! - [`registrar`]: Application instance registration and presence checks
//! - [`sync`]: One full sync pass
//! - [`config`]: Configuration parsing and validation
//! - [`metrics`]: Registry traffic metrics
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! registry:
//!   url: https://registry.example.local
//! deployment:
//!   application: my-app
//!   environment: t1
//!   version: "1.0.3"
//!   zone: fss
//!   hostname: my-app.example.local
//! resources:
//!   used:
//!     - alias: my-app-db
//!       type: DataSource
//!   exposed:
//!     - alias: my-app-api
//!       type: RestService
//!       path: /api
//!       description: Public API
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod payload;
pub mod reconciler;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, SyncConfig};
pub use error::{ResourceSyncError, Result};
pub use mapper::ResourceMapper;
pub use metrics::{MetricsRecorder, NoopMetrics, PrometheusMetrics};
pub use payload::PayloadBuilder;
pub use reconciler::{LookupOutcome, ReconcileAction, ReconciledResource, Reconciler};
pub use registrar::InstanceRegistrar;
pub use registry::{Credentials, RegistryClient, ResourceRegistry};
pub use resolver::Resolver;
pub use resource::{
    DeploymentMetadata, ExposedResource, InternalResource, LookupScope, ResourceRequest,
};
pub use sync::{SyncPass, SyncReport};
