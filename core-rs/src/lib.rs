//! # Datadist Core - RDF Data Distribution Runtime
//!
//! Serves request-scoped RDF content through named actions. Each action is a
//! data distributor; most distributors run a model builder to assemble the
//! graph they serialize.
//!
//! ## Core Principle
//!
//! **Seed, then drill down**: a drill-down model builder runs its top-level
//! builders to seed a local model, selects parameter rows from that model,
//! and runs its drill-down builders once per row with the row's bindings
//! layered over the request.
//!
//! ## Key Features
//!
//! - Model builder lifecycle with guaranteed close and per-row reset
//! - Context layering for drill-down bindings
//! - Pattern-matching file distribution with an empty-response fallback
//! - YAML distributor sets validated before anything is served
//! - Cooperative cancellation and deadlines
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   DistributorRegistry (per action)  │
//! └─────────────────────────────────────┘
//!           │               │
//!     ┌─────┴───────┐   ┌──┴────────────┐
//!     │ RdfGraph /  │   │ PatternMatch- │
//!     │ Select      │   │ ingFile       │
//!     └─────┬───────┘   └───────────────┘
//!           │
//!     ┌─────┴───────────────────────┐
//!     │ DrillDownModelBuilder       │
//!     │  top-level -> SELECT -> rows│
//!     └─────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod distribute;
pub mod errors;
pub mod graph;
pub mod modelbuilder;

pub use config::{DistributorConfig, DistributorSetConfig, ModelBuilderConfig};
pub use context::{
    derive_context, AllowAll, AuthorizationRequest, Authorizer, CancelToken, DenyAll, DistributorContext,
    DrillDownContext, ModelAccess, RequestContext, RequestParameters,
};
pub use distribute::{
    DataDistributor, DistributorRegistry, FileFinder, PatternMatchingFileDistributor, RdfGraphDistributor,
    SelectFromGraphDistributor,
};
pub use errors::{DistributorError, Result};
pub use graph::{BindingRow, Graph, QueryExecutor, SparqlExecutor, SparqlQuery};
pub use modelbuilder::{
    run_and_reset, run_model_builder, BuilderSession, ConstructQueryModelBuilder, DrillDownModelBuilder,
    ModelBuilder, ResettableModelBuilder,
};

/// Version of the distributor set format this runtime reads
pub const VERSION: &str = "0.4.2";
