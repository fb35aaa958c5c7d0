//! Model builders
//!
//! A model builder produces an RDF graph for a request context. Lifecycle:
//! `init` -> `build_model` -> `close`. A plain builder is used once per
//! `init`; a resettable builder may be `reset` and run again.
//!
//! - drill_down: two-phase seed-then-drill-down orchestrator
//! - construct: SPARQL CONSTRUCT over a named request model

pub mod construct;
pub mod drill_down;

pub use construct::ConstructQueryModelBuilder;
pub use drill_down::DrillDownModelBuilder;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::DistributorContext;
use crate::errors::Result;
use crate::graph::Graph;

pub trait ModelBuilder: Send {
    /// Capture what the builder needs from the request context
    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()>;

    /// Produce the graph. Only valid after `init`.
    fn build_model(&mut self) -> Result<Graph>;

    /// Release whatever `init` acquired
    fn close(&mut self) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// A builder that can be returned to a clean state and run again.
///
/// After `reset`, an `init` + `build_model` cycle behaves like the first use.
pub trait ResettableModelBuilder: ModelBuilder {
    fn reset(&mut self) -> Result<()>;
}

/// An initialized builder that is closed when the session is dropped.
///
/// The session exists before `init` runs, so a builder whose `init` fails is
/// still closed. Close failures are logged and swallowed.
pub struct BuilderSession<'a, B: ModelBuilder + ?Sized> {
    builder: &'a mut B,
}

impl<'a, B: ModelBuilder + ?Sized> BuilderSession<'a, B> {
    pub fn open(builder: &'a mut B, context: Arc<dyn DistributorContext>) -> Result<Self> {
        let session = Self { builder };
        session.builder.init(context)?;
        Ok(session)
    }

    pub fn build(&mut self) -> Result<Graph> {
        self.builder.build_model()
    }
}

impl<B: ModelBuilder + ?Sized> Drop for BuilderSession<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.builder.close() {
            warn!(builder = self.builder.name(), error = %e, "failed to close model builder");
        }
    }
}

/// init -> build -> close, with close guaranteed on every exit path
pub fn run_model_builder<B: ModelBuilder + ?Sized>(
    builder: &mut B,
    context: Arc<dyn DistributorContext>,
) -> Result<Graph> {
    let mut session = BuilderSession::open(builder, context)?;
    let model = session.build()?;
    debug!(builder = session.builder.name(), triples = model.len(), "model built");
    Ok(model)
}

/// Run a resettable builder, then reset it whether or not the run succeeded.
/// Reset failures are logged; the run's own result is returned.
pub fn run_and_reset<B: ResettableModelBuilder + ?Sized>(
    builder: &mut B,
    context: Arc<dyn DistributorContext>,
) -> Result<Graph> {
    let result = run_model_builder(builder, context);
    if let Err(e) = builder.reset() {
        warn!(builder = builder.name(), error = %e, "failed to reset model builder");
    }
    result
}
