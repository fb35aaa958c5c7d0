//! Drill-down model builder
//!
//! Runs the top-level model builder(s) to "seed" a local model. Executes a
//! SELECT query against that model to obtain one parameter row per solution.
//! Runs the drill-down model builder(s) once per row, with the row's bindings
//! layered over the request parameters, and merges everything into the same
//! model.
//!
//! The orchestrator is itself resettable, so drill-downs nest.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{run_and_reset, run_model_builder, ModelBuilder, ResettableModelBuilder};
use crate::context::{derive_context, DistributorContext};
use crate::errors::{DistributorError, Result};
use crate::graph::{Graph, QueryExecutor, SparqlExecutor};

pub struct DrillDownModelBuilder {
    name: String,
    top_level_model_builders: Vec<Box<dyn ModelBuilder>>,
    drill_down_query: String,
    drill_down_model_builders: Vec<Box<dyn ResettableModelBuilder>>,
    executor: Arc<dyn QueryExecutor>,
    context: Option<Arc<dyn DistributorContext>>,
}

impl DrillDownModelBuilder {
    pub fn new(drill_down_query: impl Into<String>) -> Self {
        Self {
            name: "DrillDownModelBuilder".to_string(),
            top_level_model_builders: Vec::new(),
            drill_down_query: drill_down_query.into(),
            drill_down_model_builders: Vec::new(),
            executor: Arc::new(SparqlExecutor),
            context: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Top-level builders run in the order they are added
    pub fn add_top_level_model_builder(&mut self, builder: Box<dyn ModelBuilder>) {
        self.top_level_model_builders.push(builder);
    }

    /// Drill-down builders run in the order they are added, once per row
    pub fn add_drill_down_model_builder(&mut self, builder: Box<dyn ResettableModelBuilder>) {
        self.drill_down_model_builders.push(builder);
    }

    pub fn with_top_level_model_builder(mut self, builder: Box<dyn ModelBuilder>) -> Self {
        self.add_top_level_model_builder(builder);
        self
    }

    pub fn with_drill_down_model_builder(mut self, builder: Box<dyn ResettableModelBuilder>) -> Self {
        self.add_drill_down_model_builder(builder);
        self
    }

    pub fn drill_down_query(&self) -> &str {
        &self.drill_down_query
    }

    /// Check the required configuration: at least one builder of each kind
    /// and a drill-down query that is a valid SELECT.
    pub fn validate(&self) -> Result<()> {
        if self.top_level_model_builders.is_empty() {
            return Err(DistributorError::Configuration(format!(
                "{}: at least one topLevelModelBuilder is required",
                self.name
            )));
        }

        if self.drill_down_model_builders.is_empty() {
            return Err(DistributorError::Configuration(format!(
                "{}: at least one drillDownModelBuilder is required",
                self.name
            )));
        }

        validate_select_query(&self.name, &self.drill_down_query)
    }

    fn baseline(&self) -> Result<Arc<dyn DistributorContext>> {
        self.context.clone().ok_or_else(|| {
            DistributorError::Lifecycle(format!("{}: build_model called before init", self.name))
        })
    }
}

/// Fails unless `query` is a valid SPARQL SELECT. Checked by evaluating it
/// against an empty graph.
pub(crate) fn validate_select_query(owner: &str, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(DistributorError::Configuration(format!(
            "{}: a SELECT query is required",
            owner
        )));
    }

    SparqlExecutor
        .select(&Graph::new(), query)
        .map(|_| ())
        .map_err(|e| {
            DistributorError::Configuration(format!("{}: invalid SELECT query: {}", owner, e))
        })
}

impl ModelBuilder for DrillDownModelBuilder {
    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        self.context = Some(context);
        Ok(())
    }

    fn build_model(&mut self) -> Result<Graph> {
        let baseline = self.baseline()?;
        let cancel = baseline.cancel_token().clone();
        let mut model = Graph::new();

        for builder in self.top_level_model_builders.iter_mut() {
            cancel.check()?;
            model.merge(&run_model_builder(builder.as_mut(), Arc::clone(&baseline))?);
        }

        cancel.check()?;
        let rows = self.executor.select(&model, &self.drill_down_query)?;
        debug!(
            builder = %self.name,
            seeded = model.len(),
            rows = rows.len(),
            "drill-down parameters selected"
        );

        for row in &rows {
            let row_context = derive_context(&baseline, row);
            for builder in self.drill_down_model_builders.iter_mut() {
                cancel.check()?;
                model.merge(&run_and_reset(builder.as_mut(), Arc::clone(&row_context))?);
            }
        }

        info!(builder = %self.name, rows = rows.len(), triples = model.len(), "drill-down model built");
        Ok(model)
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ResettableModelBuilder for DrillDownModelBuilder {
    /// Resets every drill-down builder even if one fails. The first failure
    /// is returned once all have been tried.
    fn reset(&mut self) -> Result<()> {
        self.context = None;
        let mut first_failure = None;
        for builder in self.drill_down_model_builders.iter_mut() {
            if let Err(e) = builder.reset() {
                warn!(builder = %self.name, child = builder.name(), error = %e, "failed to reset drill-down builder");
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
