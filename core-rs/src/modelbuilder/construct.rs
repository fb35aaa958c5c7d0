//! Model builder that runs a SPARQL CONSTRUCT against a named request model.
//!
//! Request parameters are bound into the query text before execution:
//! `uri_bindings` become IRI terms, `literal_bindings` become plain literals.

use std::sync::Arc;
use tracing::debug;

use super::{ModelBuilder, ResettableModelBuilder};
use crate::context::DistributorContext;
use crate::errors::{DistributorError, Result};
use crate::graph::{Graph, QueryExecutor, SparqlExecutor, SparqlQuery};

pub struct ConstructQueryModelBuilder {
    name: String,
    model: String,
    query: String,
    uri_bindings: Vec<String>,
    literal_bindings: Vec<String>,
    executor: Arc<dyn QueryExecutor>,
    context: Option<Arc<dyn DistributorContext>>,
    bound_query: Option<SparqlQuery>,
}

impl ConstructQueryModelBuilder {
    pub fn new(model: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: "ConstructQueryModelBuilder".to_string(),
            model: model.into(),
            query: query.into(),
            uri_bindings: Vec::new(),
            literal_bindings: Vec::new(),
            executor: Arc::new(SparqlExecutor),
            context: None,
            bound_query: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_uri_binding(mut self, parameter: impl Into<String>) -> Self {
        self.uri_bindings.push(parameter.into());
        self
    }

    pub fn with_literal_binding(mut self, parameter: impl Into<String>) -> Self {
        self.literal_bindings.push(parameter.into());
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// The query must be a CONSTRUCT or DESCRIBE that the engine accepts
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(DistributorError::Configuration(format!(
                "{}: model is required",
                self.name
            )));
        }

        self.executor
            .construct(&Graph::new(), &self.query)
            .map(|_| ())
            .map_err(|e| {
                DistributorError::Configuration(format!("{}: invalid CONSTRUCT query: {}", self.name, e))
            })
    }

    fn bind_parameters(&self, context: &dyn DistributorContext) -> Result<SparqlQuery> {
        let mut query = SparqlQuery::new(self.query.clone());

        for name in &self.uri_bindings {
            let value = context
                .parameter(name)
                .ok_or_else(|| DistributorError::MissingParameter(name.clone()))?;
            query = query.bind_uri(name, value)?;
        }

        for name in &self.literal_bindings {
            let value = context
                .parameter(name)
                .ok_or_else(|| DistributorError::MissingParameter(name.clone()))?;
            query = query.bind_literal(name, value)?;
        }

        Ok(query)
    }
}

impl ModelBuilder for ConstructQueryModelBuilder {
    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        self.bound_query = Some(self.bind_parameters(context.as_ref())?);
        self.context = Some(context);
        Ok(())
    }

    fn build_model(&mut self) -> Result<Graph> {
        let (context, query) = match (&self.context, &self.bound_query) {
            (Some(context), Some(query)) => (context, query),
            _ => {
                return Err(DistributorError::Lifecycle(format!(
                    "{}: build_model called before init",
                    self.name
                )))
            }
        };

        let source = context.request_models().get(&self.model).ok_or_else(|| {
            DistributorError::Build(format!("{}: no request model named '{}'", self.name, self.model))
        })?;

        debug!(builder = %self.name, model = %self.model, "running construct query");
        self.executor.construct(source, query.as_str())
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ResettableModelBuilder for ConstructQueryModelBuilder {
    fn reset(&mut self) -> Result<()> {
        self.context = None;
        self.bound_query = None;
        Ok(())
    }
}
