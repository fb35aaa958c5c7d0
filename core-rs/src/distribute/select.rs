//! Runs a model builder, then a SELECT over its graph, and writes the rows
//! as a JSON array of `{variable: value}` objects.

use std::io::Write;
use std::sync::Arc;

use super::DataDistributor;
use crate::context::DistributorContext;
use crate::errors::{DistributorError, Result};
use crate::graph::{QueryExecutor, SparqlExecutor};
use crate::modelbuilder::{run_model_builder, ModelBuilder};

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub struct SelectFromGraphDistributor {
    action_name: String,
    query: String,
    model_builder: Box<dyn ModelBuilder>,
    executor: Arc<dyn QueryExecutor>,
    context: Option<Arc<dyn DistributorContext>>,
}

impl SelectFromGraphDistributor {
    pub fn new(
        action_name: impl Into<String>,
        model_builder: Box<dyn ModelBuilder>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            query: query.into(),
            model_builder,
            executor: Arc::new(SparqlExecutor),
            context: None,
        }
    }
}

impl DataDistributor for SelectFromGraphDistributor {
    fn action_name(&self) -> &str {
        &self.action_name
    }

    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        self.context = Some(context);
        Ok(())
    }

    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn write_output(&mut self, output: &mut dyn Write) -> Result<()> {
        let context = self.context.clone().ok_or_else(|| {
            DistributorError::Lifecycle(format!("{}: write_output called before init", self.action_name))
        })?;

        let model = run_model_builder(self.model_builder.as_mut(), context)?;
        let rows = self.executor.select(&model, &self.query)?;
        serde_json::to_writer(output, &rows)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }
}
