//! Serializes the graph produced by one model builder.

use oxigraph::io::RdfFormat;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use super::DataDistributor;
use crate::context::DistributorContext;
use crate::errors::{DistributorError, Result};
use crate::modelbuilder::{run_model_builder, ModelBuilder};

pub const DEFAULT_RDF_CONTENT_TYPE: &str = "text/turtle";

pub struct RdfGraphDistributor {
    action_name: String,
    content_type: String,
    format: RdfFormat,
    model_builder: Box<dyn ModelBuilder>,
    context: Option<Arc<dyn DistributorContext>>,
}

impl RdfGraphDistributor {
    pub fn new(action_name: impl Into<String>, model_builder: Box<dyn ModelBuilder>) -> Self {
        Self {
            action_name: action_name.into(),
            content_type: DEFAULT_RDF_CONTENT_TYPE.to_string(),
            format: RdfFormat::Turtle,
            model_builder,
            context: None,
        }
    }

    /// Select the serialization by media type, e.g. `application/n-triples`
    pub fn with_content_type(mut self, content_type: &str) -> Result<Self> {
        self.format = rdf_format_for(content_type)?;
        self.content_type = content_type.to_string();
        Ok(self)
    }
}

/// The RDF serialization matching a media type
pub fn rdf_format_for(content_type: &str) -> Result<RdfFormat> {
    RdfFormat::from_media_type(content_type).ok_or_else(|| {
        DistributorError::Configuration(format!(
            "Content type '{}' is not an RDF serialization",
            content_type
        ))
    })
}

impl DataDistributor for RdfGraphDistributor {
    fn action_name(&self) -> &str {
        &self.action_name
    }

    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        self.context = Some(context);
        Ok(())
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn write_output(&mut self, output: &mut dyn Write) -> Result<()> {
        let context = self.context.clone().ok_or_else(|| {
            DistributorError::Lifecycle(format!("{}: write_output called before init", self.action_name))
        })?;

        let model = run_model_builder(self.model_builder.as_mut(), context)?;
        debug!(action = %self.action_name, triples = model.len(), "serializing model");
        model.write_to(self.format, output)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }
}
