//! Data distributors
//!
//! A distributor serves the content for one configured action:
//! - RdfGraphDistributor: runs a model builder and serializes the graph
//! - SelectFromGraphDistributor: runs a model builder, then a SELECT, as JSON
//! - PatternMatchingFileDistributor: streams a file chosen by a request parameter
//!
//! DistributorRegistry maps action names to fresh distributor instances.

pub mod file;
pub mod graph;
pub mod registry;
pub mod select;

pub use file::{FileFinder, PatternMatchingFileDistributor};
pub use graph::RdfGraphDistributor;
pub use registry::{DistributorFactory, DistributorRegistry};
pub use select::SelectFromGraphDistributor;

use std::io::Write;
use std::sync::Arc;

use crate::context::DistributorContext;
use crate::errors::Result;

pub trait DataDistributor: Send {
    fn action_name(&self) -> &str;

    /// Capture the request context. Called once, before `write_output`.
    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()>;

    fn content_type(&self) -> &str;

    fn write_output(&mut self, output: &mut dyn Write) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
