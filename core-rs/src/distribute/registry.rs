//! Action dispatch for data distributors
//!
//! Each action maps to a factory, so every request gets fresh distributor
//! and model builder instances and no builder state is shared between
//! concurrent requests.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use super::DataDistributor;
use crate::context::{AuthorizationRequest, DistributorContext};
use crate::errors::{DistributorError, Result};

pub type DistributorFactory = Box<dyn Fn() -> Result<Box<dyn DataDistributor>> + Send + Sync>;

#[derive(Default)]
pub struct DistributorRegistry {
    factories: BTreeMap<String, DistributorFactory>,
}

impl DistributorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Fails if the action is already taken.
    pub fn register<F>(&mut self, action_name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Result<Box<dyn DataDistributor>> + Send + Sync + 'static,
    {
        let action_name = action_name.into();
        if self.factories.contains_key(&action_name) {
            return Err(DistributorError::Configuration(format!(
                "Duplicate actionName: {}",
                action_name
            )));
        }
        self.factories.insert(action_name, Box::new(factory));
        Ok(())
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, action_name: &str) -> bool {
        self.factories.contains_key(action_name)
    }

    /// Serve one request for `action_name` into `output`.
    ///
    /// Checks authorization, then runs a fresh distributor through
    /// init -> write_output -> close. Close always runs; a close failure is
    /// logged and does not replace the request's own result. Returns the
    /// content type of what was written.
    pub fn serve(
        &self,
        action_name: &str,
        context: Arc<dyn DistributorContext>,
        output: &mut dyn Write,
    ) -> Result<String> {
        let request_id = Uuid::new_v4();
        let span = info_span!("distribute", action = action_name, %request_id);
        let _entered = span.enter();

        let factory = self
            .factories
            .get(action_name)
            .ok_or_else(|| DistributorError::UnknownAction(action_name.to_string()))?;

        if !context.is_authorized(&AuthorizationRequest::for_action(action_name)) {
            warn!("request not authorized");
            return Err(DistributorError::NotAuthorized(action_name.to_string()));
        }

        let mut distributor = factory()?;
        let result = distribute(distributor.as_mut(), context, output);
        if let Err(e) = distributor.close() {
            warn!(error = %e, "failed to close distributor");
        }

        match &result {
            Ok(content_type) => info!(%content_type, "request served"),
            Err(e) => warn!(error = %e, "request failed"),
        }
        result
    }
}

fn distribute(
    distributor: &mut dyn DataDistributor,
    context: Arc<dyn DistributorContext>,
    output: &mut dyn Write,
) -> Result<String> {
    distributor.init(context)?;
    let content_type = distributor.content_type().to_string();
    distributor.write_output(output)?;
    output.flush()?;
    Ok(content_type)
}

impl fmt::Debug for DistributorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributorRegistry")
            .field("actions", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
