//! Layered context used for each drill-down row
//!
//! Starts from a baseline context and adds the row's bindings as
//! single-valued request parameters. A binding overrides a baseline
//! parameter of the same name. Everything else is forwarded to the baseline.

use std::fmt;
use std::sync::Arc;

use super::{AuthorizationRequest, CancelToken, DistributorContext, ModelAccess, RequestParameters};
use crate::graph::BindingRow;

pub struct DrillDownContext {
    baseline: Arc<dyn DistributorContext>,
    parameters: RequestParameters,
}

impl DrillDownContext {
    pub fn new(baseline: Arc<dyn DistributorContext>, bindings: &BindingRow) -> Self {
        let mut parameters = baseline.request_parameters().clone();
        for (name, value) in bindings {
            parameters.insert(name.clone(), vec![value.clone()]);
        }

        Self {
            baseline,
            parameters,
        }
    }
}

/// Derive the context for one drill-down row. The baseline is left untouched.
pub fn derive_context(
    baseline: &Arc<dyn DistributorContext>,
    bindings: &BindingRow,
) -> Arc<dyn DistributorContext> {
    Arc::new(DrillDownContext::new(Arc::clone(baseline), bindings))
}

impl fmt::Debug for DrillDownContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrillDownContext")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl DistributorContext for DrillDownContext {
    fn request_parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    fn request_models(&self) -> &ModelAccess {
        self.baseline.request_models()
    }

    fn is_authorized(&self, request: &AuthorizationRequest) -> bool {
        self.baseline.is_authorized(request)
    }

    fn cancel_token(&self) -> &CancelToken {
        self.baseline.cancel_token()
    }
}
