//! Request contexts handed to distributors and model builders
//!
//! A context exposes the request parameters, the named request models, an
//! authorization check, and a cancellation token. `RequestContext` is the
//! baseline built per request; `DrillDownContext` layers drill-down bindings
//! over another context.

pub mod drill_down;

pub use drill_down::{derive_context, DrillDownContext};

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{DistributorError, Result};
use crate::graph::Graph;

/// Request parameter name to its ordered values
pub type RequestParameters = HashMap<String, Vec<String>>;

/// What a caller is asking permission to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub action: String,
    pub resource: Option<String>,
}

impl AuthorizationRequest {
    /// Permission to run the distributor registered for `action_name`
    pub fn for_action(action_name: &str) -> Self {
        Self {
            action: format!("distribute:{}", action_name),
            resource: None,
        }
    }
}

/// Authorization decision capability. The policy itself lives elsewhere.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, request: &AuthorizationRequest) -> bool;
}

/// Grants every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn is_authorized(&self, _request: &AuthorizationRequest) -> bool {
        true
    }
}

/// Denies every request
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn is_authorized(&self, _request: &AuthorizationRequest) -> bool {
        false
    }
}

/// Named RDF models visible to a request
#[derive(Debug, Clone, Default)]
pub struct ModelAccess {
    models: HashMap<String, Graph>,
}

impl ModelAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, name: impl Into<String>, graph: Graph) -> Self {
        self.insert(name, graph);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, graph: Graph) {
        self.models.insert(name.into(), graph);
    }

    pub fn get(&self, name: &str) -> Option<&Graph> {
        self.models.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the same flag, so a handle kept by the caller can cancel a
/// pipeline that is running with another clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail if the token was cancelled or its deadline has passed
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DistributorError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(DistributorError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Everything a distributor or model builder may ask of the request.
pub trait DistributorContext: Send + Sync {
    fn request_parameters(&self) -> &RequestParameters;

    fn request_models(&self) -> &ModelAccess;

    fn is_authorized(&self, request: &AuthorizationRequest) -> bool;

    fn cancel_token(&self) -> &CancelToken;

    /// First value of a request parameter, if any
    fn parameter(&self, name: &str) -> Option<&str> {
        self.request_parameters()
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Baseline context built once per incoming request
pub struct RequestContext {
    parameters: RequestParameters,
    models: Arc<ModelAccess>,
    authorizer: Arc<dyn Authorizer>,
    cancel: CancelToken,
}

impl RequestContext {
    pub fn new(models: Arc<ModelAccess>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            parameters: RequestParameters::new(),
            models,
            authorizer,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: RequestParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Append one value to a (possibly multi-valued) parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("parameters", &self.parameters)
            .field("models", &self.models.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DistributorContext for RequestContext {
    fn request_parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    fn request_models(&self) -> &ModelAccess {
        &self.models
    }

    fn is_authorized(&self, request: &AuthorizationRequest) -> bool {
        self.authorizer.is_authorized(request)
    }

    fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}
