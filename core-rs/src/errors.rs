//! Error types for the data distributor core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributorError {
    /// Malformed or missing configuration. Raised before any request is served.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Missing request parameter: {0}")]
    MissingParameter(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Model builder error: {0}")]
    Build(String),

    /// A builder or distributor was driven out of order (e.g. built before init).
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    RegexError(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl DistributorError {
    /// True for failures that belong to distributor setup rather than to a
    /// live request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DistributorError::Configuration(_)
                | DistributorError::Yaml(_)
                | DistributorError::RegexError(_)
        )
    }
}

impl From<regex::Error> for DistributorError {
    fn from(err: regex::Error) -> Self {
        DistributorError::RegexError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DistributorError>;
