//! Distributor set configuration
//!
//! YAML files declare named model builders and the distributors that serve
//! them. A validated set becomes a [`DistributorRegistry`](crate::distribute::DistributorRegistry).

pub mod distributor_set;
pub mod factory;

pub use distributor_set::{DistributorConfig, DistributorSetConfig, ModelBuilderConfig, API_VERSION, KIND};
