//! Instantiates model builders and distributors from a validated
//! distributor set. Every call produces fresh instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::distributor_set::{DistributorConfig, DistributorSetConfig, ModelBuilderConfig};
use crate::distribute::{
    DataDistributor, DistributorRegistry, PatternMatchingFileDistributor, RdfGraphDistributor,
    SelectFromGraphDistributor,
};
use crate::errors::{DistributorError, Result};
use crate::modelbuilder::{
    ConstructQueryModelBuilder, DrillDownModelBuilder, ModelBuilder, ResettableModelBuilder,
};

/// A concrete builder, boxed as whichever role it is placed in
enum ConfiguredBuilder {
    DrillDown(DrillDownModelBuilder),
    Construct(ConstructQueryModelBuilder),
}

impl ConfiguredBuilder {
    fn into_plain(self) -> Box<dyn ModelBuilder> {
        match self {
            ConfiguredBuilder::DrillDown(b) => Box::new(b),
            ConfiguredBuilder::Construct(b) => Box::new(b),
        }
    }

    fn into_resettable(self) -> Box<dyn ResettableModelBuilder> {
        match self {
            ConfiguredBuilder::DrillDown(b) => Box::new(b),
            ConfiguredBuilder::Construct(b) => Box::new(b),
        }
    }
}

impl DistributorSetConfig {
    /// Build a fresh instance of the named model builder and everything it runs
    pub fn create_model_builder(&self, name: &str) -> Result<Box<dyn ModelBuilder>> {
        Ok(self.configured_builder(name, &mut Vec::new())?.into_plain())
    }

    /// `building` holds the chain of builders being instantiated, so a
    /// reference cycle fails instead of recursing forever.
    fn configured_builder<'a>(&'a self, name: &'a str, building: &mut Vec<&'a str>) -> Result<ConfiguredBuilder> {
        let config = self.model_builders.get(name).ok_or_else(|| {
            DistributorError::Configuration(format!("Unknown model builder: {}", name))
        })?;
        if building.contains(&name) {
            building.push(name);
            return Err(DistributorError::Configuration(format!(
                "Model builder cycle: {}",
                building.join(" -> ")
            )));
        }
        building.push(name);

        let configured = match config {
            ModelBuilderConfig::DrillDown {
                top_level_model_builder,
                drill_down_query,
                drill_down_model_builder,
            } => {
                let mut builder = DrillDownModelBuilder::new(drill_down_query.clone()).with_name(name);
                for child in top_level_model_builder {
                    builder.add_top_level_model_builder(self.configured_builder(child, building)?.into_plain());
                }
                for child in drill_down_model_builder {
                    builder.add_drill_down_model_builder(self.configured_builder(child, building)?.into_resettable());
                }
                builder.validate()?;
                ConfiguredBuilder::DrillDown(builder)
            }
            ModelBuilderConfig::Construct {
                model,
                query,
                uri_binding,
                literal_binding,
            } => {
                let mut builder = ConstructQueryModelBuilder::new(model.clone(), query.clone()).with_name(name);
                for parameter in uri_binding {
                    builder = builder.with_uri_binding(parameter.clone());
                }
                for parameter in literal_binding {
                    builder = builder.with_literal_binding(parameter.clone());
                }
                ConfiguredBuilder::Construct(builder)
            }
        };
        building.pop();
        Ok(configured)
    }

    /// Build a fresh distributor for `action_name`. File distributors
    /// resolve against `home`.
    pub fn create_distributor(&self, action_name: &str, home: &Path) -> Result<Box<dyn DataDistributor>> {
        let config = self
            .distributor(action_name)
            .ok_or_else(|| DistributorError::UnknownAction(action_name.to_string()))?;

        let distributor: Box<dyn DataDistributor> = match config {
            DistributorConfig::RdfGraph {
                action_name,
                model_builder,
                content_type,
            } => Box::new(
                RdfGraphDistributor::new(action_name.clone(), self.create_model_builder(model_builder)?)
                    .with_content_type(content_type)?,
            ),
            DistributorConfig::SelectFromGraph {
                action_name,
                model_builder,
                query,
            } => Box::new(SelectFromGraphDistributor::new(
                action_name.clone(),
                self.create_model_builder(model_builder)?,
                query.clone(),
            )),
            DistributorConfig::PatternMatchingFile {
                action_name,
                parameter_name,
                parameter_pattern,
                filepath_pattern,
                content_type,
                empty_response,
            } => Box::new(PatternMatchingFileDistributor::new(
                action_name.clone(),
                parameter_name.clone(),
                parameter_pattern,
                filepath_pattern.clone(),
                content_type.clone(),
                empty_response.clone().unwrap_or_default(),
                home,
            )?),
        };
        Ok(distributor)
    }

    /// Register a factory for every distributor in the set.
    ///
    /// `home_override` replaces the configured home directory.
    pub fn into_registry(self, home_override: Option<PathBuf>) -> Result<DistributorRegistry> {
        self.validate()?;
        let home = home_override.unwrap_or_else(|| self.home_directory());
        let config = Arc::new(self);
        let mut registry = DistributorRegistry::new();

        for distributor in &config.distributors {
            let action = distributor.action_name().to_string();
            // Fail at load time rather than on the first request
            config.create_distributor(&action, &home)?;

            let config = Arc::clone(&config);
            let home = home.clone();
            let factory_action = action.clone();
            registry.register(action, move || config.create_distributor(&factory_action, &home))?;
        }

        info!(
            actions = registry.actions().count(),
            home = %home.display(),
            "distributor registry ready"
        );
        Ok(registry)
    }
}
