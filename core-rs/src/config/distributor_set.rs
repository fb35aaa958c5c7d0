/**
 * distributor_set.rs
 * Parser for distributor set files (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: datadist/v1
 * kind: DistributorSet
 * homeDirectory: ./data
 * modelBuilders:
 *   departments:
 *     type: construct
 *     model: content
 *     query: CONSTRUCT { ?org ex:hasDept ?d } WHERE { ?org ex:hasDept ?d }
 *   department_labels:
 *     type: construct
 *     model: content
 *     query: CONSTRUCT { ?department rdfs:label ?l } WHERE { ?department rdfs:label ?l }
 *     uriBinding: [department]
 *   org_tree:
 *     type: drillDown
 *     topLevelModelBuilder: [departments]
 *     drillDownQuery: SELECT ?department WHERE { ?o ex:hasDept ?department }
 *     drillDownModelBuilder: [department_labels]
 * distributors:
 *   - type: rdfGraph
 *     actionName: org_tree
 *     modelBuilder: org_tree
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::distribute::graph::{rdf_format_for, DEFAULT_RDF_CONTENT_TYPE};
use crate::errors::{DistributorError, Result};
use crate::modelbuilder::drill_down::validate_select_query;
use crate::modelbuilder::ConstructQueryModelBuilder;

pub const API_VERSION: &str = "datadist/v1";
pub const KIND: &str = "DistributorSet";

/// Distributor set file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributorSetConfig {
    pub api_version: String,
    pub kind: String,
    /// Directory that file distributors resolve against. Relative paths are
    /// taken relative to the file's own directory when loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<PathBuf>,
    #[serde(default)]
    pub model_builders: BTreeMap<String, ModelBuilderConfig>,
    #[serde(default)]
    pub distributors: Vec<DistributorConfig>,
}

/// A named model builder definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModelBuilderConfig {
    #[serde(rename_all = "camelCase")]
    DrillDown {
        #[serde(default)]
        top_level_model_builder: Vec<String>,
        #[serde(default)]
        drill_down_query: String,
        #[serde(default)]
        drill_down_model_builder: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Construct {
        #[serde(default)]
        model: String,
        #[serde(default)]
        query: String,
        #[serde(default)]
        uri_binding: Vec<String>,
        #[serde(default)]
        literal_binding: Vec<String>,
    },
}

impl ModelBuilderConfig {
    /// Names of the builders this one runs, in declared order
    pub fn references(&self) -> Vec<&str> {
        match self {
            ModelBuilderConfig::DrillDown {
                top_level_model_builder,
                drill_down_model_builder,
                ..
            } => top_level_model_builder
                .iter()
                .chain(drill_down_model_builder.iter())
                .map(String::as_str)
                .collect(),
            ModelBuilderConfig::Construct { .. } => Vec::new(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ModelBuilderConfig::DrillDown { .. } => "drillDown",
            ModelBuilderConfig::Construct { .. } => "construct",
        }
    }
}

/// A distributor bound to an action name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DistributorConfig {
    #[serde(rename_all = "camelCase")]
    RdfGraph {
        #[serde(default)]
        action_name: String,
        #[serde(default)]
        model_builder: String,
        #[serde(default = "default_rdf_content_type")]
        content_type: String,
    },
    #[serde(rename_all = "camelCase")]
    SelectFromGraph {
        #[serde(default)]
        action_name: String,
        #[serde(default)]
        model_builder: String,
        #[serde(default)]
        query: String,
    },
    #[serde(rename_all = "camelCase")]
    PatternMatchingFile {
        #[serde(default)]
        action_name: String,
        #[serde(default)]
        parameter_name: String,
        #[serde(default)]
        parameter_pattern: String,
        #[serde(default)]
        filepath_pattern: String,
        #[serde(default)]
        content_type: String,
        #[serde(default)]
        empty_response: Option<String>,
    },
}

fn default_rdf_content_type() -> String {
    DEFAULT_RDF_CONTENT_TYPE.to_string()
}

impl DistributorConfig {
    pub fn action_name(&self) -> &str {
        match self {
            DistributorConfig::RdfGraph { action_name, .. }
            | DistributorConfig::SelectFromGraph { action_name, .. }
            | DistributorConfig::PatternMatchingFile { action_name, .. } => action_name.as_str(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DistributorConfig::RdfGraph { .. } => "rdfGraph",
            DistributorConfig::SelectFromGraph { .. } => "selectFromGraph",
            DistributorConfig::PatternMatchingFile { .. } => "patternMatchingFile",
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            DistributorConfig::RdfGraph { content_type, .. }
            | DistributorConfig::PatternMatchingFile { content_type, .. } => content_type.as_str(),
            DistributorConfig::SelectFromGraph { .. } => crate::distribute::select::JSON_CONTENT_TYPE,
        }
    }

    fn model_builder(&self) -> Option<&str> {
        match self {
            DistributorConfig::RdfGraph { model_builder, .. }
            | DistributorConfig::SelectFromGraph { model_builder, .. } => Some(model_builder.as_str()),
            DistributorConfig::PatternMatchingFile { .. } => None,
        }
    }
}

impl DistributorSetConfig {
    pub fn new() -> Self {
        DistributorSetConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            home_directory: None,
            model_builders: BTreeMap::new(),
            distributors: Vec::new(),
        }
    }

    /// Load and validate one distributor set file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load every `*.yaml` / `*.yml` file under `dir` and validate them as
    /// one set. Builders may reference builders defined in other files.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut merged = Self::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                DistributorError::Configuration(format!("Failed to scan {}: {}", dir.display(), e))
            })?;
            let path = entry.path();
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            if entry.file_type().is_file() && is_yaml {
                merged.merge(Self::parse_file(path)?)?;
            }
        }

        merged.validate()?;
        Ok(merged)
    }

    /// Load a file or a directory of files
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load(path)
        }
    }

    fn parse_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DistributorError::Configuration(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let mut config: DistributorSetConfig = serde_yaml::from_str(&content).map_err(|e| {
            DistributorError::Configuration(format!("Invalid YAML in {}: {}", path.display(), e))
        })?;
        config.validate_header()?;

        if let Some(home) = config.home_directory.take() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.home_directory = Some(if home.is_relative() { base.join(home) } else { home });
        }

        debug!(
            path = %path.display(),
            builders = config.model_builders.len(),
            distributors = config.distributors.len(),
            "parsed distributor set"
        );
        Ok(config)
    }

    fn merge(&mut self, other: DistributorSetConfig) -> Result<()> {
        match (&self.home_directory, other.home_directory) {
            (Some(mine), Some(theirs)) if *mine != theirs => {
                return Err(DistributorError::Configuration(format!(
                    "Conflicting homeDirectory: {} and {}",
                    mine.display(),
                    theirs.display()
                )));
            }
            (None, Some(theirs)) => self.home_directory = Some(theirs),
            _ => {}
        }

        for (name, builder) in other.model_builders {
            if self.model_builders.contains_key(&name) {
                return Err(DistributorError::Configuration(format!(
                    "Duplicate model builder: {}",
                    name
                )));
            }
            self.model_builders.insert(name, builder);
        }

        self.distributors.extend(other.distributors);
        Ok(())
    }

    fn validate_header(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(DistributorError::Configuration(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }

        if self.kind != KIND {
            return Err(DistributorError::Configuration(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }

        Ok(())
    }

    /// Validate the whole set
    ///
    /// Ensures:
    /// - apiVersion and kind are correct
    /// - every builder has its required fields and valid queries
    /// - every reference names a defined builder, with no cycles
    /// - action names are present and unique
    /// - patterns and content types are usable
    pub fn validate(&self) -> Result<()> {
        self.validate_header()?;

        for (name, builder) in &self.model_builders {
            self.validate_model_builder(name, builder)?;
        }
        self.check_for_cycles()?;

        let mut actions = BTreeSet::new();
        for distributor in &self.distributors {
            let action = distributor.action_name();
            if action.is_empty() {
                return Err(DistributorError::Configuration(format!(
                    "{} distributor is missing actionName",
                    distributor.kind_name()
                )));
            }
            if !actions.insert(action) {
                return Err(DistributorError::Configuration(format!(
                    "Duplicate actionName: {}",
                    action
                )));
            }
            self.validate_distributor(distributor)?;
        }

        Ok(())
    }

    fn validate_model_builder(&self, name: &str, builder: &ModelBuilderConfig) -> Result<()> {
        match builder {
            ModelBuilderConfig::DrillDown {
                top_level_model_builder,
                drill_down_query,
                drill_down_model_builder,
            } => {
                if top_level_model_builder.is_empty() {
                    return Err(DistributorError::Configuration(format!(
                        "{}: at least one topLevelModelBuilder is required",
                        name
                    )));
                }
                if drill_down_model_builder.is_empty() {
                    return Err(DistributorError::Configuration(format!(
                        "{}: at least one drillDownModelBuilder is required",
                        name
                    )));
                }
                validate_select_query(name, drill_down_query)?;
            }
            ModelBuilderConfig::Construct {
                model,
                query,
                uri_binding,
                literal_binding,
            } => {
                let mut probe = ConstructQueryModelBuilder::new(model.clone(), query.clone()).with_name(name);
                for parameter in uri_binding {
                    probe = probe.with_uri_binding(parameter.clone());
                }
                for parameter in literal_binding {
                    probe = probe.with_literal_binding(parameter.clone());
                }
                probe.validate()?;
            }
        }

        for reference in builder.references() {
            if !self.model_builders.contains_key(reference) {
                return Err(DistributorError::Configuration(format!(
                    "{}: unknown model builder '{}'",
                    name, reference
                )));
            }
        }

        Ok(())
    }

    fn validate_distributor(&self, distributor: &DistributorConfig) -> Result<()> {
        let action = distributor.action_name();

        if let Some(builder) = distributor.model_builder() {
            if builder.is_empty() {
                return Err(DistributorError::Configuration(format!(
                    "{}: modelBuilder is required",
                    action
                )));
            }
            if !self.model_builders.contains_key(builder) {
                return Err(DistributorError::Configuration(format!(
                    "{}: unknown model builder '{}'",
                    action, builder
                )));
            }
        }

        match distributor {
            DistributorConfig::RdfGraph { content_type, .. } => {
                rdf_format_for(content_type)?;
            }
            DistributorConfig::SelectFromGraph { query, .. } => {
                validate_select_query(action, query)?;
            }
            DistributorConfig::PatternMatchingFile {
                parameter_name,
                parameter_pattern,
                filepath_pattern,
                content_type,
                empty_response,
                ..
            } => {
                let required = [
                    ("parameterName", parameter_name),
                    ("parameterPattern", parameter_pattern),
                    ("filepathPattern", filepath_pattern),
                    ("contentType", content_type),
                ];
                for (field, value) in required {
                    if value.is_empty() {
                        return Err(DistributorError::Configuration(format!(
                            "{}: {} is required",
                            action, field
                        )));
                    }
                }
                if empty_response.is_none() {
                    return Err(DistributorError::Configuration(format!(
                        "{}: emptyResponse is required",
                        action
                    )));
                }
                regex::Regex::new(parameter_pattern).map_err(|e| {
                    DistributorError::Configuration(format!(
                        "{}: invalid parameterPattern: {}",
                        action, e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// A drill-down may not run itself, directly or through other builders
    fn check_for_cycles(&self) -> Result<()> {
        fn visit<'a>(
            config: &'a DistributorSetConfig,
            name: &'a str,
            path: &mut Vec<&'a str>,
            done: &mut BTreeSet<&'a str>,
        ) -> Result<()> {
            if done.contains(name) {
                return Ok(());
            }
            if path.contains(&name) {
                path.push(name);
                return Err(DistributorError::Configuration(format!(
                    "Model builder cycle: {}",
                    path.join(" -> ")
                )));
            }

            path.push(name);
            if let Some(builder) = config.model_builders.get(name) {
                for reference in builder.references() {
                    visit(config, reference, path, done)?;
                }
            }
            path.pop();
            done.insert(name);
            Ok(())
        }

        let mut done = BTreeSet::new();
        for name in self.model_builders.keys() {
            visit(self, name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    /// The home directory file distributors resolve against
    pub fn home_directory(&self) -> PathBuf {
        self.home_directory.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn distributor(&self, action_name: &str) -> Option<&DistributorConfig> {
        self.distributors.iter().find(|d| d.action_name() == action_name)
    }
}

impl Default for DistributorSetConfig {
    fn default() -> Self {
        Self::new()
    }
}
