//! Distributes the contents of a file, if the file exists. Otherwise,
//! distributes a configured empty response.
//!
//! Example configuration:
//!
//! ```yaml
//! - type: patternMatchingFile
//!   actionName: collaboration_sunburst
//!   parameterName: department
//!   parameterPattern: "[^/#]+$"
//!   filepathPattern: 'crossunit-\0.json'
//!   contentType: application/json
//!   emptyResponse: "[]"
//! ```

use regex::{Captures, Regex};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use super::DataDistributor;
use crate::context::{DistributorContext, RequestParameters};
use crate::errors::{DistributorError, Result};

pub struct PatternMatchingFileDistributor {
    action_name: String,
    /// The name of the request parameter that will select the file.
    parameter_name: String,
    /// The pattern to parse the value of the request parameter.
    parameter_parser: Regex,
    /// The pattern to create the file path from the parsed values.
    filepath_pattern: String,
    content_type: String,
    /// The response to provide if the file does not exist.
    empty_response: String,
    home: PathBuf,
    file_finder: Option<FileFinder>,
}

impl PatternMatchingFileDistributor {
    pub fn new(
        action_name: impl Into<String>,
        parameter_name: impl Into<String>,
        parameter_pattern: &str,
        filepath_pattern: impl Into<String>,
        content_type: impl Into<String>,
        empty_response: impl Into<String>,
        home: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            action_name: action_name.into(),
            parameter_name: parameter_name.into(),
            parameter_parser: Regex::new(parameter_pattern)?,
            filepath_pattern: filepath_pattern.into(),
            content_type: content_type.into(),
            empty_response: empty_response.into(),
            home: home.into(),
            file_finder: None,
        })
    }
}

impl DataDistributor for PatternMatchingFileDistributor {
    fn action_name(&self) -> &str {
        &self.action_name
    }

    fn init(&mut self, context: Arc<dyn DistributorContext>) -> Result<()> {
        self.file_finder = Some(FileFinder::new(
            context.request_parameters().clone(),
            self.parameter_name.clone(),
            self.parameter_parser.clone(),
            self.filepath_pattern.clone(),
            self.home.clone(),
        ));
        Ok(())
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn write_output(&mut self, output: &mut dyn Write) -> Result<()> {
        let finder = self.file_finder.as_ref().ok_or_else(|| {
            DistributorError::Lifecycle(format!("{}: write_output called before init", self.action_name))
        })?;

        match finder.find().filter(|file| file.is_file()) {
            Some(file) => {
                debug!(action = %self.action_name, file = %file.display(), "distributing file");
                let mut input = File::open(&file)?;
                io::copy(&mut input, output)?;
            }
            None => output.write_all(self.empty_response.as_bytes())?,
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file_finder = None;
        Ok(())
    }
}

/// A `\N` back-reference in a file path template
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(\d+)").expect("valid regex"));

/// Locates the file named by a request parameter.
#[derive(Debug, Clone)]
pub struct FileFinder {
    parameters: RequestParameters,
    parameter_name: String,
    parameter_parser: Regex,
    filepath_pattern: String,
    home: PathBuf,
}

impl FileFinder {
    pub fn new(
        parameters: RequestParameters,
        parameter_name: String,
        parameter_parser: Regex,
        filepath_pattern: String,
        home: PathBuf,
    ) -> Self {
        Self {
            parameters,
            parameter_name,
            parameter_parser,
            filepath_pattern,
            home,
        }
    }

    /// The candidate path, or None if the parameter is missing, does not
    /// match, or would resolve outside the home directory. The file itself
    /// may not exist.
    pub fn find(&self) -> Option<PathBuf> {
        let parameter = self.parameter_from_request()?;
        let captures = match self.parameter_parser.captures(parameter) {
            Some(captures) => captures,
            None => {
                warn!(
                    pattern = %self.parameter_parser,
                    value = parameter,
                    "failed to parse the request parameter"
                );
                return None;
            }
        };
        self.resolve(&self.substitute_into_filepath(&captures))
    }

    fn parameter_from_request(&self) -> Option<&str> {
        let value = self
            .parameters
            .get(&self.parameter_name)
            .and_then(|values| values.first());
        if value.is_none() {
            warn!(parameter = %self.parameter_name, "no value provided for request parameter");
        }
        value.map(String::as_str)
    }

    /// Replace `\0`, `\1`, ... with the capture groups in a single pass over
    /// the template. Captured text is never rescanned. A placeholder naming a
    /// group the pattern does not have is left as written.
    fn substitute_into_filepath(&self, captures: &Captures<'_>) -> String {
        PLACEHOLDER
            .replace_all(&self.filepath_pattern, |placeholder: &Captures<'_>| {
                placeholder[1]
                    .parse::<usize>()
                    .ok()
                    .filter(|&group| group < captures.len())
                    .map(|group| captures.get(group).map_or("", |m| m.as_str()).to_string())
                    .unwrap_or_else(|| placeholder[0].to_string())
            })
            .into_owned()
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let escapes = Path::new(relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            warn!(path = relative, "refusing file path outside the home directory");
            return None;
        }
        Some(self.home.join(relative))
    }
}
