use regex::Regex;
use serde::Serialize;
use std::fmt;
use crate::error::{HarnessError, Result};

pub const DEFAULT_REVISION: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    name: Option<String>,
    location: String,
    revision: String,
}

impl ResourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        revision: Option<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            location: location.into(),
            revision: revision.unwrap_or_else(|| DEFAULT_REVISION.to_string()),
        }
    }

    pub fn anonymous(location: impl Into<String>, revision: Option<String>) -> Self {
        Self {
            name: None,
            location: location.into(),
            revision: revision.unwrap_or_else(|| DEFAULT_REVISION.to_string()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{},{},{}", name, self.location, self.revision),
            None => write!(f, "{},{}", self.location, self.revision),
        }
    }
}

/// Parses comma-separated resource descriptions.
///
/// Named descriptions are `name,location[,revision]`; anonymous ones (the
/// test-vector source) are `location[,revision]`.
pub struct DescriptorParser {
    name_pattern: Regex,
}

impl DescriptorParser {
    pub fn new() -> Self {
        Self {
            name_pattern: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap(),
        }
    }

    pub fn parse_named(&self, description: &str) -> Result<ResourceDescriptor> {
        let tokens = Self::tokenize(description, 2, 3)?;
        let name = tokens[0];
        self.validate_name(name, description)?;

        Ok(ResourceDescriptor::new(
            name,
            tokens[1],
            tokens.get(2).map(|r| r.to_string()),
        ))
    }

    pub fn parse_anonymous(&self, description: &str) -> Result<ResourceDescriptor> {
        let tokens = Self::tokenize(description, 1, 2)?;
        Ok(ResourceDescriptor::anonymous(
            tokens[0],
            tokens.get(1).map(|r| r.to_string()),
        ))
    }

    pub fn parse_all_named<S: AsRef<str>>(&self, descriptions: &[S]) -> Result<Vec<ResourceDescriptor>> {
        descriptions
            .iter()
            .map(|d| self.parse_named(d.as_ref()))
            .collect()
    }

    pub fn validate_name(&self, name: &str, description: &str) -> Result<()> {
        if self.name_pattern.is_match(name) {
            Ok(())
        } else {
            Err(HarnessError::Configuration(format!(
                "Invalid resource name '{}' in description '{}'",
                name, description
            )))
        }
    }

    fn tokenize(description: &str, min: usize, max: usize) -> Result<Vec<&str>> {
        let tokens: Vec<&str> = description.split(',').map(|t| t.trim()).collect();

        if tokens.len() < min || tokens.len() > max {
            return Err(HarnessError::Configuration(format!(
                "Invalid resource description '{}': expected {} to {} comma-separated values, found {}",
                description,
                min,
                max,
                tokens.len()
            )));
        }

        if let Some(pos) = tokens.iter().position(|t| t.is_empty()) {
            return Err(HarnessError::Configuration(format!(
                "Invalid resource description '{}': value {} is empty",
                description,
                pos + 1
            )));
        }

        Ok(tokens)
    }
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new()
    }
}
