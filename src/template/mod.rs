//! CloudFormation template model.
//!
//! The synthesized stack is a [`Template`]: an ordered map of logical ID to
//! [`CfnResource`] plus the published [`CfnOutput`]s. Keys keep declaration
//! order so the rendered document is stable between runs.

pub mod intrinsic;
pub mod logical_id;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Template format version emitted in every document.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// What happens to a physical resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Delete the physical resource
    Delete,
    /// Keep the physical resource
    Retain,
    /// Snapshot, then delete
    Snapshot,
}

/// A single resource declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    /// Resource type, e.g. `AWS::EFS::FileSystem`
    #[serde(rename = "Type")]
    pub resource_type: String,

    /// Resource properties
    #[serde(default, skip_serializing_if = "is_empty_object")]
    pub properties: JsonValue,

    /// Explicit dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Replacement behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,

    /// Deletion behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,

    /// Free-form metadata (construct path)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, JsonValue>,
}

fn is_empty_object(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl CfnResource {
    /// Create a resource with the given type and properties
    pub fn new(resource_type: impl Into<String>, properties: JsonValue) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
            metadata: IndexMap::new(),
        }
    }

    /// Apply the same policy on replacement and deletion
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }

    /// Look up a top-level property
    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }
}

/// A published stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnOutput {
    /// Output value expression
    pub value: JsonValue,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Always [`FORMAT_VERSION`]
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    /// Template description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Resources keyed by logical ID
    pub resources: IndexMap<String, CfnResource>,

    /// Outputs keyed by name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, CfnOutput>,
}

impl Template {
    /// Create an empty template
    pub fn new(description: Option<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Get a resource by logical ID
    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    /// All resources of a given type, with their logical IDs
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a CfnResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Get an output by name
    pub fn output(&self, name: &str) -> Option<&CfnOutput> {
        self.outputs.get(name)
    }

    /// Render the template in the requested format
    pub fn render(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => {
                let mut rendered = serde_json::to_string_pretty(self)?;
                rendered.push('\n');
                Ok(rendered)
            }
            TemplateFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }

    /// Parse a rendered template
    pub fn parse(content: &str, format: TemplateFormat) -> Result<Self> {
        match format {
            TemplateFormat::Json => Ok(serde_json::from_str(content)?),
            TemplateFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }
}

/// Serialization format of a template file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl TemplateFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TemplateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(Error::invalid_config(
                "output.format",
                format!("unknown template format '{}'. Valid formats: json, yaml", other),
            )),
        }
    }
}
