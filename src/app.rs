//! Synthesis pipeline and cloud assembly output.
//!
//! [`App::synth`] runs the whole pipeline for one stack:
//!
//! 1. Resolve the VPC (context cache, then live provider)
//! 2. Declare the stack's resources
//! 3. Synthesize and validate the template
//! 4. Review the template
//!
//! Nothing is declared when the lookup fails. [`CloudAssembly::write`] then
//! persists the template and a manifest describing it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constructs::Environment;
use crate::dependency::DependencyGraph;
use crate::error::{Error, Result};
use crate::lookup::{VpcContext, VpcResolver};
use crate::review::{review, Finding};
use crate::stack::{SharedStoragesStack, StackProps, VPC_ID};
use crate::template::{Template, TemplateFormat};

/// Schema version written to `manifest.json`
pub const MANIFEST_VERSION: &str = "36.0.0";

/// Manifest file name inside the assembly directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact type of a CloudFormation stack
pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// Result of synthesizing one stack
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    /// Stack name
    pub stack_name: String,
    /// Deployment target
    pub environment: Environment,
    /// The VPC the stack was built into
    pub vpc: VpcContext,
    /// Emitted template
    pub template: Template,
    /// Review findings, most severe first
    pub findings: Vec<Finding>,
    /// Resource dependency graph
    pub graph: DependencyGraph,
}

/// Drives lookup, construction, synthesis and review
pub struct App {
    resolver: VpcResolver,
    strict: bool,
}

impl App {
    /// Create an app resolving VPCs through `resolver`
    pub fn new(resolver: VpcResolver) -> Self {
        Self {
            resolver,
            strict: false,
        }
    }

    /// Treat review findings as errors
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The resolver, with its cache
    pub fn resolver(&self) -> &VpcResolver {
        &self.resolver
    }

    /// Synthesize the stack described by `props`
    pub async fn synth(&mut self, props: &StackProps) -> Result<SynthesizedStack> {
        let query = SharedStoragesStack::query(props)?;
        let vpc = self.resolver.resolve(&query).await?;
        info!(
            construct = VPC_ID,
            vpc_id = %vpc.vpc_id,
            subnet_groups = vpc.subnet_groups.len(),
            "Resolved VPC"
        );

        let built = SharedStoragesStack::build(props, &vpc)?;
        let template = built.synthesize()?;
        let graph = built.stack().dependency_graph()?;

        let findings = review(&template);
        for finding in &findings {
            warn!(
                rule = %finding.rule_id,
                severity = %finding.severity,
                logical_id = %finding.logical_id,
                "{}",
                finding.message
            );
        }
        if self.strict && !findings.is_empty() {
            return Err(Error::ReviewFailed(findings.len()));
        }

        Ok(SynthesizedStack {
            stack_name: props.stack_name.clone(),
            environment: props.env.clone(),
            vpc,
            template,
            findings,
            graph,
        })
    }
}

/// One artifact entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    /// Always [`STACK_ARTIFACT_TYPE`]
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// `aws://<account>/<region>`
    pub environment: String,
    /// Artifact properties
    pub properties: StackArtifactProperties,
    /// Name shown by tooling
    pub display_name: String,
}

/// Properties of a stack artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    /// Template path relative to the assembly directory
    pub template_file: String,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    /// Schema version
    pub version: String,
    /// Artifacts keyed by id
    pub artifacts: IndexMap<String, ArtifactManifest>,
}

/// A written cloud assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudAssembly {
    /// Assembly directory
    pub directory: PathBuf,
    /// Written template file
    pub template_path: PathBuf,
    /// Written manifest file
    pub manifest_path: PathBuf,
}

impl CloudAssembly {
    /// File name of a stack's template
    pub fn template_file_name(stack_name: &str, format: TemplateFormat) -> String {
        format!("{}.template.{}", stack_name, format.extension())
    }

    /// Write the template and manifest of `synthesized` into `dir`
    pub fn write(
        dir: impl AsRef<Path>,
        synthesized: &SynthesizedStack,
        format: TemplateFormat,
    ) -> Result<Self> {
        let directory = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory)?;

        let template_file = Self::template_file_name(&synthesized.stack_name, format);
        let template_path = directory.join(&template_file);
        std::fs::write(&template_path, synthesized.template.render(format)?)?;

        let mut artifacts = IndexMap::new();
        artifacts.insert(
            synthesized.stack_name.clone(),
            ArtifactManifest {
                artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                environment: synthesized.environment.to_uri(),
                properties: StackArtifactProperties { template_file },
                display_name: synthesized.stack_name.clone(),
            },
        );
        let manifest = AssemblyManifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        };
        let manifest_path = directory.join(MANIFEST_FILE);
        let mut content = serde_json::to_string_pretty(&manifest)?;
        content.push('\n');
        std::fs::write(&manifest_path, content)?;

        info!(
            directory = %directory.display(),
            template = %template_path.display(),
            "Wrote cloud assembly"
        );

        Ok(Self {
            directory,
            template_path,
            manifest_path,
        })
    }

    /// Read back the manifest
    pub fn manifest(&self) -> Result<AssemblyManifest> {
        let content = std::fs::read_to_string(&self.manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
