//! Construct builders.
//!
//! A [`Stack`] collects resource declarations addressed by construct path
//! (`ecs-app-efs/Resource`, `ecs-app-efs/EfsMountTarget1`, ...). Typed
//! builders in the submodules declare resources into a stack and hand back
//! lightweight handles that expose the intrinsic values other resources need
//! (`Ref`, `Fn::GetAtt`).
//!
//! Synthesis turns the declarations into a [`Template`]:
//!
//! 1. Every resource becomes a node in a [`DependencyGraph`]
//! 2. Explicit construct dependencies expand to every resource under the
//!    target construct and become `DependsOn`
//! 3. `Ref` / `Fn::GetAtt` targets become reference edges; an undeclared
//!    target is an error
//! 4. The graph must be acyclic

pub mod ec2;
pub mod efs;
pub mod iam;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::{debug, trace};

use crate::dependency::{DependencyGraph, DependencyKind, DependencyNode};
use crate::error::{Error, Result};
use crate::template::intrinsic::collect_references;
use crate::template::logical_id::make_unique_id;
use crate::template::{CfnOutput, CfnResource, Template};

/// Metadata key recording the construct path of a resource
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

/// Deployment target of a stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Account id
    pub account: Option<String>,
    /// Region name
    pub region: Option<String>,
}

impl Environment {
    /// Create an environment
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self { account, region }
    }

    /// `aws://<account>/<region>`, with placeholders for unresolved parts
    pub fn to_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

#[derive(Debug, Clone)]
struct Declaration {
    path: Vec<String>,
    resource: CfnResource,
}

/// A named, deployable unit of declared resources
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    env: Environment,
    description: Option<String>,
    resources: IndexMap<String, Declaration>,
    outputs: IndexMap<String, CfnOutput>,
    dependencies: Vec<(Vec<String>, Vec<String>)>,
}

impl Stack {
    /// Create an empty stack
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            env,
            description: None,
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the template description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Stack name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deployment target
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Number of declared resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Full construct path, including the stack name
    pub fn node_path(&self, path: &[&str]) -> String {
        let mut full = self.name.clone();
        for component in path {
            full.push('/');
            full.push_str(component);
        }
        full
    }

    /// Declare a resource at `path` and return its logical ID
    pub fn add_resource(&mut self, path: &[&str], mut resource: CfnResource) -> Result<String> {
        let logical_id = make_unique_id(path)
            .ok_or_else(|| Error::ConstructNotFound(path.join("/")))?;

        let owned_path: Vec<String> = path.iter().map(|c| c.to_string()).collect();
        let clash = self
            .resources
            .iter()
            .any(|(id, decl)| *id == logical_id || decl.path == owned_path);
        if clash {
            return Err(Error::DuplicateConstruct(self.node_path(path)));
        }

        resource.metadata.insert(
            PATH_METADATA_KEY.to_string(),
            JsonValue::String(self.node_path(path)),
        );

        trace!(
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            path = %path.join("/"),
            "Declared resource"
        );
        self.resources.insert(
            logical_id.clone(),
            Declaration {
                path: owned_path,
                resource,
            },
        );

        Ok(logical_id)
    }

    /// Mutable access to a declared resource
    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut CfnResource> {
        self.resources.get_mut(logical_id).map(|d| &mut d.resource)
    }

    /// Declared resource by logical ID
    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id).map(|d| &d.resource)
    }

    /// Logical IDs of every resource at or below a construct path
    pub fn resources_under(&self, construct: &[&str]) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, decl)| {
                decl.path.len() >= construct.len()
                    && decl.path.iter().zip(construct).all(|(a, b)| a == b)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Publish a stack output
    pub fn add_output(
        &mut self,
        id: &str,
        value: JsonValue,
        description: impl Into<String>,
    ) -> Result<()> {
        let logical_id =
            make_unique_id(&[id]).ok_or_else(|| Error::ConstructNotFound(id.to_string()))?;
        if self.outputs.contains_key(&logical_id) || self.resources.contains_key(&logical_id) {
            return Err(Error::DuplicateConstruct(self.node_path(&[id])));
        }
        self.outputs.insert(
            logical_id,
            CfnOutput {
                value,
                description: Some(description.into()),
            },
        );
        Ok(())
    }

    /// Declare that every resource under `source` depends on every resource
    /// under `target`. A resource is never made to depend on itself.
    pub fn add_dependency(&mut self, source: &[&str], target: &[&str]) -> Result<()> {
        for construct in [source, target] {
            if self.resources_under(construct).is_empty() {
                return Err(Error::ConstructNotFound(self.node_path(construct)));
            }
        }
        let owned = |p: &[&str]| p.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        self.dependencies.push((owned(source), owned(target)));
        Ok(())
    }

    /// Build the resource dependency graph
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for (id, decl) in &self.resources {
            graph.add_node(DependencyNode::new(
                id.clone(),
                decl.resource.resource_type.clone(),
                decl.path.join("/"),
            ));
        }

        for (source, target) in &self.dependencies {
            let source: Vec<&str> = source.iter().map(String::as_str).collect();
            let target: Vec<&str> = target.iter().map(String::as_str).collect();
            for from in self.resources_under(&source) {
                for to in self.resources_under(&target) {
                    if from != to {
                        graph.add_dependency(from, to, DependencyKind::Explicit)?;
                    }
                }
            }
        }

        for (id, decl) in &self.resources {
            for target in collect_references(&decl.resource.properties) {
                if !self.resources.contains_key(&target) {
                    return Err(Error::UnknownReference {
                        from: id.clone(),
                        target,
                    });
                }
                graph.add_dependency(id.clone(), target, DependencyKind::Reference)?;
            }
        }

        Ok(graph)
    }

    /// Produce the template for this stack
    pub fn synthesize(&self) -> Result<Template> {
        let graph = self.dependency_graph()?;
        let order = graph.topological_sort()?;
        debug!(stack = %self.name, order = ?order, "Resolved deployment order");

        let mut template = Template::new(self.description.clone());
        for (id, decl) in &self.resources {
            let mut resource = decl.resource.clone();
            let mut depends_on = graph.dependencies_of_kind(id, DependencyKind::Explicit);
            depends_on.sort();
            resource.depends_on = depends_on;
            template.resources.insert(id.clone(), resource);
        }

        for (name, output) in &self.outputs {
            for target in collect_references(&output.value) {
                if !self.resources.contains_key(&target) {
                    return Err(Error::UnknownReference {
                        from: name.clone(),
                        target,
                    });
                }
            }
            template.outputs.insert(name.clone(), output.clone());
        }

        debug!(
            stack = %self.name,
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            "Synthesized template"
        );
        Ok(template)
    }
}
