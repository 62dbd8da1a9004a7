//! Resource dependency graph.
//!
//! Every declared resource is a node. Edges come from two places:
//!
//! - [`DependencyKind::Explicit`]: `Stack::add_dependency`, emitted as `DependsOn`
//! - [`DependencyKind::Reference`]: `Ref` / `Fn::GetAtt` found in properties
//!
//! Reference edges only take part in ordering and rendering; the provisioning
//! engine infers them itself. Adding an edge that would close a loop fails with
//! the loop spelled out.
//!
//! # Example
//!
//! ```rust
//! use shared_storages::dependency::{DependencyGraph, DependencyKind, DependencyNode};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node(DependencyNode::new("FileSystem", "AWS::EFS::FileSystem", "ecs-app-efs/Resource"));
//! graph.add_node(DependencyNode::new("AccessPoint", "AWS::EFS::AccessPoint", "ecs-app-efs/ap/Resource"));
//! graph.add_dependency("AccessPoint", "FileSystem", DependencyKind::Explicit).unwrap();
//!
//! assert_eq!(graph.topological_sort().unwrap(), vec!["FileSystem", "AccessPoint"]);
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Graph construction and ordering failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// The edge would close a loop; the loop is listed starting at the dependent
    #[error("Dependency cycle: {}", render_cycle(.0))]
    CircularDependency(Vec<String>),

    /// An edge names a resource that was never added
    #[error("Unknown resource '{0}' in dependency")]
    NodeNotFound(String),

    /// A resource was made to depend on itself
    #[error("Resource '{0}' cannot depend on itself")]
    SelfDependency(String),
}

fn render_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => String::from("(empty)"),
    }
}

/// How an edge came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Declared ordering; emitted as `DependsOn`
    Explicit,
    /// Implied by an intrinsic in the resource properties
    Reference,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependencyKind::Explicit => "explicit",
            DependencyKind::Reference => "reference",
        })
    }
}

/// `from` depends on `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependent resource
    pub from: String,
    /// The resource it waits for
    pub to: String,
    /// Origin of the edge
    pub kind: DependencyKind,
}

/// A declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Logical ID
    pub id: String,
    /// CloudFormation resource type
    pub resource_type: String,
    /// Construct path relative to the stack
    pub path: String,
}

impl DependencyNode {
    /// Node for a resource at `path`
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            path: path.into(),
        }
    }
}

/// Resources of one stack and the edges between them
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<String, DependencyNode>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, replacing any node with the same logical ID
    pub fn add_node(&mut self, node: DependencyNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Record that `from` depends on `to`.
    ///
    /// Re-adding an existing edge of the same kind changes nothing.
    pub fn add_dependency(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: DependencyKind,
    ) -> Result<(), DependencyError> {
        let (from, to) = (from.into(), to.into());

        if from == to {
            return Err(DependencyError::SelfDependency(from));
        }
        for id in [&from, &to] {
            if !self.nodes.contains_key(id) {
                return Err(DependencyError::NodeNotFound(id.clone()));
            }
        }
        if let Some(mut path) = self.path_between(&to, &from) {
            // path is to .. from; the new edge closes it back to `to`
            path.pop();
            path.insert(0, from);
            return Err(DependencyError::CircularDependency(path));
        }

        let edge = DependencyEdge { from, to, kind };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Direct dependencies of `id`, in any kind
    fn targets_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.from == id)
            .map(|e| e.to.as_str())
    }

    /// A dependency path from `start` to `end`, both included
    fn path_between(&self, start: &str, end: &str) -> Option<Vec<String>> {
        let mut path = vec![start.to_string()];
        let mut seen = HashSet::new();
        self.walk(start, end, &mut path, &mut seen).then_some(path)
    }

    fn walk<'a>(
        &'a self,
        current: &'a str,
        end: &str,
        path: &mut Vec<String>,
        seen: &mut HashSet<&'a str>,
    ) -> bool {
        if current == end {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        for next in self.targets_of(current) {
            path.push(next.to_string());
            if self.walk(next, end, path, seen) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Deployment order: every resource after the ones it depends on.
    ///
    /// Among resources that are ready at the same time, declaration order wins.
    pub fn topological_sort(&self) -> Result<Vec<String>, DependencyError> {
        let mut waiting_on: Vec<usize> = self
            .nodes
            .keys()
            .map(|id| self.targets_of(id).count())
            .collect();
        let mut ready: BTreeSet<usize> = waiting_on
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(index) = ready.pop_first() {
            let Some((id, _)) = self.nodes.get_index(index) else {
                break;
            };
            order.push(id.clone());
            for edge in self.edges.iter().filter(|e| &e.to == id) {
                if let Some(dependent) = self.nodes.get_index_of(&edge.from) {
                    waiting_on[dependent] -= 1;
                    if waiting_on[dependent] == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck: Vec<String> = self
                .nodes
                .keys()
                .filter(|id| !order.contains(*id))
                .cloned()
                .collect();
            return Err(DependencyError::CircularDependency(stuck));
        }
        Ok(order)
    }

    /// Direct dependencies of `id` with the given kind, in the order they were added
    pub fn dependencies_of_kind(&self, id: &str, kind: DependencyKind) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.from == id && e.kind == kind)
            .map(|e| e.to.clone())
            .collect()
    }

    /// Number of resources
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges across both kinds
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resources in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Edges in the order they were added
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Graphviz rendering; explicit edges solid, reference edges dashed
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph StackResources {\n    rankdir=BT;\n");
        out.push_str("    node [shape=box, style=\"filled,rounded\"];\n\n");

        for node in self.nodes.values() {
            let _ = writeln!(
                out,
                "    \"{}\" [label=\"{}\\n({})\", fillcolor=\"{}\"];",
                node.id,
                node.path,
                node.resource_type,
                service_color(&node.resource_type)
            );
        }
        out.push('\n');
        for edge in &self.edges {
            let style = match edge.kind {
                DependencyKind::Explicit => "solid",
                DependencyKind::Reference => "dashed",
            };
            let _ = writeln!(
                out,
                "    \"{}\" -> \"{}\" [label=\"{}\", style={}];",
                edge.from, edge.to, edge.kind, style
            );
        }
        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart; reference edges are dotted
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph BT\n");
        for node in self.nodes.values() {
            let _ = writeln!(
                out,
                "    {}[\"{}<br/>{}\"];",
                mermaid_id(&node.id),
                node.path,
                node.resource_type
            );
        }
        out.push('\n');
        for edge in &self.edges {
            let arrow = match edge.kind {
                DependencyKind::Explicit => "-->",
                DependencyKind::Reference => "-.->",
            };
            let _ = writeln!(
                out,
                "    {} {} {};",
                mermaid_id(&edge.from),
                arrow,
                mermaid_id(&edge.to)
            );
        }
        out
    }

    /// One line per resource followed by its outgoing edges
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "Resource Graph:\n  Resources: {}\n  Edges: {}\n\n",
            self.nodes.len(),
            self.edges.len()
        );
        for node in self.nodes.values() {
            let _ = writeln!(out, "  {} ({})", node.id, node.resource_type);
            for edge in self.edges.iter().filter(|e| e.from == node.id) {
                let _ = writeln!(out, "    -> {} [{}]", edge.to, edge.kind);
            }
        }
        out
    }
}

fn service_color(resource_type: &str) -> &'static str {
    match resource_type.split("::").nth(1) {
        Some("EC2") => "#FF9800",
        Some("EFS") => "#4CAF50",
        Some("IAM") => "#2196F3",
        _ => "#607D8B",
    }
}

fn mermaid_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(ids: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for id in ids {
            graph.add_node(DependencyNode::new(*id, "AWS::EFS::FileSystem", *id));
        }
        graph
    }

    #[test]
    fn test_order_follows_dependencies() {
        let mut graph = graph_with(&["c", "b", "a"]);
        graph.add_dependency("b", "a", DependencyKind::Reference).unwrap();
        graph.add_dependency("c", "b", DependencyKind::Explicit).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.topological_sort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_independent_resources_keep_declaration_order() {
        let mut graph = graph_with(&["sg", "fs", "role", "ap"]);
        graph.add_dependency("ap", "fs", DependencyKind::Explicit).unwrap();
        assert_eq!(
            graph.topological_sort().unwrap(),
            vec!["sg", "fs", "role", "ap"]
        );
    }

    #[test]
    fn test_cycle_is_rejected_with_path() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_dependency("a", "b", DependencyKind::Explicit).unwrap();
        graph.add_dependency("b", "c", DependencyKind::Explicit).unwrap();

        let err = graph
            .add_dependency("c", "a", DependencyKind::Explicit)
            .unwrap_err();
        assert_eq!(
            err,
            DependencyError::CircularDependency(vec!["c".into(), "a".into(), "b".into()])
        );
        assert!(err.to_string().contains("c -> a -> b -> c"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let mut graph = graph_with(&["a"]);
        assert_eq!(
            graph.add_dependency("a", "a", DependencyKind::Explicit),
            Err(DependencyError::SelfDependency("a".to_string()))
        );
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let mut graph = graph_with(&["a"]);
        assert_eq!(
            graph.add_dependency("a", "missing", DependencyKind::Reference),
            Err(DependencyError::NodeNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_duplicate_edges_are_ignored() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_dependency("b", "a", DependencyKind::Reference).unwrap();
        graph.add_dependency("b", "a", DependencyKind::Reference).unwrap();
        graph.add_dependency("b", "a", DependencyKind::Explicit).unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(
            graph.dependencies_of_kind("b", DependencyKind::Explicit),
            vec!["a"]
        );
        assert_eq!(graph.topological_sort().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_renderers() {
        let mut graph = graph_with(&["fs-1", "ap"]);
        graph.add_dependency("ap", "fs-1", DependencyKind::Explicit).unwrap();

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph StackResources {"));
        assert!(dot.contains("\"ap\" -> \"fs-1\" [label=\"explicit\", style=solid];"));
        assert!(dot.contains("fillcolor=\"#4CAF50\""));

        assert!(graph.to_mermaid().contains("ap --> fs_1;"));

        let text = graph.to_text();
        assert!(text.contains("Resources: 2"));
        assert!(text.contains("-> fs-1 [explicit]"));
    }
}
