//! Graph command
//!
//! Prints the resource dependency graph of the synthesized stack.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use shared_storages::app::App;

/// Graph rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT
    Dot,
    /// Mermaid flowchart
    Mermaid,
    /// Plain text
    #[default]
    Text,
}

/// Arguments for the graph command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Rendering format
    #[arg(long, default_value = "text")]
    pub format: GraphFormat,

    /// Never call the cloud provider; fail if the context is not cached
    #[arg(long)]
    pub no_lookups: bool,
}

impl GraphArgs {
    /// Execute the graph command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let props = ctx.stack_props();
        let resolver = ctx.resolver(!self.no_lookups, false)?;

        let synthesized = App::new(resolver)
            .synth(&props)
            .await
            .with_context(|| format!("Failed to synthesize stack '{}'", props.stack_name))?;
        let graph = &synthesized.graph;

        if ctx.output.is_json() {
            let nodes: Vec<_> = graph.nodes().collect();
            ctx.output.json(&serde_json::json!({
                "nodes": nodes,
                "edges": graph.edges(),
                "order": graph.topological_sort()?,
            }))?;
            return Ok(0);
        }

        let rendered = match self.format {
            GraphFormat::Dot => graph.to_dot(),
            GraphFormat::Mermaid => graph.to_mermaid(),
            GraphFormat::Text => graph.to_text(),
        };
        ctx.output.line(rendered.trim_end());

        Ok(0)
    }
}
