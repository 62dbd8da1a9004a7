//! Synth command
//!
//! Resolves the VPC, synthesizes the stack, reviews the template and writes
//! the cloud assembly.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use shared_storages::app::{App, CloudAssembly};
use shared_storages::template::TemplateFormat;
use std::path::PathBuf;

/// Template file format accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

impl From<FormatArg> for TemplateFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => TemplateFormat::Json,
            FormatArg::Yaml => TemplateFormat::Yaml,
        }
    }
}

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Cloud assembly directory
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Template file format
    #[arg(long)]
    pub format: Option<FormatArg>,

    /// Never call the cloud provider; fail if the context is not cached
    #[arg(long)]
    pub no_lookups: bool,

    /// Fail when the security review reports findings
    #[arg(long)]
    pub strict: bool,

    /// Do not print the template
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl SynthArgs {
    /// Execute the synth command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let props = ctx.stack_props();
        let resolver = ctx.resolver(!self.no_lookups, false)?;
        let strict = self.strict || ctx.config.output.strict;

        let synthesized = App::new(resolver)
            .strict(strict)
            .synth(&props)
            .await
            .with_context(|| format!("Failed to synthesize stack '{}'", props.stack_name))?;

        let format = self
            .format
            .map(TemplateFormat::from)
            .unwrap_or(ctx.config.output.format);
        let dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| ctx.config.output.dir.clone());
        let assembly = CloudAssembly::write(&dir, &synthesized, format)
            .with_context(|| format!("Failed to write cloud assembly to {}", dir.display()))?;

        if ctx.output.is_json() {
            ctx.output.json(&json!({
                "stack": synthesized.stack_name,
                "environment": synthesized.environment.to_uri(),
                "vpcId": synthesized.vpc.vpc_id,
                "templateFile": assembly.template_path,
                "manifest": assembly.manifest_path,
                "resources": synthesized.template.resources.len(),
                "findings": synthesized.findings,
            }))?;
        } else if !self.quiet {
            print!("{}", synthesized.template.render(format)?);
        }

        ctx.output.findings(&synthesized.findings);
        if !synthesized.findings.is_empty() && !strict {
            ctx.output
                .hint("Run with --strict to fail synthesis on security findings");
        }
        ctx.output.success(&format!(
            "Synthesized {} to {}",
            synthesized.stack_name,
            assembly.template_path.display()
        ));

        Ok(0)
    }
}
