//! Lookup command
//!
//! Resolves the configured VPC and prints the cached context.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use shared_storages::stack::SharedStoragesStack;

/// Arguments for the lookup command
#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    /// Ignore the cached answer and query the cloud provider again
    #[arg(long)]
    pub refresh: bool,
}

impl LookupArgs {
    /// Execute the lookup command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let props = ctx.stack_props();
        let query = SharedStoragesStack::query(&props)?;
        let mut resolver = ctx.resolver(true, self.refresh)?;

        let vpc = resolver
            .resolve(&query)
            .await
            .with_context(|| format!("Failed to look up VPC '{}'", query.vpc_name))?;

        if ctx.output.is_json() {
            ctx.output.json(&vpc)?;
            return Ok(0);
        }

        ctx.output.section(&format!("VPC {}", query.vpc_name));
        ctx.output.key_value("id", &vpc.vpc_id);
        ctx.output.key_value("cidr", &vpc.vpc_cidr_block);
        if let Some(owner) = &vpc.owner_account_id {
            ctx.output.key_value("owner", owner);
        }
        ctx.output
            .key_value("availability zones", &vpc.availability_zones.join(", "));
        ctx.output.key_value("context key", &query.context_key());

        for group in &vpc.subnet_groups {
            ctx.output
                .section(&format!("{} ({})", group.name, group.subnet_type));
            for subnet in &group.subnets {
                ctx.output.key_value(
                    &subnet.subnet_id,
                    &format!("{} {}", subnet.availability_zone, subnet.cidr),
                );
            }
        }

        match vpc.default_subnets() {
            Ok(subnets) => ctx.output.info(&format!(
                "Mount targets would use: {}",
                subnets
                    .iter()
                    .map(|s| s.subnet_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Err(e) => ctx.output.warning(&e.to_string()),
        }

        Ok(0)
    }
}
