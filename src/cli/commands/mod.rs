//! Subcommands module for the shared-storages CLI
//!
//! This module contains all the subcommand implementations.

pub mod context;
pub mod graph;
pub mod lookup;
pub mod synth;

use crate::cli::output::OutputFormatter;
use crate::cli::Cli;
use anyhow::{Context, Result};
use shared_storages::config::Config;
use shared_storages::lookup::{ContextCache, VpcResolver};
use shared_storages::stack::StackProps;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration, with command-line overrides applied
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, mut config: Config) -> Self {
        if let Some(name) = &cli.stack_name {
            config.stack.name = name.clone();
        }
        if let Some(name) = &cli.vpc_name {
            config.stack.vpc_name = name.clone();
        }
        if let Some(account) = &cli.account {
            config.environment.account = Some(account.clone());
        }
        if let Some(region) = &cli.region {
            config.environment.region = Some(region.clone());
        }
        if let Some(file) = &cli.context_file {
            config.context.file = file.clone();
        }

        let use_color = config.output.color && !cli.no_color;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self { config, output }
    }

    /// Stack inputs for this invocation
    pub fn stack_props(&self) -> StackProps {
        self.config.stack_props()
    }

    /// Load the lookup context cache
    pub fn load_cache(&self) -> Result<ContextCache> {
        ContextCache::load(&self.config.context.file).with_context(|| {
            format!(
                "Failed to load context file: {}",
                self.config.context.file.display()
            )
        })
    }

    /// Build a VPC resolver.
    ///
    /// Live lookups are used only when both the command and the configuration
    /// allow them.
    pub fn resolver(&self, lookups: bool, refresh: bool) -> Result<VpcResolver> {
        let cache = self.load_cache()?;
        if !(lookups && self.config.context.lookups) {
            self.output.info("Live lookups disabled; using cached context only");
            return Ok(VpcResolver::cached_only(cache));
        }
        Ok(self.live_resolver(cache).refresh(refresh))
    }

    #[cfg(feature = "aws")]
    fn live_resolver(&self, cache: ContextCache) -> VpcResolver {
        use shared_storages::lookup::aws::Ec2VpcProvider;
        use std::sync::Arc;

        VpcResolver::with_provider(cache, Arc::new(Ec2VpcProvider::new()))
    }

    #[cfg(not(feature = "aws"))]
    fn live_resolver(&self, cache: ContextCache) -> VpcResolver {
        self.output
            .warning("Built without the `aws` feature; only cached context is available");
        VpcResolver::cached_only(cache)
    }
}
