//! Context command
//!
//! Lists and removes cached lookup results.

use super::CommandContext;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

/// Arguments for the context command
#[derive(Parser, Debug, Clone)]
pub struct ContextArgs {
    /// Context action to perform
    #[command(subcommand)]
    pub action: ContextAction,
}

/// Context actions
#[derive(Subcommand, Debug, Clone)]
pub enum ContextAction {
    /// List cached keys
    List,

    /// Remove every cached entry
    Clear,

    /// Remove one entry, by key or by its 1-based position in `list`
    Reset {
        /// Key or position
        key: String,
    },
}

impl ContextArgs {
    /// Execute the context command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut cache = ctx.load_cache()?;

        match &self.action {
            ContextAction::List => {
                let keys: Vec<&String> = cache.keys().collect();
                if ctx.output.is_json() {
                    ctx.output.json(&keys)?;
                } else if keys.is_empty() {
                    ctx.output.line("No cached context.");
                } else {
                    ctx.output
                        .section(&format!("Context ({})", cache.path().display()));
                    for (index, key) in keys.iter().enumerate() {
                        ctx.output.line(&format!("{:>3}  {}", index + 1, key));
                    }
                }
            }
            ContextAction::Clear => {
                let count = cache.len();
                cache.clear();
                cache.save()?;
                ctx.output
                    .success(&format!("Removed {} cached context entries", count));
            }
            ContextAction::Reset { key } => {
                let resolved = resolve_key(&cache.keys().cloned().collect::<Vec<_>>(), key)?;
                cache.remove(&resolved);
                cache.save()?;
                ctx.output
                    .success(&format!("Reset context entry '{}'", resolved));
            }
        }

        Ok(0)
    }
}

/// Match `key` against the cached keys, accepting a 1-based index
fn resolve_key(keys: &[String], key: &str) -> Result<String> {
    if keys.iter().any(|k| k == key) {
        return Ok(key.to_string());
    }
    if let Ok(index) = key.parse::<usize>() {
        if let Some(found) = index.checked_sub(1).and_then(|i| keys.get(i)) {
            return Ok(found.clone());
        }
    }
    bail!("No context entry '{}'; run `shared-storages context list`", key)
}
