//! Configuration module for shared-storages
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - User configuration (`<config dir>/shared-storages/config.toml`, `~/.shared-storages.toml`)
//! - Project configuration (`./shared-storages.toml`)
//! - `SHARED_STORAGES_CONFIG`
//! - An explicit `--config` file
//! - Environment variables
//! - Command-line arguments (applied by the binary)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constructs::Environment;
use crate::lookup::context::DEFAULT_CONTEXT_FILE;
use crate::stack::{StackProps, DEFAULT_STACK_NAME, DEFAULT_VPC_NAME};
use crate::template::TemplateFormat;

/// Environment variable pointing at an extra config file
pub const CONFIG_ENV_VAR: &str = "SHARED_STORAGES_CONFIG";

/// Default cloud assembly directory
pub const DEFAULT_OUTDIR: &str = "cdk.out";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stack settings
    pub stack: StackConfig,

    /// Deployment target
    pub environment: EnvironmentConfig,

    /// Lookup context settings
    pub context: ContextConfig,

    /// Synthesis output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Stack settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Stack name
    pub name: String,

    /// `Name` tag of the existing VPC
    pub vpc_name: String,

    /// Template description
    pub description: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STACK_NAME.to_string(),
            vpc_name: DEFAULT_VPC_NAME.to_string(),
            description: None,
        }
    }
}

/// Deployment target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Account id
    pub account: Option<String>,

    /// Region name
    pub region: Option<String>,
}

/// Lookup context settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Context cache file
    pub file: PathBuf,

    /// Call the cloud provider on cache misses
    pub lookups: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CONTEXT_FILE),
            lookups: true,
        }
    }
}

/// Synthesis output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cloud assembly directory
    pub dir: PathBuf,

    /// Template file format
    pub format: TemplateFormat,

    /// Fail synthesis on review findings
    pub strict: bool,

    /// Colored terminal output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTDIR),
            format: TemplateFormat::Json,
            strict: false,
            color: true,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when neither `RUST_LOG` nor `-v` is given
    pub level: Option<String>,

    /// Line format
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User config
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shared-storages").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shared-storages.toml"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("shared-storages.toml"));

        // Environment variable
        if let Ok(env_config) = std::env::var(CONFIG_ENV_VAR) {
            paths.push(PathBuf::from(env_config));
        }

        if let Some(path) = explicit_path {
            paths.push(path.clone());
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values equal to the defaults do
    /// not override
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();
        Config {
            stack: StackConfig {
                name: if other.stack.name != defaults.stack.name {
                    other.stack.name
                } else {
                    self.stack.name.clone()
                },
                vpc_name: if other.stack.vpc_name != defaults.stack.vpc_name {
                    other.stack.vpc_name
                } else {
                    self.stack.vpc_name.clone()
                },
                description: other
                    .stack
                    .description
                    .or_else(|| self.stack.description.clone()),
            },
            environment: EnvironmentConfig {
                account: other
                    .environment
                    .account
                    .or_else(|| self.environment.account.clone()),
                region: other
                    .environment
                    .region
                    .or_else(|| self.environment.region.clone()),
            },
            context: ContextConfig {
                file: if other.context.file != defaults.context.file {
                    other.context.file
                } else {
                    self.context.file.clone()
                },
                lookups: self.context.lookups && other.context.lookups,
            },
            output: OutputConfig {
                dir: if other.output.dir != defaults.output.dir {
                    other.output.dir
                } else {
                    self.output.dir.clone()
                },
                format: if other.output.format != defaults.output.format {
                    other.output.format
                } else {
                    self.output.format
                },
                strict: self.output.strict || other.output.strict,
                color: self.output.color && other.output.color,
            },
            logging: LoggingConfig {
                level: other.logging.level.or_else(|| self.logging.level.clone()),
                format: if other.logging.format != defaults.logging.format {
                    other.logging.format
                } else {
                    self.logging.format
                },
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // CDK_DEFAULT_ACCOUNT
        if let Ok(account) = std::env::var("CDK_DEFAULT_ACCOUNT") {
            self.environment.account = Some(account);
        }

        // CDK_DEFAULT_REGION, falling back to the AWS SDK variables
        if let Ok(region) = std::env::var("CDK_DEFAULT_REGION") {
            self.environment.region = Some(region);
        } else if self.environment.region.is_none() {
            self.environment.region = std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok();
        }

        // SHARED_STORAGES_VPC_NAME
        if let Ok(name) = std::env::var("SHARED_STORAGES_VPC_NAME") {
            self.stack.vpc_name = name;
        }

        // SHARED_STORAGES_STACK_NAME
        if let Ok(name) = std::env::var("SHARED_STORAGES_STACK_NAME") {
            self.stack.name = name;
        }

        // SHARED_STORAGES_OUTDIR
        if let Ok(dir) = std::env::var("SHARED_STORAGES_OUTDIR") {
            self.output.dir = PathBuf::from(dir);
        }

        // SHARED_STORAGES_LOG_FORMAT
        if let Ok(format) = std::env::var("SHARED_STORAGES_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "text" => self.logging.format = LogFormat::Text,
                _ => {}
            }
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() {
            self.output.color = false;
        }
    }

    /// Stack inputs described by this configuration
    pub fn stack_props(&self) -> StackProps {
        StackProps {
            stack_name: self.stack.name.clone(),
            env: Environment::new(
                self.environment.account.clone(),
                self.environment.region.clone(),
            ),
            vpc_name: self.stack.vpc_name.clone(),
            description: self.stack.description.clone(),
        }
    }

    /// Load from a specific file only, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
