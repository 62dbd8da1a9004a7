//! shared-storages - Shared EFS storage stack
//!
//! This is the main entry point for the shared-storages CLI.

mod cli;

use anyhow::{Context, Result};
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use shared_storages::config::{Config, LogFormat, LoggingConfig};
use shared_storages::error::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Initialize logging based on verbosity and config
    init_logging(cli.verbosity(), &config.logging);

    if cli.verbosity() >= 2 {
        eprintln!("shared-storages v{}", VERSION);
    }

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Synth(args) => args.execute(&mut ctx).await,
        Commands::Lookup(args) => args.execute(&mut ctx).await,
        Commands::Graph(args) => args.execute(&mut ctx).await,
        Commands::Context(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            ctx.output.error(&format!("{:#}", err));
            match err.downcast_ref::<Error>() {
                Some(e) if e.is_lookup_failure() => {
                    ctx.output.hint(
                        "Pass --account/--region (or set CDK_DEFAULT_ACCOUNT/CDK_DEFAULT_REGION) \
                         and check the VPC name",
                    );
                    e.exit_code()
                }
                Some(e) => e.exit_code(),
                None => 1,
            }
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level and configuration.
///
/// `RUST_LOG` takes precedence over both. Logs go to stderr so stdout stays
/// clean for templates and JSON output.
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
