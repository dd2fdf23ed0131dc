//! kvault - Key Vault secrets CLI
//!
#![doc = "Main entry point for the kvault command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kvault::cli::{Cli, Commands};
use kvault::commands;
use kvault::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path.to_string_lossy(), &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Secret { command } => {
            tracing::debug!("Running secret command: {}", command_name(&command));
            commands::handle_secret(&config, command, cli.json).await?;
            Ok(())
        }
    }
}

fn command_name(command: &kvault::cli::SecretCommand) -> &'static str {
    use kvault::cli::SecretCommand::*;
    match command {
        Set { .. } => "set",
        Get { .. } => "get",
        Update { .. } => "update",
        Delete { .. } => "delete",
        ShowDeleted { .. } => "show-deleted",
        Recover { .. } => "recover",
        Purge { .. } => "purge",
        Backup { .. } => "backup",
        Restore { .. } => "restore",
        List { .. } => "list",
        Versions { .. } => "versions",
        ListDeleted { .. } => "list-deleted",
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
/// Logs go to stderr so JSON output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "kvault=debug" } else { "kvault=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
