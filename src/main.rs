//! Forge - incremental cluster installer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use forge::cli::{Cli, Commands};
use forge::config::{Config, ConfigManager};
use forge::error::{ForgeError, ForgeResult};
use forge::targets::TargetRegistry;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let result = tokio::select! {
        result = run() => result,
        _ = tokio::signal::ctrl_c() => Err(ForgeError::Interrupted),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_status().code())
        }
    }
}

async fn run() -> ForgeResult<()> {
    let cli = Cli::parse();

    // Completion needs neither config nor logging
    if let Commands::Completion(args) = cli.command {
        return forge::cli::commands::completion(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await;

    init_logging(cli.verbose, config.as_ref().ok());
    let config = config?;
    debug!("Using config {}", config_manager.path().display());

    forge::ui::init_theme();
    let registry = TargetRegistry::installer();

    match cli.command {
        Commands::Completion(_) => unreachable!("Completion handled above"),
        Commands::Create(args) => {
            forge::cli::commands::create(args, &cli.dir, &config, &registry).await
        }
        Commands::Destroy(args) => {
            forge::cli::commands::destroy(args, &cli.dir, &config, &registry).await
        }
        Commands::View(args) => forge::cli::commands::view(args, &cli.dir).await,
        Commands::Graph(args) => forge::cli::commands::graph(args, &registry).await,
        Commands::Config(args) => {
            forge::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `FORGE_LOG` overrides
fn init_logging(verbose: u8, config: Option<&Config>) {
    let filter = match std::env::var("FORGE_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => match verbose {
            0 => EnvFilter::new("forge=warn"),
            1 => EnvFilter::new("forge=info"),
            _ => EnvFilter::new("forge=debug"),
        },
    };

    let json = config.is_some_and(|c| c.general.log_format == "json");
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
