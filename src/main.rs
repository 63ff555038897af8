// ABOUTME: Entry point for the capstan CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

use clap::Parser;
use std::env;
use tracing_subscriber::EnvFilter;

use capstan::cli::{Cli, Commands};
use capstan::commands;
use capstan::config::Config;
use capstan::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init => commands::init(&cwd),
        Commands::Deploy { version } => {
            let config = Config::discover(&cwd)?;
            commands::deploy(&config, version.as_deref()).await
        }
        Commands::Redeploy => {
            let config = Config::discover(&cwd)?;
            commands::redeploy(&config).await
        }
        Commands::Rollback { version } => {
            let config = Config::discover(&cwd)?;
            commands::rollback(&config, version).await
        }
        Commands::Prune { keep } => {
            let config = Config::discover(&cwd)?;
            commands::prune(&config, keep).await
        }
        Commands::Up => {
            let config = Config::discover(&cwd)?;
            commands::up(&config).await
        }
        Commands::Down { full, yes } => {
            let config = Config::discover(&cwd)?;
            commands::down(&config, full, yes).await
        }
        Commands::App { command } => {
            let config = Config::discover(&cwd)?;
            commands::app(&config, command).await
        }
        Commands::Proxy { command } => {
            let config = Config::discover(&cwd)?;
            commands::proxy(&config, command).await
        }
        Commands::Config => {
            let config = Config::discover(&cwd)?;
            println!("app: {}", config.app);
            println!("version: {}", config.version);
            println!("host: {}@{}", config.host.user, config.host.address());
            println!("app_dir: {}", config.app_dir());
            let mut names: Vec<_> = config.processes.keys().collect();
            names.sort();
            for name in names {
                println!("process: {name} ({})", config.processes[name].command);
            }
            Ok(())
        }
    }
}
