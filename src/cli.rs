// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "capstan")]
#[command(about = "Deploy self-contained services over SSH with systemd and Caddy")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a sample capstan.yml configuration file
    Init,

    /// Deploy the project: build, transfer, install, and configure services
    Deploy {
        /// Version to deploy (defaults to the configured version)
        #[arg(long)]
        version: Option<String>,
    },

    /// Redeploy to apply code and environment changes only
    Redeploy,

    /// Roll back to a previous release still present on the host
    Rollback {
        /// Target version; prompts among candidates when omitted
        version: Option<String>,
    },

    /// Delete releases beyond the retention count
    Prune {
        /// Number of releases to keep
        #[arg(long)]
        keep: usize,
    },

    /// Bootstrap a fresh server and run a full deploy
    Up,

    /// Tear down the project on the host
    Down {
        /// Also uninstall the shared proxy process
        #[arg(long)]
        full: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// App service management
    App {
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Manage the shared reverse proxy
    Proxy {
        #[command(subcommand)]
        command: ProxyCommands,
    },

    /// Print the resolved configuration
    Config,
}

#[derive(Subcommand)]
pub enum AppCommands {
    /// Start services; no name means all
    Start { name: Option<String> },

    /// Stop services; no name means all
    Stop { name: Option<String> },

    /// Restart services; no name means all
    Restart { name: Option<String> },

    /// Show journal entries for a service
    Logs {
        name: String,

        #[arg(short, long)]
        follow: bool,
    },

    /// Run an arbitrary command via the app binary
    Exec {
        command: String,

        #[arg(short, long)]
        interactive: bool,
    },
}

#[derive(Subcommand)]
pub enum ProxyCommands {
    /// Install the proxy on the remote host
    Install,
    /// Uninstall the proxy from the remote host
    Uninstall,
    /// Start the proxy
    Start,
    /// Stop the proxy
    Stop,
    /// Show proxy status
    Status,
    /// Show proxy logs
    Logs,
}
