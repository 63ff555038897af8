// ABOUTME: App service management: start/stop/restart/logs/exec.

use crate::cli::AppCommands;
use crate::config::Config;
use crate::error::Result;
use crate::output::Output;
use crate::release::Engine;
use crate::supervisor::Systemd;

pub async fn app(config: &Config, command: AppCommands) -> Result<()> {
    let output = Output::new();
    let session = super::connect(config).await?;

    let result = run(config, &session, &output, command).await;
    let _ = session.disconnect().await;
    result
}

async fn run(
    config: &Config,
    session: &crate::ssh::Session,
    output: &Output,
    command: AppCommands,
) -> Result<()> {
    let supervisor = Systemd::new(session, config);
    match command {
        AppCommands::Start { name } => {
            let names = supervisor.resolve_names(name.as_deref())?;
            supervisor.service_action(&names, "start").await
        }
        AppCommands::Stop { name } => {
            let names = supervisor.resolve_names(name.as_deref())?;
            supervisor.service_action(&names, "stop").await
        }
        AppCommands::Restart { name } => {
            let names = supervisor.resolve_names(name.as_deref())?;
            supervisor.service_action(&names, "restart").await
        }
        AppCommands::Logs { name, follow } => {
            let names = supervisor.resolve_names(Some(&name))?;
            // replicated processes resolve to several units; follow the first
            supervisor.service_logs(&names[0], follow).await
        }
        AppCommands::Exec {
            command,
            interactive,
        } => {
            let engine = Engine::new(config, session, output);
            if let Some(stdout) = engine.app_exec(&command, interactive).await? {
                output.progress(stdout.trim_end());
            }
            Ok(())
        }
    }
}
