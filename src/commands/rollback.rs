// ABOUTME: Rollback command handler with interactive target selection.

use dialoguer::Select;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::Output;
use crate::release::Engine;

pub async fn rollback(config: &Config, version: Option<String>) -> Result<()> {
    let output = Output::new();

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);

    let result = run(&engine, version).await;
    let _ = session.disconnect().await;
    let target = result?;

    output.success(&format!("Rolled back to version {target}"));
    Ok(())
}

async fn run<R: crate::ssh::Remote + ?Sized>(
    engine: &Engine<'_, R>,
    version: Option<String>,
) -> Result<String> {
    let target = match version {
        Some(version) => version,
        None => {
            let candidates = engine.rollback_candidates().await?;
            if candidates.is_empty() {
                return Err(Error::NoRollbackCandidates);
            }
            let selection = Select::new()
                .with_prompt("Select the version to roll back to")
                .items(&candidates)
                .default(0)
                .interact()?;
            candidates[selection].clone()
        }
    };

    engine.rollback(&target).await?;
    Ok(target)
}
