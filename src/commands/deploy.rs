// ABOUTME: Deploy, redeploy, and prune command handlers.

use crate::config::Config;
use crate::error::Result;
use crate::output::Output;
use crate::release::Engine;

pub async fn deploy(config: &Config, version: Option<&str>) -> Result<()> {
    let mut output = Output::new();
    output.start_timer();

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);
    let result = engine.deploy(version).await;
    let _ = session.disconnect().await;
    result?;

    output.success("Project deployment completed successfully!");
    Ok(())
}

pub async fn redeploy(config: &Config) -> Result<()> {
    let mut output = Output::new();
    output.start_timer();

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);
    let result = engine.redeploy().await;
    let _ = session.disconnect().await;
    result?;

    output.success("Redeployment completed successfully!");
    Ok(())
}

pub async fn prune(config: &Config, keep: usize) -> Result<()> {
    let output = Output::new();

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);
    let result = engine.prune(Some(keep)).await;
    let _ = session.disconnect().await;
    result?;

    output.success("Pruning completed successfully!");
    Ok(())
}
