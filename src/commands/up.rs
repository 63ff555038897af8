// ABOUTME: Up command handler: bootstrap a fresh host, then deploy.

use crate::config::Config;
use crate::error::Result;
use crate::output::Output;
use crate::release::Engine;

pub async fn up(config: &Config) -> Result<()> {
    let mut output = Output::new();
    output.start_timer();

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);
    let result = engine.up().await;
    let _ = session.disconnect().await;
    result?;

    output.success("Server is up and the project is deployed!");
    Ok(())
}
