// ABOUTME: Teardown command handler with confirmation prompt.

use dialoguer::Confirm;

use crate::config::Config;
use crate::error::Result;
use crate::output::Output;
use crate::release::Engine;

pub async fn down(config: &Config, full: bool, yes: bool) -> Result<()> {
    let output = Output::new();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "This stops all services and deletes every file of {} on {}. \
                 This action is irreversible. Proceed?",
                config.app,
                config.host.address()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }

    let session = super::connect(config).await?;
    let engine = Engine::new(config, &session, &output);
    let result = engine.down(full).await;
    let _ = session.disconnect().await;
    result?;

    output.success("Project teardown completed successfully!");
    Ok(())
}
