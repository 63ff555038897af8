// ABOUTME: Proxy management command handlers.

use crate::cli::ProxyCommands;
use crate::config::Config;
use crate::error::Result;
use crate::proxy;

pub async fn proxy(config: &Config, command: ProxyCommands) -> Result<()> {
    let session = super::connect(config).await?;
    let backend = proxy::create(&session, config);

    let result = match command {
        ProxyCommands::Install => backend.install().await,
        ProxyCommands::Uninstall => backend.uninstall().await,
        ProxyCommands::Start => backend.start().await,
        ProxyCommands::Stop => backend.stop().await,
        ProxyCommands::Status => backend.status().await,
        ProxyCommands::Logs => backend.logs().await,
    };
    drop(backend);

    let _ = session.disconnect().await;
    result
}
