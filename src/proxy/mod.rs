// ABOUTME: Reverse proxy adapter interface and compile-time backend registry.
// ABOUTME: Backends are selected by config key and resolved once at startup.

mod caddy;
mod none;

pub use caddy::CaddyProxy;
pub use none::NoneProxy;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::Result;
use crate::ssh::Remote;

/// Reverse proxy backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Caddy,
    /// Disables proxy management entirely.
    None,
}

/// Operations a reverse proxy backend must support. `setup`/`teardown`
/// manage this app's routes; `install`/`uninstall` manage the shared proxy
/// process itself.
#[async_trait]
pub trait ReverseProxy: Send + Sync {
    async fn install(&self) -> Result<()>;
    async fn uninstall(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn setup(&self) -> Result<()>;
    async fn teardown(&self) -> Result<()>;
    async fn status(&self) -> Result<()>;
    async fn logs(&self) -> Result<()>;
}

/// Resolve the configured backend to an adapter instance.
pub fn create<'a, R: Remote + ?Sized>(
    remote: &'a R,
    config: &'a Config,
) -> Box<dyn ReverseProxy + 'a> {
    if !config.webserver.enabled {
        return Box::new(NoneProxy);
    }
    match config.webserver.kind {
        ProxyKind::Caddy => Box::new(CaddyProxy::new(remote, config)),
        ProxyKind::None => Box::new(NoneProxy),
    }
}
