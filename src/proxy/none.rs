// ABOUTME: No-op proxy backend for deployments without a managed reverse proxy.

use async_trait::async_trait;

use super::ReverseProxy;
use crate::error::Result;

pub struct NoneProxy;

#[async_trait]
impl ReverseProxy for NoneProxy {
    async fn install(&self) -> Result<()> {
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn setup(&self) -> Result<()> {
        tracing::debug!("proxy disabled, skipping route setup");
        Ok(())
    }

    async fn teardown(&self) -> Result<()> {
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        Ok(())
    }

    async fn logs(&self) -> Result<()> {
        Ok(())
    }
}
