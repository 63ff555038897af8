// ABOUTME: Hooks system for deployment lifecycle events.
// ABOUTME: Runs user-declared commands remotely inside the app environment.

use serde::Deserialize;

use crate::error::Result;
use crate::ssh::{Remote, RunOpts, Scoped};

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before files are transferred. Failure aborts deployment.
    PreDeploy,
    /// After a successful deployment.
    PostDeploy,
    /// Before teardown starts removing remote state.
    PreTeardown,
    /// After teardown finished. Runs outside the app directory, which no
    /// longer exists at that point.
    PostTeardown,
}

impl HookPoint {
    pub fn key(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre_deploy",
            HookPoint::PostDeploy => "post_deploy",
            HookPoint::PreTeardown => "pre_teardown",
            HookPoint::PostTeardown => "post_teardown",
        }
    }
}

/// Hook commands declared in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hooks {
    #[serde(default)]
    pub pre_deploy: Option<String>,
    #[serde(default)]
    pub post_deploy: Option<String>,
    #[serde(default)]
    pub pre_teardown: Option<String>,
    #[serde(default)]
    pub post_teardown: Option<String>,
}

impl Hooks {
    pub fn get(&self, point: HookPoint) -> Option<&str> {
        match point {
            HookPoint::PreDeploy => self.pre_deploy.as_deref(),
            HookPoint::PostDeploy => self.post_deploy.as_deref(),
            HookPoint::PreTeardown => self.pre_teardown.as_deref(),
            HookPoint::PostTeardown => self.post_teardown.as_deref(),
        }
    }
}

/// Runs declared hooks on the remote host.
pub struct HookRunner<'a, R: Remote + ?Sized> {
    remote: &'a R,
    hooks: &'a Hooks,
    app_dir: String,
}

impl<'a, R: Remote + ?Sized> HookRunner<'a, R> {
    pub fn new(remote: &'a R, hooks: &'a Hooks, app_dir: impl Into<String>) -> Self {
        Self {
            remote,
            hooks,
            app_dir: app_dir.into(),
        }
    }

    /// Run the hook for the given point if one is declared.
    ///
    /// Returns whether a hook actually ran. Hook failures propagate as
    /// remote command errors; the engine never marks hook steps tolerant.
    pub async fn run(&self, point: HookPoint) -> Result<bool> {
        let Some(command) = self.hooks.get(point) else {
            return Ok(false);
        };

        tracing::info!(hook = point.key(), command, "running hook");

        if point == HookPoint::PostTeardown {
            // The app directory and its .env are gone by now.
            self.remote.run(command, RunOpts::default()).await?;
        } else {
            let scoped = Scoped::new(self.remote, &self.app_dir);
            scoped
                .run(&format!("source .env && {command}"), RunOpts::default())
                .await?;
        }
        Ok(true)
    }
}
