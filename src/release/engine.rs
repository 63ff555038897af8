// ABOUTME: The release and orchestration engine.
// ABOUTME: Sequences deploy, redeploy, rollback, prune, up, and down phases.

use super::fingerprint;
use super::history::VersionHistory;
use crate::config::{Config, InstallMode};
use crate::error::{Error, Result};
use crate::hooks::{HookPoint, HookRunner};
use crate::output::Output;
use crate::proxy::{self, ReverseProxy};
use crate::secrets::{self, SecretConfig};
use crate::ssh::{Remote, RunOpts, Scoped, shell_quote};
use crate::supervisor::Systemd;

/// Drives all remote mutations for one app on one host. One engine
/// instance runs one sequential invocation; phases are idempotent so an
/// interrupted run is recovered by re-running the same operation.
pub struct Engine<'a, R: Remote + ?Sized> {
    config: &'a Config,
    remote: &'a R,
    output: &'a Output,
}

impl<'a, R: Remote + ?Sized> Engine<'a, R> {
    pub fn new(config: &'a Config, remote: &'a R, output: &'a Output) -> Self {
        Self {
            config,
            remote,
            output,
        }
    }

    fn history(&self) -> VersionHistory<'a, R> {
        VersionHistory::new(self.remote, self.config.app_dir())
    }

    fn supervisor(&self) -> Systemd<'a, R> {
        Systemd::new(self.remote, self.config)
    }

    fn proxy(&self) -> Box<dyn ReverseProxy + 'a> {
        proxy::create(self.remote, self.config)
    }

    fn hook_runner(&self) -> HookRunner<'a, R> {
        HookRunner::new(self.remote, &self.config.hooks, self.config.app_dir())
    }

    fn app_scope(&self) -> Scoped<'a, R> {
        Scoped::new(self.remote, self.config.app_dir())
    }

    fn app_env_scope(&self) -> Scoped<'a, R> {
        Scoped::new(self.remote, self.config.app_dir()).with_prefix("source .appenv")
    }

    /// Full deployment of `version` (defaults to the configured version).
    pub async fn deploy(&self, version: Option<&str>) -> Result<()> {
        let version = version.unwrap_or(&self.config.version);

        let env_text = self.resolve_env().await?;
        self.build_locally().await?;
        self.preflight(version)?;

        self.output.progress("Installing project on remote");
        self.remote
            .run(
                &format!("mkdir -p {}", self.config.app_dir()),
                RunOpts::default(),
            )
            .await?;
        self.write_env_file(&env_text).await?;

        self.hook_runner().run(HookPoint::PreDeploy).await?;
        self.install_project(version, false).await?;

        self.output.progress("Setting up systemd services");
        let supervisor = self.supervisor();
        supervisor.install_services().await?;

        self.output.progress("Restarting services");
        supervisor.restart_services().await?;

        self.output.progress("Publishing proxy routes");
        self.proxy().setup().await?;

        self.history().prepend_if_new_head(version).await?;

        self.hook_runner().run(HookPoint::PostDeploy).await?;

        self.prune(self.config.versions_to_keep).await?;

        self.output.progress(&format!(
            "Access the deployed project at: https://{}",
            self.config.host.domain_name
        ));
        Ok(())
    }

    /// Code/env-only redeploy: transfer, install decision, release command,
    /// restart. Skips unit regeneration and proxy republish.
    pub async fn redeploy(&self) -> Result<()> {
        let version = self.config.version.as_str();

        let env_text = self.resolve_env().await?;
        self.build_locally().await?;
        self.preflight(version)?;

        self.write_env_file(&env_text).await?;
        self.hook_runner().run(HookPoint::PreDeploy).await?;
        self.install_project(version, false).await?;

        self.output.progress("Restarting services");
        self.supervisor().restart_services().await?;

        self.history().prepend_if_new_head(version).await?;
        self.hook_runner().run(HookPoint::PostDeploy).await?;
        Ok(())
    }

    /// Versions eligible as rollback targets: every entry after the head.
    pub async fn rollback_candidates(&self) -> Result<Vec<String>> {
        self.history().candidates().await
    }

    /// Roll back to `target`, which must be a recorded entry below the head
    /// whose release directory still exists on the host.
    pub async fn rollback(&self, target: &str) -> Result<()> {
        let history = self.history();
        let candidates = history.candidates().await?;
        if candidates.is_empty() {
            return Err(Error::NoRollbackCandidates);
        }
        if !candidates.iter().any(|candidate| candidate == target) {
            return Err(Error::VersionNotInHistory(target.to_string()));
        }

        let release_dir = self.config.release_dir(target);
        let check = self
            .remote
            .run(&format!("test -d {release_dir}"), RunOpts::tolerant())
            .await?;
        if !check.success() {
            return Err(Error::ReleaseNotFound(target.to_string()));
        }

        self.output
            .progress(&format!("Reinstalling version {target}"));
        self.install_project(target, true).await?;

        self.output.progress("Restarting services");
        self.supervisor().restart_services().await?;

        let removed = history.drop_newer_than(target).await?;
        for version in &removed {
            self.remote
                .run(
                    &format!("rm -r {}", self.config.release_dir(version)),
                    RunOpts::tolerant(),
                )
                .await?;
        }
        Ok(())
    }

    /// Delete releases beyond the retention count and truncate the history
    /// to match. Retention never drops below one: the head always survives.
    pub async fn prune(&self, keep: Option<usize>) -> Result<()> {
        let Some(keep) = keep else {
            return Ok(());
        };
        let keep = keep.max(1);

        let history = self.history();
        let stale = history.beyond(keep).await?;
        if stale.is_empty() {
            return Ok(());
        }

        self.output.progress("Pruning old project versions");
        let dirs: Vec<String> = stale
            .iter()
            .map(|version| self.config.release_dir(version))
            .collect();
        self.remote
            .run(&format!("rm -r {}", dirs.join(" ")), RunOpts::tolerant())
            .await?;
        history.truncate(keep).await?;
        Ok(())
    }

    /// Bootstrap a fresh host, then deploy: base directory, language
    /// tooling, and the shared proxy process.
    pub async fn up(&self) -> Result<()> {
        self.output.progress("Bootstrapping server");
        self.remote
            .run(
                &format!("mkdir -p {}", self.config.host.apps_dir_abs()),
                RunOpts::default(),
            )
            .await?;

        if self.config.installation_mode == InstallMode::PythonPackage {
            let check = self
                .remote
                .run("command -v uv", RunOpts::tolerant())
                .await?;
            if !check.success() {
                self.output.progress("Installing uv");
                self.remote
                    .run(
                        "curl -LsSf https://astral.sh/uv/install.sh | sh",
                        RunOpts::default(),
                    )
                    .await?;
            }
        }

        self.proxy().install().await?;
        self.deploy(None).await
    }

    /// Tear down all remote app state. `full` additionally uninstalls the
    /// shared proxy process; without it other apps keep being served.
    pub async fn down(&self, full: bool) -> Result<()> {
        self.hook_runner().run(HookPoint::PreTeardown).await?;

        self.output.progress("Removing project files");
        self.remote
            .run(
                &format!("rm -rf {}", self.config.app_dir()),
                RunOpts::default(),
            )
            .await?;

        self.proxy().teardown().await?;
        self.supervisor().uninstall_services().await?;
        self.hook_runner().run(HookPoint::PostTeardown).await?;

        if full {
            self.output.progress("Uninstalling proxy");
            self.proxy().uninstall().await?;
        }
        Ok(())
    }

    /// Resolve secret references in the configured environment text.
    async fn resolve_env(&self) -> Result<String> {
        let env_text = self.config.host.env_text()?;
        match &self.config.secrets {
            Some(secret_config) => {
                self.output.progress("Resolving secrets");
                secrets::resolve_env(&env_text, secret_config).await
            }
            None => secrets::resolve_env(&env_text, &SecretConfig::default()).await,
        }
    }

    /// Run the local build command. A non-zero exit aborts before any
    /// remote mutation.
    async fn build_locally(&self) -> Result<()> {
        self.output.progress("Building application");
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.config.build_command)
            .status()
            .await
            .map_err(|_| Error::Build {
                command: self.config.build_command.clone(),
                code: None,
            })?;
        if !status.success() {
            return Err(Error::Build {
                command: self.config.build_command.clone(),
                code: status.code(),
            });
        }
        Ok(())
    }

    /// Verify the build produced everything that will be transferred.
    fn preflight(&self, version: &str) -> Result<()> {
        if let Some(requirements) = &self.config.requirements
            && !requirements.exists()
        {
            return Err(Error::MissingFile(requirements.clone()));
        }
        let distfile = self.config.distfile_path(version);
        if !distfile.exists() {
            return Err(Error::MissingFile(distfile));
        }
        Ok(())
    }

    async fn write_env_file(&self, env_text: &str) -> Result<()> {
        self.remote
            .run(
                &format!(
                    "echo {} > {}/.env",
                    shell_quote(env_text),
                    self.config.app_dir()
                ),
                RunOpts::default(),
            )
            .await?;
        Ok(())
    }

    /// Create the release directory, transfer artifacts, and install. When
    /// rolling back the artifacts already sit in the target release
    /// directory, so transfer is skipped and the dependency environment is
    /// rebuilt unconditionally from the manifest copy recorded there.
    async fn install_project(&self, version: &str, rolling_back: bool) -> Result<()> {
        let release_dir = self.config.release_dir(version);
        self.remote
            .run(&format!("mkdir -p {release_dir}"), RunOpts::default())
            .await?;

        self.write_app_env().await?;

        let distfile = self.config.distfile_path(version);
        let artifact_name = distfile
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidConfig(format!("invalid distfile path: {}", distfile.display())))?;
        let remote_artifact = format!("{release_dir}/{artifact_name}");

        if !rolling_back {
            self.remote.put(&distfile, &remote_artifact).await?;
        }

        match self.config.installation_mode {
            InstallMode::PythonPackage => {
                self.install_python_package(version, &release_dir, &remote_artifact, rolling_back)
                    .await?;
            }
            InstallMode::Binary => {
                self.install_binary(&remote_artifact).await?;
            }
        }

        if let Some(release_command) = &self.config.release_command {
            self.output.progress("Running release command");
            self.app_env_scope()
                .run(release_command, RunOpts::default())
                .await?;
        }
        Ok(())
    }

    /// Regenerate the sourced app environment file.
    async fn write_app_env(&self) -> Result<()> {
        let body = match self.config.installation_mode {
            InstallMode::PythonPackage => {
                let python_version = self.config.python_version.as_deref().ok_or_else(|| {
                    Error::InvalidConfig("python_version is required for python-package installations".to_string())
                })?;
                format!(
                    "set -a\nsource .env\nset +a\nexport UV_COMPILE_BYTECODE=1\nexport UV_PYTHON=python{python_version}\nexport PATH=\".venv/bin:$PATH\""
                )
            }
            InstallMode::Binary => format!(
                "set -a\nsource .env\nset +a\nexport PATH=\"{}:$PATH\"",
                self.config.app_dir()
            ),
        };
        self.remote
            .run(
                &format!(
                    "echo {} > {}/.appenv",
                    shell_quote(&body),
                    self.config.app_dir()
                ),
                RunOpts::default(),
            )
            .await?;
        Ok(())
    }

    async fn install_python_package(
        &self,
        version: &str,
        release_dir: &str,
        remote_artifact: &str,
        rolling_back: bool,
    ) -> Result<()> {
        let scope = self.app_scope();
        let current_manifest = format!("{release_dir}/requirements.txt");

        // When rolling back, the manifest copy in the target release dir is
        // authoritative and the environment is rebuilt unconditionally.
        let mut rebuild = true;
        if !rolling_back && let Some(requirements) = &self.config.requirements {
            let local_hash = fingerprint::local_digest(requirements)?;

            // Compare against the release currently running on the host.
            let previous = self.history().head().await?;
            let mut remote_hash = None;
            let mut previous_manifest = None;
            if let Some(previous) = previous {
                let manifest = format!(
                    "{}/requirements.txt",
                    self.config.release_dir(&previous)
                );
                remote_hash = fingerprint::remote_digest(self.remote, &manifest).await?;
                previous_manifest = Some(manifest);
            }

            if Some(local_hash) == remote_hash {
                rebuild = false;
                // Copy the manifest forward so the new release directory
                // stays self-contained.
                if let Some(previous_manifest) = previous_manifest
                    && previous_manifest != current_manifest
                {
                    scope
                        .run(
                            &format!("cp {previous_manifest} {current_manifest}"),
                            RunOpts::default(),
                        )
                        .await?;
                }
            } else {
                self.remote.put(requirements, &current_manifest).await?;
            }
        }

        let python_version = self.config.python_version.as_deref().ok_or_else(|| {
            Error::InvalidConfig("python_version is required for python-package installations".to_string())
        })?;

        if rebuild {
            self.output.progress("Installing python packages");
            scope.run("rm -rf .venv", RunOpts::elevated()).await?;
            scope
                .run(
                    &format!("uv python install {python_version}"),
                    RunOpts::default(),
                )
                .await?;
            scope.run("uv venv", RunOpts::default()).await?;
            if self.config.requirements.is_some() {
                scope
                    .run(
                        &format!("uv pip install -r {current_manifest}"),
                        RunOpts::default(),
                    )
                    .await?;
            }
        } else {
            self.output
                .progress("Requirements unchanged, reusing virtualenv");
        }

        scope
            .run(
                &format!("uv pip install {remote_artifact}"),
                RunOpts::default(),
            )
            .await?;

        if rolling_back {
            tracing::info!(version, "reinstalled release from its own directory");
        }
        Ok(())
    }

    async fn install_binary(&self, remote_artifact: &str) -> Result<()> {
        let app_bin = format!("{}/{}", self.config.app_dir(), self.config.app_bin());
        // the link may not exist on a first deploy
        self.remote
            .run(&format!("rm {app_bin}"), RunOpts::tolerant())
            .await?;
        self.remote
            .run(
                &format!("ln -s {remote_artifact} {app_bin}"),
                RunOpts::default(),
            )
            .await?;
        Ok(())
    }

    /// Run an arbitrary command through the installed app binary.
    pub async fn app_exec(&self, command: &str, interactive: bool) -> Result<Option<String>> {
        let scope = self.app_env_scope();
        let full = format!("{} {command}", self.config.app_bin());
        if interactive {
            scope.run(&full, RunOpts::interactive()).await?;
            Ok(None)
        } else {
            let output = scope.run(&full, RunOpts::default()).await?;
            Ok(Some(output.stdout))
        }
    }
}
