// ABOUTME: Process supervisor adapter for systemd over the remote session.
// ABOUTME: Installs generated units, reconciles stale ones, and drives service state.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ssh::{Remote, RunOpts, shell_quote};
use crate::tasks;
use crate::units::{
    ServiceUnit, UnitContext, UnitGenerator, desired_service_names, enable_targets,
    instance_service_names,
};

const UNIT_DIR: &str = "/etc/systemd/system";

/// Systemd adapter bound to one app on one remote host.
pub struct Systemd<'a, R: Remote + ?Sized> {
    remote: &'a R,
    config: &'a Config,
    units: BTreeMap<String, ServiceUnit>,
    service_names: Vec<String>,
    enable_names: Vec<String>,
}

impl<'a, R: Remote + ?Sized> Systemd<'a, R> {
    pub fn new(remote: &'a R, config: &'a Config) -> Self {
        let app = config.app.to_string();
        let ctx = UnitContext {
            app: app.clone(),
            user: config.host.user.clone(),
            app_dir: config.app_dir(),
        };
        let generator = UnitGenerator::new(config.local_config_dir());
        let units = generator.generate(&config.processes, &ctx);
        let service_names = desired_service_names(&app, &config.processes);
        let enable_names = enable_targets(&app, &config.processes);

        Self {
            remote,
            config,
            units,
            service_names,
            enable_names,
        }
    }

    /// The full desired service-name set for this app.
    pub fn service_names(&self) -> &[String] {
        &self.service_names
    }

    /// Generated unit files, keyed by filename.
    pub fn units(&self) -> &BTreeMap<String, ServiceUnit> {
        &self.units
    }

    /// Write all unit files, reload, enable the desired set, then sweep
    /// stale files and stale loaded instances left by previous releases.
    pub async fn install_services(&self) -> Result<()> {
        for (filename, unit) in &self.units {
            // sudo sits inside the pipeline so it applies to tee, not echo
            self.remote
                .run(
                    &format!(
                        "echo {} | sudo tee {UNIT_DIR}/{filename} > /dev/null",
                        shell_quote(&unit.body)
                    ),
                    RunOpts::interactive(),
                )
                .await?;
        }

        self.reload().await?;

        let enables: Vec<_> = self
            .enable_names
            .iter()
            .map(|name| async move {
                self.remote
                    .run(
                        &format!("systemctl enable --now {name}"),
                        RunOpts {
                            elevate: true,
                            interactive: true,
                            tolerate_failure: false,
                        },
                    )
                    .await
            })
            .collect();
        tasks::join_all_limit(enables, tasks::DEFAULT_CONCURRENCY).await?;

        self.sweep_stale_files().await?;
        self.sweep_stale_instances().await?;
        Ok(())
    }

    /// Remove unit files matching the app prefix that were not part of the
    /// freshly written set. Template stems (`@.service`) expand to every
    /// numbered instance when disabling.
    async fn sweep_stale_files(&self) -> Result<()> {
        let app = self.config.app.as_str();
        let listing = self
            .remote
            .run(&format!("ls {UNIT_DIR}/{app}*"), RunOpts::tolerant())
            .await?;
        if !listing.success() {
            return Ok(());
        }

        for path in listing.stdout.split_whitespace() {
            let filename = path.rsplit('/').next().unwrap_or(path);
            if self.units.contains_key(filename) || !filename.starts_with(app) {
                continue;
            }
            tracing::warn!(filename, "removing stale unit file");
            let target = if filename.contains("@.service") {
                filename.replace("@.service", "@*.service")
            } else {
                filename.to_string()
            };
            self.remote
                .run(
                    &format!("systemctl disable --now '{target}'"),
                    RunOpts::elevated_tolerant(),
                )
                .await?;
            self.remote
                .run(&format!("rm {path}"), RunOpts::elevated_tolerant())
                .await?;
        }
        Ok(())
    }

    /// Disable loaded unit instances that no longer correspond to a desired
    /// name, e.g. after a replica count decrease.
    async fn sweep_stale_instances(&self) -> Result<()> {
        let app = self.config.app.as_str();
        let listing = self
            .remote
            .run(
                &format!("systemctl list-units --full --all --plain --no-legend '{app}*'"),
                RunOpts::tolerant(),
            )
            .await?;
        if !listing.success() {
            return Ok(());
        }

        for line in listing.stdout.lines() {
            let Some(unit) = line.split_whitespace().next() else {
                continue;
            };
            if self.service_names.iter().any(|name| name == unit) {
                continue;
            }
            tracing::warn!(unit, "stopping stale unit");
            self.remote
                .run(
                    &format!("systemctl disable --now {unit}"),
                    RunOpts::elevated_tolerant(),
                )
                .await?;
        }
        Ok(())
    }

    /// Stop and disable every known service, remove the unit files, then
    /// reload and clear failed-unit bookkeeping.
    pub async fn uninstall_services(&self) -> Result<()> {
        for name in &self.service_names {
            self.remote
                .run(
                    &format!("systemctl stop {name}"),
                    RunOpts::elevated_tolerant(),
                )
                .await?;
            self.remote
                .run(
                    &format!("systemctl disable {name}"),
                    RunOpts::elevated_tolerant(),
                )
                .await?;
        }
        for filename in self.units.keys() {
            self.remote
                .run(
                    &format!("rm {UNIT_DIR}/{filename}"),
                    RunOpts::elevated_tolerant(),
                )
                .await?;
        }
        self.reload().await?;
        self.remote
            .run("systemctl reset-failed", RunOpts::elevated_tolerant())
            .await?;
        Ok(())
    }

    pub async fn start_services(&self) -> Result<()> {
        self.service_action_all("start").await
    }

    pub async fn stop_services(&self) -> Result<()> {
        self.service_action_all("stop").await
    }

    pub async fn restart_services(&self) -> Result<()> {
        self.service_action_all("restart").await
    }

    /// Apply a systemctl action over the full desired set with bounded
    /// fan-out; every attempt runs even if one fails.
    async fn service_action_all(&self, action: &str) -> Result<()> {
        self.service_action(&self.service_names, action).await
    }

    pub async fn service_action(&self, names: &[String], action: &str) -> Result<()> {
        let commands: Vec<_> = names
            .iter()
            .map(|name| async move {
                self.remote
                    .run(
                        &format!("systemctl {action} {name}"),
                        RunOpts {
                            elevate: true,
                            interactive: true,
                            tolerate_failure: false,
                        },
                    )
                    .await
            })
            .collect();
        tasks::join_all_limit(commands, tasks::DEFAULT_CONCURRENCY).await?;
        Ok(())
    }

    /// Resolve a user-supplied name to concrete service names: a process
    /// name expands to its instances, a literal unit name passes through,
    /// absence means the full set.
    pub fn resolve_names(&self, name: Option<&str>) -> Result<Vec<String>> {
        let Some(name) = name else {
            return Ok(self.service_names.clone());
        };
        if let Some(spec) = self.config.processes.get(name) {
            return Ok(instance_service_names(
                self.config.app.as_str(),
                name,
                spec,
            ));
        }
        if name.ends_with(".service") || name.ends_with(".socket") || name.ends_with(".timer") {
            return Ok(vec![name.to_string()]);
        }
        let mut options: Vec<String> = self.config.processes.keys().cloned().collect();
        options.sort();
        Err(Error::UnknownService {
            name: name.to_string(),
            options,
        })
    }

    /// Stream journal entries for one unit.
    pub async fn service_logs(&self, unit: &str, follow: bool) -> Result<()> {
        let follow_flag = if follow { " -f" } else { "" };
        self.remote
            .run(
                &format!("journalctl -u {unit} -r{follow_flag}"),
                RunOpts {
                    elevate: true,
                    interactive: true,
                    tolerate_failure: false,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn reload(&self) -> Result<()> {
        self.remote
            .run("systemctl daemon-reload", RunOpts::elevated())
            .await?;
        Ok(())
    }
}
