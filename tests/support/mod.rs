// ABOUTME: Shared test support: a scripted fake remote session recorder.
// ABOUTME: Records every command and replays stubbed stdout keyed by substring.

// Each test binary only uses some of these helpers, so allow dead_code.
#![allow(dead_code)]

use async_trait::async_trait;
use capstan::config::Config;
use capstan::ssh::{self, CommandOutput, Remote, RunOpts};
use std::path::Path;
use std::sync::Mutex;

/// In-memory stand-in for an SSH session. Commands are recorded in order;
/// stdout and failures are scripted by substring match, first match wins.
#[derive(Default)]
pub struct FakeRemote {
    commands: Mutex<Vec<String>>,
    stubs: Mutex<Vec<(String, String)>>,
    failures: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` for any command containing `needle`.
    pub fn stub(&self, needle: &str, stdout: &str) {
        self.stubs
            .lock()
            .unwrap()
            .push((needle.to_string(), stdout.to_string()));
    }

    /// Make any command containing `needle` exit non-zero.
    pub fn fail_matching(&self, needle: &str) {
        self.failures.lock().unwrap().push(needle.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands()
            .iter()
            .any(|command| command.contains(needle))
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn exec(&self, command: &str, opts: RunOpts) -> ssh::Result<CommandOutput> {
        self.commands.lock().unwrap().push(command.to_string());

        let failed = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|needle| command.contains(needle.as_str()));
        if failed {
            if opts.tolerate_failure {
                return Ok(CommandOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
            return Err(ssh::Error::CommandFailed {
                command: command.to_string(),
                exit_code: 1,
                stderr: String::new(),
            });
        }

        let stdout = self
            .stubs
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }

    async fn put(&self, local: &Path, remote: &str) -> ssh::Result<()> {
        self.commands
            .lock()
            .unwrap()
            .push(format!("put {} {}", local.display(), remote));
        Ok(())
    }
}

/// App directory matching the test configs below.
pub const APP_DIR: &str = "/home/testuser/.local/share/capstan/testapp";

/// Binary-mode config: web process plus a two-replica worker. The distfile
/// lives under `dist_dir` so preflight checks can be satisfied with a real
/// file.
pub fn binary_config(dist_dir: &Path) -> Config {
    let yaml = format!(
        r#"
app: testapp
version: 0.1.0
build_command: "true"
installation_mode: binary
distfile: {dir}/testapp-{{version}}.bin
webserver:
  upstream: localhost:8000
  type: caddy
processes:
  web:
    command: testapp server
  worker:
    command: testapp worker
    replicas: 2
host:
  domain_name: testapp.example.com
  user: testuser
  env: "DEBUG=false"
"#,
        dir = dist_dir.display()
    );
    Config::from_yaml(&yaml).unwrap()
}

/// Python-package config with a requirements manifest.
pub fn package_config(dist_dir: &Path, requirements: &Path) -> Config {
    let yaml = format!(
        r#"
app: testapp
version: 0.1.0
python_version: "3.12"
build_command: "true"
installation_mode: python-package
distfile: {dir}/testapp-{{version}}-py3-none-any.whl
requirements: {reqs}
webserver:
  upstream: localhost:8000
  type: caddy
processes:
  web:
    command: .venv/bin/gunicorn testapp.wsgi:application
host:
  domain_name: testapp.example.com
  user: testuser
  env: "DEBUG=false"
"#,
        dir = dist_dir.display(),
        reqs = requirements.display()
    );
    Config::from_yaml(&yaml).unwrap()
}

/// Create the artifact file the config's distfile pattern points at.
pub fn write_artifact(config: &Config, version: &str) {
    let path = config.distfile_path(version);
    std::fs::write(path, b"artifact").unwrap();
}
