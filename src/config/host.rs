// ABOUTME: Remote host configuration.
// ABOUTME: Connection coordinates, environment source, and the apps directory.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ssh::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Address used for the SSH connection. Defaults to the domain name.
    #[serde(default)]
    pub ip: Option<String>,

    /// Domain name pointing at this host; used for proxy routing.
    pub domain_name: String,

    /// Login user for remote tasks. Expected to have passwordless sudo.
    pub user: String,

    /// Path to a local env file copied to the host as `.env`.
    #[serde(default)]
    pub envfile: Option<PathBuf>,

    /// Inline env content; mutually exclusive with `envfile`.
    #[serde(default, rename = "env")]
    pub env_content: Option<String>,

    /// Base directory for app storage, relative to the user's home.
    #[serde(default = "default_apps_dir")]
    pub apps_dir: String,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// Path to the SSH private key file for authentication.
    #[serde(default)]
    pub key_filename: Option<PathBuf>,

    /// Timeout for individual remote commands.
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_apps_dir() -> String {
    ".local/share/capstan".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.envfile.is_some() && self.env_content.is_some() {
            return Err(Error::InvalidConfig(
                "cannot set both 'env' and 'envfile' properties".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection address: explicit ip, or the domain name.
    pub fn address(&self) -> &str {
        self.ip.as_deref().unwrap_or(&self.domain_name)
    }

    /// Absolute apps directory on the host.
    pub fn apps_dir_abs(&self) -> String {
        format!("/home/{}/{}", self.user, self.apps_dir)
    }

    /// Environment text destined for the remote `.env` file.
    pub fn env_text(&self) -> Result<String> {
        if let Some(path) = &self.envfile {
            if !path.exists() {
                return Err(Error::MissingFile(path.clone()));
            }
            return Ok(std::fs::read_to_string(path)?.trim().to_string());
        }
        Ok(self
            .env_content
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.address(), &self.user)
            .port(self.ssh_port)
            .command_timeout(self.command_timeout);
        if let Some(key) = &self.key_filename {
            config = config.key_path(key.clone());
        }
        config
    }
}
