// ABOUTME: Configuration types and parsing for capstan.yml.
// ABOUTME: Handles YAML parsing, validation, and derived remote paths.

mod host;
mod process;

pub use host::HostConfig;
pub use process::ProcessSpec;

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::proxy::ProxyKind;
use crate::secrets::SecretConfig;
use crate::types::AppName;

pub const CONFIG_FILENAME: &str = "capstan.yml";
pub const CONFIG_FILENAME_ALT: &str = "capstan.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".capstan/config.yml";

/// Local directory holding unit template overrides and generated samples.
pub const LOCAL_CONFIG_DIR: &str = ".capstan";

/// How the distributed artifact is installed on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    /// A self-contained executable, symlinked into the app directory.
    Binary,
    /// A Python package installed into a managed virtualenv with uv.
    PythonPackage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebserverConfig {
    /// Address the app listens on, e.g. `localhost:8000` or a unix socket.
    pub upstream: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// URL path pattern to local directory mappings served as static files.
    #[serde(default)]
    pub statics: HashMap<String, String>,

    /// Reverse proxy implementation.
    #[serde(default, rename = "type")]
    pub kind: ProxyKind,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app: AppName,

    pub version: String,

    /// Number of releases retained on the host after a deploy.
    /// Null disables pruning entirely.
    #[serde(default = "default_versions_to_keep")]
    pub versions_to_keep: Option<usize>,

    /// Python version for the managed virtualenv; required in
    /// python-package mode (falls back to a `.python-version` file).
    #[serde(default)]
    pub python_version: Option<String>,

    pub build_command: String,

    /// Command run at the end of installation, e.g. database migrations.
    #[serde(default)]
    pub release_command: Option<String>,

    pub installation_mode: InstallMode,

    /// Path to the built artifact; `{version}` is substituted.
    pub distfile: String,

    /// Path to the dependency manifest (python-package mode).
    #[serde(default)]
    pub requirements: Option<PathBuf>,

    #[serde(default)]
    pub processes: HashMap<String, ProcessSpec>,

    pub webserver: WebserverConfig,

    pub host: HostConfig,

    #[serde(default)]
    pub hooks: Hooks,

    #[serde(default)]
    pub secrets: Option<SecretConfig>,
}

fn default_versions_to_keep() -> Option<usize> {
    Some(5)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.resolve_python_version()?;
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        self.host.validate()?;
        for (name, spec) in &self.processes {
            spec.validate(name)?;
        }
        if self.webserver.enabled
            && self.webserver.kind != ProxyKind::None
            && !self.processes.contains_key("web")
        {
            return Err(Error::InvalidConfig(
                "missing web process; declare one or disable the webserver".to_string(),
            ));
        }
        if self.installation_mode == InstallMode::Binary && self.requirements.is_some() {
            return Err(Error::InvalidConfig(
                "'requirements' only applies to python-package installations".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_python_version(&mut self) -> Result<()> {
        if self.installation_mode != InstallMode::PythonPackage || self.python_version.is_some() {
            return Ok(());
        }
        let version_file = Path::new(".python-version");
        if !version_file.exists() {
            return Err(Error::InvalidConfig(
                "add a python_version key or a .python-version file".to_string(),
            ));
        }
        self.python_version = Some(std::fs::read_to_string(version_file)?.trim().to_string());
        Ok(())
    }

    /// Remote directory holding all releases of this app.
    pub fn app_dir(&self) -> String {
        format!("{}/{}", self.host.apps_dir_abs(), self.app)
    }

    /// Remote directory for one release.
    pub fn release_dir(&self, version: &str) -> String {
        format!("{}/v{}", self.app_dir(), version)
    }

    /// Local path of the built artifact for a version.
    pub fn distfile_path(&self, version: &str) -> PathBuf {
        PathBuf::from(self.distfile.replace("{version}", version))
    }

    /// Command used to invoke the installed app from the app directory.
    pub fn app_bin(&self) -> String {
        match self.installation_mode {
            InstallMode::PythonPackage => format!(".venv/bin/{}", self.app),
            InstallMode::Binary => self.app.to_string(),
        }
    }

    /// Local directory checked for unit template overrides.
    pub fn local_config_dir(&self) -> PathBuf {
        PathBuf::from(LOCAL_CONFIG_DIR)
    }
}

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}
