// ABOUTME: Init command: writes a sample configuration file.

use std::path::Path;

use crate::config::CONFIG_FILENAME;
use crate::error::{Error, Result};
use crate::output::Output;
use crate::types::AppName;

pub fn init(dir: &Path) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);
    if config_path.exists() {
        return Err(Error::AlreadyExists(config_path));
    }

    let guessed = dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("myapp")
        .to_lowercase()
        .replace([' ', '.'], "-");
    // directory names are only a guess; fall back when they don't make a
    // valid app name
    let app_name = match AppName::new(&guessed) {
        Ok(_) => guessed,
        Err(_) => "myapp".to_string(),
    };

    std::fs::write(&config_path, sample_config(&app_name))?;

    let output = Output::new();
    output.success("Sample configuration file generated successfully!");
    Ok(())
}

fn sample_config(app_name: &str) -> String {
    format!(
        r#"app: {app_name}
version: 0.1.0
python_version: "3.12"
build_command: uv build && uv pip compile pyproject.toml -o requirements.txt
distfile: dist/{app_name}-{{version}}-py3-none-any.whl
installation_mode: python-package
requirements: requirements.txt
release_command: {app_name} migrate

processes:
  web:
    command: .venv/bin/gunicorn {app_name}.wsgi:application --bind 0.0.0.0:8000

webserver:
  upstream: localhost:8000
  type: caddy

host:
  domain_name: {app_name}.example.com
  user: deploy
  envfile: .env.prod
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn sample_config_parses() {
        let yaml = sample_config("myapp");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.app.as_str(), "myapp");
        assert_eq!(config.version, "0.1.0");
        assert!(config.processes.contains_key("web"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        assert!(matches!(
            init(dir.path()),
            Err(Error::AlreadyExists(_))
        ));
    }
}
