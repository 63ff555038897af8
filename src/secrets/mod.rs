// ABOUTME: Secret reference resolution for environment text.
// ABOUTME: Values beginning with $ are looked up through the configured adapter.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tasks;

/// Where secret references are resolved from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretAdapter {
    /// Resolve references from the local process environment.
    #[default]
    System,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub adapter: SecretAdapter,
}

/// Resolve secret references in env-file text.
///
/// Lines are `KEY=VALUE`; a value starting with `$` names a secret to be
/// fetched through the adapter. Lookups are dispatched with join-all
/// fan-out; the output preserves the input key order and quotes every
/// value.
pub async fn resolve_env(env_text: &str, config: &SecretConfig) -> Result<String> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for line in env_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::InvalidConfig(format!(
                "malformed env line: {line}"
            )));
        };
        let value = value.trim().trim_matches('"').to_string();
        entries.push((key.trim().to_string(), value));
    }

    let lookups: Vec<_> = entries
        .iter()
        .enumerate()
        .filter(|(_, (_, value))| value.starts_with('$'))
        .map(|(idx, (_, value))| {
            let adapter = config.adapter;
            let reference = value[1..].to_string();
            async move { fetch(adapter, &reference).await.map(|v| (idx, v)) }
        })
        .collect();

    for (idx, resolved) in tasks::join_all_limit(lookups, tasks::DEFAULT_CONCURRENCY).await? {
        entries[idx].1 = resolved;
    }

    Ok(entries
        .iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect::<Vec<_>>()
        .join("\n"))
}

async fn fetch(adapter: SecretAdapter, reference: &str) -> Result<String> {
    match adapter {
        SecretAdapter::System => {
            std::env::var(reference).map_err(|_| Error::MissingEnvVar(reference.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_literal_values() {
        let resolved = resolve_env("DEBUG=false\nPORT=8000", &SecretConfig::default())
            .await
            .unwrap();
        assert_eq!(resolved, "DEBUG=\"false\"\nPORT=\"8000\"");
    }

    #[tokio::test]
    async fn resolves_references_from_process_env() {
        // SAFETY: test-only mutation of this process's environment.
        unsafe { std::env::set_var("CAPSTAN_TEST_SECRET", "s3cret") };
        let resolved = resolve_env("API_KEY=$CAPSTAN_TEST_SECRET", &SecretConfig::default())
            .await
            .unwrap();
        assert_eq!(resolved, "API_KEY=\"s3cret\"");
    }

    #[tokio::test]
    async fn missing_reference_is_an_error() {
        let err = resolve_env("X=$CAPSTAN_TEST_NO_SUCH_VAR", &SecretConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(_)));
    }

    #[tokio::test]
    async fn skips_comments_and_blank_lines() {
        let resolved = resolve_env("# comment\n\nA=1", &SecretConfig::default())
            .await
            .unwrap();
        assert_eq!(resolved, "A=\"1\"");
    }
}
