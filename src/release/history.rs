// ABOUTME: The version history log: one remote text file, newest first.
// ABOUTME: All mutations are whole-line prepends, range deletions, or no-ops.

use crate::error::{Error, Result};
use crate::ssh::{Remote, RunOpts, Scoped};

const HISTORY_FILE: &str = ".versions";

/// File-backed release history for one app on one host.
///
/// The first line is the currently active release; an empty or absent file
/// means nothing has been deployed yet.
pub struct VersionHistory<'a, R: Remote + ?Sized> {
    remote: &'a R,
    app_dir: String,
}

impl<'a, R: Remote + ?Sized> VersionHistory<'a, R> {
    pub fn new(remote: &'a R, app_dir: impl Into<String>) -> Self {
        Self {
            remote,
            app_dir: app_dir.into(),
        }
    }

    fn scope(&self) -> Scoped<'_, R> {
        Scoped::new(self.remote, &self.app_dir)
    }

    /// The currently active release, if any.
    pub async fn head(&self) -> Result<Option<String>> {
        let output = self
            .scope()
            .run(&format!("head -n 1 {HISTORY_FILE}"), RunOpts::tolerant())
            .await?;
        let head = output.stdout.trim();
        if !output.success() || head.is_empty() {
            return Ok(None);
        }
        Ok(Some(head.to_string()))
    }

    /// All recorded entries, newest first.
    pub async fn entries(&self) -> Result<Vec<String>> {
        let output = self
            .scope()
            .run(&format!("cat {HISTORY_FILE}"), RunOpts::tolerant())
            .await?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse_lines(&output.stdout))
    }

    /// Entries after the current head, i.e. rollback candidates.
    pub async fn candidates(&self) -> Result<Vec<String>> {
        let output = self
            .scope()
            .run(
                &format!("sed -n '2,$p' {HISTORY_FILE}"),
                RunOpts::tolerant(),
            )
            .await?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse_lines(&output.stdout))
    }

    /// Prepend `version` unless it is already the head. Keeps the
    /// no-duplicate-head invariant for repeated deploys of one version.
    pub async fn prepend_if_new_head(&self, version: &str) -> Result<()> {
        match self.head().await? {
            Some(head) if head == version => Ok(()),
            Some(_) => {
                self.scope()
                    .run(
                        &format!("sed -i '1i {version}' {HISTORY_FILE}"),
                        RunOpts::default(),
                    )
                    .await?;
                Ok(())
            }
            None => {
                self.scope()
                    .run(
                        &format!("echo '{version}' > {HISTORY_FILE}"),
                        RunOpts::default(),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    /// Entries beyond the `keep` most recent ones.
    pub async fn beyond(&self, keep: usize) -> Result<Vec<String>> {
        let output = self
            .scope()
            .run(
                &format!("sed -n '{},$p' {HISTORY_FILE}", keep + 1),
                RunOpts::tolerant(),
            )
            .await?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(parse_lines(&output.stdout))
    }

    /// Truncate the log to its `keep` most recent entries.
    pub async fn truncate(&self, keep: usize) -> Result<()> {
        self.scope()
            .run(
                &format!("sed -i '{},$d' {HISTORY_FILE}", keep + 1),
                RunOpts::tolerant(),
            )
            .await?;
        Ok(())
    }

    /// Remove every entry strictly newer than `target`, making it the head.
    /// Returns the removed entries, newest first. The range is computed
    /// locally from a fresh read so the delete is a single line-range
    /// operation and cannot duplicate the target.
    pub async fn drop_newer_than(&self, target: &str) -> Result<Vec<String>> {
        let entries = self.entries().await?;
        let Some(index) = entries.iter().position(|entry| entry == target) else {
            return Err(Error::VersionNotInHistory(target.to_string()));
        };
        if index == 0 {
            return Ok(Vec::new());
        }
        self.scope()
            .run(
                &format!("sed -i '1,{index}d' {HISTORY_FILE}"),
                RunOpts::default(),
            )
            .await?;
        Ok(entries[..index].to_vec())
    }
}

fn parse_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
