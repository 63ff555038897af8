// ABOUTME: Requirements fingerprinting to decide whether the dependency
// ABOUTME: environment must be rebuilt: local sha256 vs the remote manifest copy.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;
use crate::ssh::{Remote, RunOpts};

/// Content hash of the local dependency manifest.
pub fn local_digest(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Content hash of a remote file, or None when the file does not exist.
pub async fn remote_digest<R: Remote + ?Sized>(remote: &R, path: &str) -> Result<Option<String>> {
    let output = remote
        .run(&format!("sha256sum {path}"), RunOpts::tolerant())
        .await?;
    if !output.success() {
        return Ok(None);
    }
    Ok(output
        .stdout
        .trim()
        .split_whitespace()
        .next()
        .map(String::from))
}
