// ABOUTME: Remote execution layer: the Remote trait, run options, and scoped directories.
// ABOUTME: The concrete russh-backed Session lives in session.rs.

mod error;
mod session;

pub use error::{Error, Result};
pub use session::{CommandOutput, Session, SessionConfig};

use async_trait::async_trait;
use std::path::Path;

/// Options for a single remote command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOpts {
    /// Run the command with elevated privileges (sudo).
    pub elevate: bool,
    /// Treat a non-zero exit as a normal outcome instead of an error.
    pub tolerate_failure: bool,
    /// Request a pseudo-terminal for the command.
    pub interactive: bool,
}

impl RunOpts {
    pub fn elevated() -> Self {
        Self {
            elevate: true,
            ..Self::default()
        }
    }

    pub fn tolerant() -> Self {
        Self {
            tolerate_failure: true,
            ..Self::default()
        }
    }

    pub fn elevated_tolerant() -> Self {
        Self {
            elevate: true,
            tolerate_failure: true,
            interactive: false,
        }
    }

    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }
}

/// A channel to a remote host that can execute commands and transfer files.
///
/// `exec` is the raw transport; callers go through `run`, which applies
/// privilege elevation before the command reaches the transport. Scoping
/// wrappers intercept `exec` so elevation applies to the command itself,
/// not to the `cd` prefix.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Execute a fully-shaped command string on the remote host.
    async fn exec(&self, command: &str, opts: RunOpts) -> Result<CommandOutput>;

    /// Upload a local file to the given remote path.
    async fn put(&self, local: &Path, remote: &str) -> Result<()>;

    /// Execute a command, applying elevation from `opts`.
    async fn run(&self, command: &str, opts: RunOpts) -> Result<CommandOutput> {
        if opts.elevate {
            let command = format!("sudo {command}");
            self.exec(
                &command,
                RunOpts {
                    elevate: false,
                    ..opts
                },
            )
            .await
        } else {
            self.exec(command, opts).await
        }
    }
}

/// A working-directory scope over a remote channel.
///
/// Commands run through the scope are prefixed with `cd {dir} &&` (and an
/// optional extra prefix such as `source .appenv`). The scope borrows the
/// underlying channel, so it is released when dropped, including on early
/// error returns.
pub struct Scoped<'a, R: Remote + ?Sized> {
    inner: &'a R,
    dir: String,
    prefix: Option<String>,
}

impl<'a, R: Remote + ?Sized> Scoped<'a, R> {
    pub fn new(inner: &'a R, dir: impl Into<String>) -> Self {
        Self {
            inner,
            dir: dir.into(),
            prefix: None,
        }
    }

    /// Add a command prefix sourced after the directory change.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl<'a, R: Remote + ?Sized> Remote for Scoped<'a, R> {
    async fn exec(&self, command: &str, opts: RunOpts) -> Result<CommandOutput> {
        let mut full = format!("cd {} && ", self.dir);
        if let Some(prefix) = &self.prefix {
            full.push_str(prefix);
            full.push_str(" && ");
        }
        full.push_str(command);
        self.inner.exec(&full, opts).await
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        self.inner.put(local, remote).await
    }

    async fn run(&self, command: &str, opts: RunOpts) -> Result<CommandOutput> {
        // Elevate the command itself before wrapping, so sudo never applies
        // to the cd prefix.
        if opts.elevate {
            let command = format!("sudo {command}");
            self.exec(
                &command,
                RunOpts {
                    elevate: false,
                    ..opts
                },
            )
            .await
        } else {
            self.exec(command, opts).await
        }
    }
}

/// Quote a string for safe inclusion in a single-quoted shell context.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Remote for Recorder {
        async fn exec(&self, command: &str, _opts: RunOpts) -> Result<CommandOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        async fn put(&self, _local: &Path, _remote: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn scoped_prefixes_cd() {
        let recorder = Recorder {
            commands: Mutex::new(Vec::new()),
        };
        let scoped = Scoped::new(&recorder, "/srv/app");
        scoped.run("ls", RunOpts::default()).await.unwrap();
        assert_eq!(recorder.commands.lock().unwrap()[0], "cd /srv/app && ls");
    }

    #[tokio::test]
    async fn scoped_elevates_inner_command_only() {
        let recorder = Recorder {
            commands: Mutex::new(Vec::new()),
        };
        let scoped = Scoped::new(&recorder, "/srv/app").with_prefix("source .appenv");
        scoped
            .run("systemctl restart app", RunOpts::elevated())
            .await
            .unwrap();
        assert_eq!(
            recorder.commands.lock().unwrap()[0],
            "cd /srv/app && source .appenv && sudo systemctl restart app"
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
