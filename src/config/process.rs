// ABOUTME: Process specifications: one declared unit of supervised work.
// ABOUTME: Validates the replica/socket/schedule exclusivity rules.

use serde::Deserialize;

use crate::error::{Error, Result};

/// One process managed by the remote supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSpec {
    /// Invocation command, relative to the app directory.
    pub command: String,

    /// Number of instances. More than one expands the unit into
    /// `name@1..N` template instances.
    #[serde(default = "default_replicas")]
    pub replicas: u32,

    /// Whether the process is socket-activated.
    #[serde(default)]
    pub socket: bool,

    /// Calendar expression driving a companion timer unit.
    #[serde(default)]
    pub schedule: Option<String>,
}

fn default_replicas() -> u32 {
    1
}

impl ProcessSpec {
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.replicas == 0 {
            return Err(Error::InvalidConfig(format!(
                "process '{name}' must have at least one replica"
            )));
        }
        if self.socket && self.schedule.is_some() {
            return Err(Error::InvalidConfig(format!(
                "process '{name}' cannot have both 'socket' and 'schedule' enabled"
            )));
        }
        if self.replicas > 1 && (self.socket || self.schedule.is_some()) {
            return Err(Error::InvalidConfig(format!(
                "process '{name}' cannot combine replicas > 1 with 'socket' or 'schedule'"
            )));
        }
        Ok(())
    }

    pub fn replicated(&self) -> bool {
        self.replicas > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(replicas: u32, socket: bool, schedule: Option<&str>) -> ProcessSpec {
        ProcessSpec {
            command: "run".to_string(),
            replicas,
            socket,
            schedule: schedule.map(String::from),
        }
    }

    #[test]
    fn plain_spec_is_valid() {
        assert!(spec(1, false, None).validate("web").is_ok());
        assert!(spec(3, false, None).validate("worker").is_ok());
        assert!(spec(1, true, None).validate("web").is_ok());
        assert!(spec(1, false, Some("daily")).validate("cron").is_ok());
    }

    #[test]
    fn socket_and_schedule_are_exclusive() {
        assert!(spec(1, true, Some("daily")).validate("web").is_err());
    }

    #[test]
    fn replicas_exclude_socket_and_schedule() {
        assert!(spec(2, true, None).validate("web").is_err());
        assert!(spec(2, false, Some("daily")).validate("cron").is_err());
    }

    #[test]
    fn zero_replicas_rejected() {
        assert!(spec(0, false, None).validate("web").is_err());
    }
}
