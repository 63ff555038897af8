// ABOUTME: Unit generation: turns the process map into systemd unit files.
// ABOUTME: Naming, template resolution, and rendering are pure and deterministic.

mod templates;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::config::ProcessSpec;

/// Kind of generated unit artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Service,
    Socket,
    Timer,
}

impl UnitKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            UnitKind::Service => "service",
            UnitKind::Socket => "socket",
            UnitKind::Timer => "timer",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            UnitKind::Service => templates::DEFAULT_SERVICE,
            UnitKind::Socket => templates::DEFAULT_SOCKET,
            UnitKind::Timer => templates::DEFAULT_TIMER,
        }
    }
}

/// A generated unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub body: String,
    pub kind: UnitKind,
}

/// Host and user context shared by all rendered units.
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub app: String,
    pub user: String,
    pub app_dir: String,
}

/// Base unit name for a process: the app name for "web", prefixed otherwise.
pub fn unit_base(app: &str, process: &str) -> String {
    if process == "web" {
        app.to_string()
    } else {
        format!("{app}-{process}")
    }
}

/// Filename of the primary unit written for a process. Replicated processes
/// get a single `@`-template file shared by all instances.
pub fn unit_file_name(app: &str, process: &str, spec: &ProcessSpec) -> String {
    let base = unit_base(app, process);
    if spec.replicated() {
        format!("{base}@.service")
    } else {
        format!("{base}.service")
    }
}

/// Service names a process expands to: `base@1..N` for replicated
/// processes, the single unit name otherwise.
pub fn instance_service_names(app: &str, process: &str, spec: &ProcessSpec) -> Vec<String> {
    let base = unit_base(app, process);
    if spec.replicated() {
        (1..=spec.replicas)
            .map(|i| format!("{base}@{i}.service"))
            .collect()
    } else {
        vec![format!("{base}.service")]
    }
}

/// The full desired service-name set: every expanded instance plus socket
/// and timer companions.
pub fn desired_service_names(app: &str, processes: &HashMap<String, ProcessSpec>) -> Vec<String> {
    let mut names = Vec::new();
    let mut process_names: Vec<_> = processes.keys().collect();
    process_names.sort();

    for name in &process_names {
        names.extend(instance_service_names(app, name, &processes[name.as_str()]));
    }
    for name in &process_names {
        let spec = &processes[name.as_str()];
        if spec.socket {
            names.push(format!("{app}.socket"));
        }
        if spec.schedule.is_some() {
            names.push(format!("{}.timer", unit_base(app, name)));
        }
    }
    names
}

/// Names passed to `systemctl enable --now`: socket-activated primaries are
/// enabled via their socket unit instead of the service itself.
pub fn enable_targets(app: &str, processes: &HashMap<String, ProcessSpec>) -> Vec<String> {
    let mut names = Vec::new();
    let mut process_names: Vec<_> = processes.keys().collect();
    process_names.sort();

    for name in process_names {
        let spec = &processes[name.as_str()];
        if spec.socket {
            names.push(format!("{app}.socket"));
        } else {
            names.extend(instance_service_names(app, name, spec));
        }
        if spec.schedule.is_some() {
            names.push(format!("{}.timer", unit_base(app, name)));
        }
    }
    names
}

/// Generates unit files from the process map.
///
/// Resolution order per unit: a process-specific override
/// (`{process}.{kind}` in the local override directory), then
/// `default.{kind}` there, then the built-in template. Output iteration
/// order is stable so regeneration from identical inputs is byte-identical.
pub struct UnitGenerator {
    override_dir: PathBuf,
}

impl UnitGenerator {
    pub fn new(override_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: override_dir.into(),
        }
    }

    pub fn generate(
        &self,
        processes: &HashMap<String, ProcessSpec>,
        ctx: &UnitContext,
    ) -> BTreeMap<String, ServiceUnit> {
        let mut units = BTreeMap::new();
        let mut process_names: Vec<_> = processes.keys().collect();
        process_names.sort();

        for name in process_names {
            let spec = &processes[name.as_str()];
            let file = unit_file_name(&ctx.app, name, spec);
            let body = self.render(name, UnitKind::Service, ctx, spec);
            units.insert(
                file,
                ServiceUnit {
                    body,
                    kind: UnitKind::Service,
                },
            );

            if spec.socket {
                let body = self.render(name, UnitKind::Socket, ctx, spec);
                units.insert(
                    format!("{}.socket", ctx.app),
                    ServiceUnit {
                        body,
                        kind: UnitKind::Socket,
                    },
                );
            }

            if spec.schedule.is_some() {
                let body = self.render(name, UnitKind::Timer, ctx, spec);
                units.insert(
                    format!("{}.timer", unit_base(&ctx.app, name)),
                    ServiceUnit {
                        body,
                        kind: UnitKind::Timer,
                    },
                );
            }
        }

        units
    }

    fn render(&self, process: &str, kind: UnitKind, ctx: &UnitContext, spec: &ProcessSpec) -> String {
        let template = self.resolve_template(process, kind);
        let service_unit = unit_file_name(&ctx.app, process, spec);
        let schedule = spec.schedule.as_deref().unwrap_or_default();

        substitute(
            &template,
            &[
                ("app", ctx.app.as_str()),
                ("user", ctx.user.as_str()),
                ("app_dir", ctx.app_dir.as_str()),
                ("command", spec.command.as_str()),
                ("process", process),
                ("schedule", schedule),
                ("service_unit", service_unit.as_str()),
            ],
        )
    }

    fn resolve_template(&self, process: &str, kind: UnitKind) -> String {
        let candidates = [
            self.override_dir.join(format!("{process}.{}", kind.suffix())),
            self.override_dir.join(format!("default.{}", kind.suffix())),
        ];
        for path in &candidates {
            if let Ok(content) = std::fs::read_to_string(path) {
                return content;
            }
        }
        kind.builtin().to_string()
    }
}

fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(command: &str) -> ProcessSpec {
        ProcessSpec {
            command: command.to_string(),
            replicas: 1,
            socket: false,
            schedule: None,
        }
    }

    #[test]
    fn web_process_uses_bare_app_name() {
        assert_eq!(unit_base("myapp", "web"), "myapp");
        assert_eq!(unit_base("myapp", "worker"), "myapp-worker");
    }

    #[test]
    fn replicated_unit_file_is_a_template() {
        let mut s = spec("run worker");
        s.replicas = 3;
        assert_eq!(unit_file_name("myapp", "worker", &s), "myapp-worker@.service");
        assert_eq!(
            instance_service_names("myapp", "worker", &s),
            vec![
                "myapp-worker@1.service",
                "myapp-worker@2.service",
                "myapp-worker@3.service"
            ]
        );
    }

    #[test]
    fn substitute_replaces_all_occurrences() {
        let out = substitute("{app} and {app} by {user}", &[("app", "x"), ("user", "u")]);
        assert_eq!(out, "x and x by u");
    }
}
