// ABOUTME: Built-in unit templates used when no local override exists.
// ABOUTME: Placeholders use {name} syntax and are substituted at generation time.

pub(crate) const DEFAULT_SERVICE: &str = r#"[Unit]
Description={app} {process}
After=network.target

[Service]
Type=simple
User={user}
WorkingDirectory={app_dir}
ExecStart=/bin/bash -c 'source {app_dir}/.appenv && exec {command}'
Restart=on-failure
RestartSec=5

[Install]
WantedBy=multi-user.target
"#;

pub(crate) const DEFAULT_SOCKET: &str = r#"[Unit]
Description={app} socket

[Socket]
ListenStream=/run/{app}.sock
SocketUser={user}
SocketMode=0660

[Install]
WantedBy=sockets.target
"#;

pub(crate) const DEFAULT_TIMER: &str = r#"[Unit]
Description={app} {process} schedule

[Timer]
OnCalendar={schedule}
Persistent=true
Unit={service_unit}

[Install]
WantedBy=timers.target
"#;
