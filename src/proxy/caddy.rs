// ABOUTME: Caddy reverse proxy backend driven through its admin API.
// ABOUTME: Routes are pushed as JSON to the loopback admin endpoint via remote curl.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use super::ReverseProxy;
use crate::config::Config;
use crate::error::Result;
use crate::ssh::{Remote, RunOpts, Scoped, shell_quote};

const CADDY_VERSION: &str = "2.10.2";
const ADMIN_ENDPOINT: &str = "localhost:2019";

/// Unit definition for the shared Caddy process itself.
const CADDY_SERVICE: &str = r#"[Unit]
Description=Caddy
Documentation=https://caddyserver.com/docs/
After=network.target network-online.target
Requires=network-online.target

[Service]
Type=notify
User=caddy
Group=caddy
ExecStart=/usr/bin/caddy run --environ --resume
TimeoutStopSec=5s
LimitNOFILE=1048576
LimitNPROC=512
PrivateTmp=true
ProtectSystem=full
AmbientCapabilities=CAP_NET_ADMIN CAP_NET_BIND_SERVICE

[Install]
WantedBy=multi-user.target
"#;

pub struct CaddyProxy<'a, R: Remote + ?Sized> {
    remote: &'a R,
    app: String,
    domain_name: String,
    upstream: String,
    statics: BTreeMap<String, String>,
}

impl<'a, R: Remote + ?Sized> CaddyProxy<'a, R> {
    pub fn new(remote: &'a R, config: &Config) -> Self {
        Self {
            remote,
            app: config.app.to_string(),
            domain_name: config.host.domain_name.clone(),
            upstream: config.webserver.upstream.clone(),
            statics: config
                .webserver
                .statics
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Remote scratch file holding the last pushed payload.
    fn payload_path(&self) -> String {
        format!("{}.caddy.json", self.app)
    }

    async fn push(&self, payload: &AdminPayload) -> Result<()> {
        let json = serde_json::to_string(payload)?;
        let path = self.payload_path();
        self.remote
            .run(
                &format!("echo {} > {path}", shell_quote(&json)),
                RunOpts::default(),
            )
            .await?;
        self.remote
            .run(
                &format!(
                    "curl -s {ADMIN_ENDPOINT}/load -H 'Content-Type: application/json' -d @{path}"
                ),
                RunOpts::default(),
            )
            .await?;
        Ok(())
    }

    fn routes_payload(&self) -> AdminPayload {
        let mut routes = Vec::new();

        for (pattern, root) in &self.statics {
            routes.push(Route {
                matchers: vec![Matcher {
                    host: vec![self.domain_name.clone()],
                    path: Some(vec![pattern.clone()]),
                }],
                handle: vec![Handler::file_server(root.clone())],
            });
        }

        routes.push(Route {
            matchers: vec![Matcher {
                host: vec![self.domain_name.clone()],
                path: None,
            }],
            handle: vec![Handler::reverse_proxy(self.upstream.clone())],
        });

        AdminPayload::for_app(
            &self.app,
            ServerBlock {
                listen: vec![":443".to_string()],
                routes,
            },
        )
    }
}

#[async_trait]
impl<'a, R: Remote + ?Sized> ReverseProxy for CaddyProxy<'a, R> {
    /// Install the shared Caddy binary, its system user, and its unit.
    /// A host that already has caddy on PATH is left untouched.
    async fn install(&self) -> Result<()> {
        let check = self
            .remote
            .run("command -v caddy", RunOpts::tolerant())
            .await?;
        if check.success() {
            tracing::debug!("caddy already installed");
            return Ok(());
        }

        let filename = format!("caddy_{CADDY_VERSION}_linux_amd64.tar.gz");
        let url = format!(
            "https://github.com/caddyserver/caddy/releases/download/v{CADDY_VERSION}/{filename}"
        );

        let tmp = Scoped::new(self.remote, "/tmp");
        tmp.run(&format!("curl -O -L {url}"), RunOpts::default())
            .await?;
        tmp.run(&format!("tar -xzf {filename}"), RunOpts::default())
            .await?;
        tmp.run("mv caddy /usr/bin/", RunOpts::elevated()).await?;
        tmp.run(
            &format!("rm {filename} LICENSE README.md"),
            RunOpts::tolerant(),
        )
        .await?;

        self.remote
            .run("groupadd --force --system caddy", RunOpts::elevated())
            .await?;
        self.remote
            .run(
                "useradd --system --gid caddy --create-home --home-dir /var/lib/caddy \
                 --shell /usr/sbin/nologin --comment 'Caddy web server' caddy",
                RunOpts::elevated_tolerant(),
            )
            .await?;
        self.remote
            .run("mkdir -p /etc/caddy", RunOpts::elevated())
            .await?;

        self.remote
            .run(
                &format!(
                    "echo {} | sudo tee /etc/systemd/system/caddy.service > /dev/null",
                    shell_quote(CADDY_SERVICE)
                ),
                RunOpts::interactive(),
            )
            .await?;
        self.remote
            .run("systemctl daemon-reload", RunOpts::elevated())
            .await?;
        self.remote
            .run("systemctl enable --now caddy", RunOpts::elevated())
            .await?;
        Ok(())
    }

    async fn uninstall(&self) -> Result<()> {
        self.remote
            .run("systemctl stop caddy", RunOpts::elevated_tolerant())
            .await?;
        self.remote
            .run("systemctl disable caddy", RunOpts::elevated_tolerant())
            .await?;
        self.remote
            .run("rm /usr/bin/caddy", RunOpts::elevated_tolerant())
            .await?;
        self.remote
            .run(
                "rm /etc/systemd/system/caddy.service",
                RunOpts::elevated_tolerant(),
            )
            .await?;
        self.remote
            .run("userdel caddy", RunOpts::elevated_tolerant())
            .await?;
        self.remote
            .run("rm -rf /etc/caddy", RunOpts::elevated_tolerant())
            .await?;
        self.remote
            .run("systemctl daemon-reload", RunOpts::elevated())
            .await?;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.remote
            .run("systemctl start caddy", RunOpts::elevated())
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.remote
            .run("systemctl stop caddy", RunOpts::elevated())
            .await?;
        Ok(())
    }

    /// Publish this app's routes. Repeated calls with an unchanged
    /// descriptor replace the server block with identical content.
    async fn setup(&self) -> Result<()> {
        self.push(&self.routes_payload()).await
    }

    /// Retract this app's routes without touching other apps behind the
    /// same proxy.
    async fn teardown(&self) -> Result<()> {
        self.push(&AdminPayload::for_app(&self.app, ServerBlock::default()))
            .await
    }

    async fn status(&self) -> Result<()> {
        self.remote
            .run(
                "systemctl status caddy",
                RunOpts {
                    elevate: true,
                    tolerate_failure: true,
                    interactive: true,
                },
            )
            .await?;
        Ok(())
    }

    async fn logs(&self) -> Result<()> {
        self.remote
            .run(
                "journalctl -u caddy -r",
                RunOpts {
                    elevate: true,
                    tolerate_failure: false,
                    interactive: true,
                },
            )
            .await?;
        Ok(())
    }
}

// Admin API payload shapes, see https://caddyserver.com/docs/api

#[derive(Debug, Serialize)]
pub struct AdminPayload {
    apps: Apps,
}

impl AdminPayload {
    fn for_app(app: &str, server: ServerBlock) -> Self {
        let mut servers = BTreeMap::new();
        servers.insert(app.to_string(), server);
        Self {
            apps: Apps {
                http: HttpApp { servers },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Apps {
    http: HttpApp,
}

#[derive(Debug, Serialize)]
struct HttpApp {
    servers: BTreeMap<String, ServerBlock>,
}

#[derive(Debug, Default, Serialize)]
struct ServerBlock {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    listen: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<Route>,
}

#[derive(Debug, Serialize)]
struct Route {
    #[serde(rename = "match")]
    matchers: Vec<Matcher>,
    handle: Vec<Handler>,
}

#[derive(Debug, Serialize)]
struct Matcher {
    host: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct Handler {
    handler: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstreams: Option<Vec<Upstream>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<String>,
}

impl Handler {
    fn reverse_proxy(dial: String) -> Self {
        Self {
            handler: "reverse_proxy",
            upstreams: Some(vec![Upstream { dial }]),
            root: None,
        }
    }

    fn file_server(root: String) -> Self {
        Self {
            handler: "file_server",
            upstreams: None,
            root: Some(root),
        }
    }
}

#[derive(Debug, Serialize)]
struct Upstream {
    dial: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_admin_api_shape() {
        let payload = AdminPayload::for_app(
            "myapp",
            ServerBlock {
                listen: vec![":443".to_string()],
                routes: vec![Route {
                    matchers: vec![Matcher {
                        host: vec!["myapp.com".to_string()],
                        path: None,
                    }],
                    handle: vec![Handler::reverse_proxy("localhost:8000".to_string())],
                }],
            },
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "apps": {"http": {"servers": {"myapp": {
                    "listen": [":443"],
                    "routes": [{
                        "match": [{"host": ["myapp.com"]}],
                        "handle": [{
                            "handler": "reverse_proxy",
                            "upstreams": [{"dial": "localhost:8000"}]
                        }]
                    }]
                }}}}
            })
        );
    }

    #[test]
    fn empty_server_block_serializes_empty() {
        let payload = AdminPayload::for_app("myapp", ServerBlock::default());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"apps": {"http": {"servers": {"myapp": {}}}}})
        );
    }
}
