// ABOUTME: Integration tests for the systemd adapter against a fake session.
// ABOUTME: Covers enable sets, stale sweeps, idempotence, and uninstall.

mod support;

use capstan::config::Config;
use capstan::supervisor::Systemd;
use support::FakeRemote;

fn web_and_worker_config() -> Config {
    let dir = tempfile::TempDir::new().unwrap();
    support::binary_config(dir.path())
}

fn socket_config() -> Config {
    Config::from_yaml(
        r#"
app: testapp
version: 0.1.0
build_command: "true"
installation_mode: binary
distfile: dist/testapp-{version}.bin
webserver:
  upstream: unix//run/testapp.sock
  type: caddy
processes:
  web:
    command: testapp server
    socket: true
host:
  domain_name: testapp.example.com
  user: testuser
  env: "DEBUG=false"
"#,
    )
    .unwrap()
}

#[tokio::test]
async fn install_writes_units_and_enables_expected_set() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    Systemd::new(&remote, &config).install_services().await.unwrap();

    assert!(remote.ran("sudo tee /etc/systemd/system/testapp.service"));
    assert!(remote.ran("sudo tee /etc/systemd/system/testapp-worker@.service"));
    assert!(remote.ran("sudo systemctl daemon-reload"));

    assert!(remote.ran("sudo systemctl enable --now testapp.service"));
    assert!(remote.ran("sudo systemctl enable --now testapp-worker@1.service"));
    assert!(remote.ran("sudo systemctl enable --now testapp-worker@2.service"));
    // the template form is never enabled directly
    assert!(!remote.ran("enable --now testapp-worker@.service"));
}

#[tokio::test]
async fn socket_activated_primary_enabled_via_socket_unit() {
    let config = socket_config();
    let remote = FakeRemote::new();
    Systemd::new(&remote, &config).install_services().await.unwrap();

    assert!(remote.ran("sudo tee /etc/systemd/system/testapp.service"));
    assert!(remote.ran("sudo tee /etc/systemd/system/testapp.socket"));
    assert!(remote.ran("sudo systemctl enable --now testapp.socket"));
    assert!(!remote.ran("enable --now testapp.service"));
}

#[tokio::test]
async fn repeated_install_with_unchanged_spec_removes_nothing() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    // second run sees exactly the files the first run wrote
    remote.stub(
        "ls /etc/systemd/system/testapp*",
        "/etc/systemd/system/testapp.service /etc/systemd/system/testapp-worker@.service",
    );

    let supervisor = Systemd::new(&remote, &config);
    supervisor.install_services().await.unwrap();
    supervisor.install_services().await.unwrap();

    assert!(!remote.ran("rm /etc/systemd/system/testapp.service"));
    assert!(!remote.ran("rm /etc/systemd/system/testapp-worker@.service"));
    assert!(!remote.ran("disable --now 'testapp"));
}

#[tokio::test]
async fn stale_unit_files_are_disabled_and_removed() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    remote.stub(
        "ls /etc/systemd/system/testapp*",
        "/etc/systemd/system/testapp.service\n/etc/systemd/system/testapp-worker@.service\n/etc/systemd/system/testapp-beat.service\n",
    );

    Systemd::new(&remote, &config).install_services().await.unwrap();

    assert!(remote.ran("sudo systemctl disable --now 'testapp-beat.service'"));
    assert!(remote.ran("sudo rm /etc/systemd/system/testapp-beat.service"));
}

#[tokio::test]
async fn stale_template_file_disables_every_instance() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    remote.stub(
        "ls /etc/systemd/system/testapp*",
        "/etc/systemd/system/testapp.service\n/etc/systemd/system/testapp-worker@.service\n/etc/systemd/system/testapp-old@.service\n",
    );

    Systemd::new(&remote, &config).install_services().await.unwrap();

    assert!(remote.ran("sudo systemctl disable --now 'testapp-old@*.service'"));
    assert!(remote.ran("sudo rm /etc/systemd/system/testapp-old@.service"));
}

#[tokio::test]
async fn downscaled_replica_instances_are_disabled() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    // a third instance is still loaded from a previous release
    remote.stub(
        "systemctl list-units",
        "testapp.service loaded active running\ntestapp-worker@1.service loaded active running\ntestapp-worker@2.service loaded active running\ntestapp-worker@3.service loaded active running\n",
    );

    Systemd::new(&remote, &config).install_services().await.unwrap();

    assert!(remote.ran("sudo systemctl disable --now testapp-worker@3.service"));
    assert!(!remote.ran("disable --now testapp-worker@1.service"));
    assert!(!remote.ran("disable --now testapp-worker@2.service"));
}

#[tokio::test]
async fn uninstall_stops_disables_and_removes_units() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    Systemd::new(&remote, &config).uninstall_services().await.unwrap();

    for name in [
        "testapp.service",
        "testapp-worker@1.service",
        "testapp-worker@2.service",
    ] {
        assert!(remote.ran(&format!("sudo systemctl stop {name}")));
        assert!(remote.ran(&format!("sudo systemctl disable {name}")));
    }
    assert!(remote.ran("sudo rm /etc/systemd/system/testapp.service"));
    assert!(remote.ran("sudo rm /etc/systemd/system/testapp-worker@.service"));
    assert!(remote.ran("sudo systemctl daemon-reload"));
    assert!(remote.ran("sudo systemctl reset-failed"));
}

#[tokio::test]
async fn one_failing_service_does_not_block_the_others() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    remote.fail_matching("restart testapp-worker@1.service");

    let result = Systemd::new(&remote, &config).restart_services().await;
    assert!(result.is_err());

    // the other restarts were still attempted
    assert!(remote.ran("sudo systemctl restart testapp.service"));
    assert!(remote.ran("sudo systemctl restart testapp-worker@2.service"));
}

#[tokio::test]
async fn resolve_names_expands_processes_and_passes_through_units() {
    let config = web_and_worker_config();
    let remote = FakeRemote::new();
    let supervisor = Systemd::new(&remote, &config);

    assert_eq!(
        supervisor.resolve_names(Some("worker")).unwrap(),
        vec!["testapp-worker@1.service", "testapp-worker@2.service"]
    );
    assert_eq!(
        supervisor.resolve_names(Some("web")).unwrap(),
        vec!["testapp.service"]
    );
    assert_eq!(
        supervisor.resolve_names(Some("custom.service")).unwrap(),
        vec!["custom.service"]
    );
    assert!(supervisor.resolve_names(Some("nope")).is_err());

    let all = supervisor.resolve_names(None).unwrap();
    assert_eq!(
        all,
        vec![
            "testapp.service",
            "testapp-worker@1.service",
            "testapp-worker@2.service"
        ]
    );
}
