// ABOUTME: Integration tests for the version history log.
// ABOUTME: Verifies the remote file mutations issued for each operation.

mod support;

use capstan::error::Error;
use capstan::release::VersionHistory;
use support::{APP_DIR, FakeRemote};

fn history(remote: &FakeRemote) -> VersionHistory<'_, FakeRemote> {
    VersionHistory::new(remote, APP_DIR)
}

#[tokio::test]
async fn head_of_empty_history_is_none() {
    let remote = FakeRemote::new();
    assert_eq!(history(&remote).head().await.unwrap(), None);
}

#[tokio::test]
async fn head_is_first_line() {
    let remote = FakeRemote::new();
    remote.stub("head -n 1 .versions", "0.1.0\n");
    assert_eq!(
        history(&remote).head().await.unwrap(),
        Some("0.1.0".to_string())
    );
}

#[tokio::test]
async fn prepend_on_empty_history_creates_file() {
    let remote = FakeRemote::new();
    history(&remote).prepend_if_new_head("0.1.0").await.unwrap();
    assert!(remote.ran(&format!("cd {APP_DIR} && echo '0.1.0' > .versions")));
}

#[tokio::test]
async fn prepend_of_current_head_is_a_noop() {
    let remote = FakeRemote::new();
    remote.stub("head -n 1 .versions", "0.1.0");
    history(&remote).prepend_if_new_head("0.1.0").await.unwrap();
    assert!(!remote.ran("sed -i '1i"));
    assert!(!remote.ran("> .versions"));
}

#[tokio::test]
async fn prepend_of_new_version_inserts_line() {
    let remote = FakeRemote::new();
    remote.stub("head -n 1 .versions", "0.0.9");
    history(&remote).prepend_if_new_head("0.1.0").await.unwrap();
    assert!(remote.ran("sed -i '1i 0.1.0' .versions"));
}

#[tokio::test]
async fn beyond_and_truncate_use_line_ranges() {
    let remote = FakeRemote::new();
    remote.stub("sed -n '3,$p' .versions", "0.0.8\n0.0.7\n");

    let h = history(&remote);
    let stale = h.beyond(2).await.unwrap();
    assert_eq!(stale, vec!["0.0.8", "0.0.7"]);

    h.truncate(2).await.unwrap();
    assert!(remote.ran("sed -i '3,$d' .versions"));
}

#[tokio::test]
async fn drop_newer_than_removes_leading_range() {
    let remote = FakeRemote::new();
    remote.stub("cat .versions", "0.3.0\n0.2.0\n0.1.0\n");

    let removed = history(&remote).drop_newer_than("0.1.0").await.unwrap();
    assert_eq!(removed, vec!["0.3.0", "0.2.0"]);
    assert!(remote.ran("sed -i '1,2d' .versions"));
}

#[tokio::test]
async fn drop_newer_than_head_is_a_noop() {
    let remote = FakeRemote::new();
    remote.stub("cat .versions", "0.3.0\n0.2.0\n");

    let removed = history(&remote).drop_newer_than("0.3.0").await.unwrap();
    assert!(removed.is_empty());
    assert!(!remote.ran("sed -i '1,"));
}

#[tokio::test]
async fn drop_newer_than_unknown_version_is_an_error() {
    let remote = FakeRemote::new();
    remote.stub("cat .versions", "0.3.0\n0.2.0\n");

    let err = history(&remote).drop_newer_than("9.9.9").await.unwrap_err();
    assert!(matches!(err, Error::VersionNotInHistory(_)));
}
