//! Delivery router integration tests.
//!
//! These drive the size-tiered routing and cleanup-ownership contract with
//! real files and stub relay commands (`true` / `false`); the direct
//! transport tier is covered at the routing level since it requires a live
//! Bot API.

use gramfetch::config::Settings;
use gramfetch::delivery::{deliver, Delivery, DeliveryError, Route};
use gramfetch::format::DownloadKind;
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

fn test_settings(relay: bool, relay_command: &str) -> Settings {
    Settings {
        telegram_token: "123456789:TEST_TOKEN_NOT_REAL".to_string(),
        ig_username: None,
        ig_password: None,
        relay_bot_token: relay.then(|| "987654321:RELAY_TOKEN_NOT_REAL".to_string()),
        relay_api_url: relay.then(|| "http://localhost:8081".to_string()),
        relay_command: relay_command.to_string(),
        download_dir: PathBuf::from("downloads"),
    }
}

fn dummy_bot() -> Bot {
    Bot::new("123456789:TEST_TOKEN_NOT_REAL")
}

/// Create a sparse file of the requested size.
fn sparse_file(dir: &TempDir, name: &str, len: u64) -> PathBuf {
    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).expect("create test file");
    file.set_len(len).expect("grow test file");
    path
}

fn exists(path: &Path) -> bool {
    path.exists()
}

#[test]
fn routing_tiers_match_size() {
    assert_eq!(Route::for_size(20 * MIB), Route::Direct);
    assert_eq!(Route::for_size(100 * MIB), Route::Relayed);
    assert_eq!(Route::for_size(3 * 1024 * MIB), Route::Rejected);
}

#[tokio::test]
async fn missing_file_is_an_internal_failure() {
    let settings = test_settings(true, "true");
    let outcome = deliver(
        &dummy_bot(),
        &settings,
        Path::new("/nonexistent/video.mp4"),
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;
    assert!(matches!(outcome, Err(DeliveryError::MissingFile(_))));
}

#[tokio::test]
async fn relay_tier_without_configuration_fails_and_cleans_up() {
    let dir = TempDir::new().expect("tempdir");
    let path = sparse_file(&dir, "medium.mp4", 100 * MIB);
    let settings = test_settings(false, "true");

    let outcome = deliver(
        &dummy_bot(),
        &settings,
        &path,
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;

    assert!(matches!(outcome, Err(DeliveryError::RelayNotConfigured)));
    assert!(!exists(&path), "router must reclaim the file");
}

#[tokio::test]
async fn oversized_payload_rejected_without_transport_attempt() {
    let dir = TempDir::new().expect("tempdir");
    let path = sparse_file(&dir, "huge.mp4", 3 * 1024 * MIB);
    // relay fully configured: rejection must come from size alone
    let settings = test_settings(true, "true");

    let outcome = deliver(
        &dummy_bot(),
        &settings,
        &path,
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;

    match outcome {
        Err(DeliveryError::TooLarge { size }) => assert_eq!(size, 3 * 1024 * MIB),
        other => panic!("expected TooLarge, got {other:?}"),
    }
    assert!(!exists(&path), "router must reclaim the file");
}

#[tokio::test]
async fn relay_success_transfers_cleanup_ownership() {
    let dir = TempDir::new().expect("tempdir");
    let path = sparse_file(&dir, "medium.mp4", 100 * MIB);
    // `true` exits 0 without touching the file, standing in for a relay
    // that confirmed the send
    let settings = test_settings(true, "true");

    let outcome = deliver(
        &dummy_bot(),
        &settings,
        &path,
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;

    assert!(matches!(outcome, Ok(Delivery::Relayed)));
    // deletion is the relay's job on its success path; the router must not
    // double-delete behind it
    assert!(exists(&path));
}

#[tokio::test]
async fn relay_failure_cleans_up_locally() {
    let dir = TempDir::new().expect("tempdir");
    let path = sparse_file(&dir, "medium.mp4", 100 * MIB);
    let settings = test_settings(true, "false");

    let outcome = deliver(
        &dummy_bot(),
        &settings,
        &path,
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;

    match outcome {
        Err(DeliveryError::RelayFailed { code }) => assert_eq!(code, Some(1)),
        other => panic!("expected RelayFailed, got {other:?}"),
    }
    assert!(!exists(&path), "router must reclaim the file");
}

#[tokio::test]
async fn relay_launch_failure_cleans_up_locally() {
    let dir = TempDir::new().expect("tempdir");
    let path = sparse_file(&dir, "medium.mp4", 100 * MIB);
    let settings = test_settings(true, "/nonexistent/relay-binary");

    let outcome = deliver(
        &dummy_bot(),
        &settings,
        &path,
        ChatId(1),
        "caption",
        DownloadKind::Video,
    )
    .await;

    assert!(matches!(outcome, Err(DeliveryError::RelayLaunch(_))));
    assert!(!exists(&path), "router must reclaim the file");
}
