//! The `bundle-updater` binary.

use anyhow::Result;
use assert_cmd::Command;
use bundle_updater::test_utils::TestEnvironment;
use predicates::prelude::*;
use std::path::Path;

use crate::common::ArtifactStore;

fn bundle_updater() -> Command {
    let mut cmd = Command::cargo_bin("bundle-updater").unwrap();
    cmd.env("BUNDLE_UPDATER_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("BUNDLE_UPDATER_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn with_config(config: &Path) -> Command {
    let mut cmd = bundle_updater();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    bundle_updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("recover"));
}

#[test]
fn test_build_command() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.publish_dir.join("dist");

    bundle_updater()
        .arg("build")
        .arg("--app-path")
        .arg(&env.app_path)
        .arg("--version")
        .arg("1.0.0")
        .arg("--output-dir")
        .arg(&dist)
        .assert()
        .success()
        .stdout(predicate::str::contains("Package built"))
        .stdout(predicate::str::contains("Notarized: no"));

    assert!(dist.join("Sample.zip").is_file());
    assert!(dist.join(bundle_updater::utils::manifest_file_name()).is_file());
    Ok(())
}

#[test]
fn test_build_command_rejects_missing_bundle() -> Result<()> {
    let env = TestEnvironment::new()?;

    bundle_updater()
        .arg("build")
        .arg("--app-path")
        .arg(env.publish_dir.join("Missing.app"))
        .arg("--version")
        .arg("1.0.0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid application bundle"));
    Ok(())
}

#[test]
fn test_missing_config_file() -> Result<()> {
    let env = TestEnvironment::new()?;

    with_config(&env.temp_dir.path().join("nope.toml"))
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_command_reports_update() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.1.0", "ff", 2).await;
    let config = env.write_config_file(&store.url(), "1.0.0")?;

    with_config(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("1.1.0"));

    with_config(&config)
        .args(["check", "--exit-code"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Update available"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_command_up_to_date() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.0.0", "ff", 1).await;
    let config = env.write_config_file(&store.url(), "1.0.0")?;

    with_config(&config)
        .args(["check", "--exit-code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest version"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_and_clean_commands() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (bytes, checksum) = env.publish_archive("1.1.0")?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.1.0", &checksum, 1).await;
    store.publish_archive(bytes, 1).await;
    let config = env.write_config_file(&store.url(), "1.0.0")?;

    with_config(&config)
        .arg("download")
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloaded"));
    assert!(env.staging_dir.join("Sample.zip").is_file());

    with_config(&config)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!env.staging_dir.join("Sample.zip").exists());

    with_config(&config)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("No downloaded update"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_command_checksum_mismatch() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (bytes, _) = env.publish_archive("1.1.0")?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.1.0", &"a".repeat(64), 1).await;
    store.publish_archive(bytes, 1).await;
    let config = env.write_config_file(&store.url(), "1.0.0")?;

    with_config(&config)
        .arg("download")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Checksum mismatch"))
        .stderr(predicate::str::contains("has been deleted"));
    assert!(!env.staging_dir.join("Sample.zip").exists());
    Ok(())
}

#[test]
fn test_recover_command_without_journal() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config_file("http://127.0.0.1:9/updates", "1.0.0")?;

    with_config(&config)
        .arg("recover")
        .assert()
        .success()
        .stdout(predicate::str::contains("No interrupted update found"));
    Ok(())
}

#[test]
fn test_apply_command_without_download() -> Result<()> {
    let env = TestEnvironment::new()?;
    let config = env.write_config_file("http://127.0.0.1:9/updates", "1.0.0")?;

    with_config(&config)
        .arg("apply")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Staging directory does not exist"));
    Ok(())
}

#[test]
fn test_quiet_and_verbose_conflict() {
    bundle_updater().args(["--quiet", "--verbose", "check"]).assert().failure();
}
