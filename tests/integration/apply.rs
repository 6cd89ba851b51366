//! Applying a downloaded update, up to and including the detached swap.

use anyhow::Result;
use bundle_updater::core::UpdateError;
use bundle_updater::test_utils::{BundleFixture, TestEnvironment};
use bundle_updater::updater::{ApplyState, SwapJournal, Updater};
use std::fs;
use std::time::Duration;

use crate::common::{ArtifactStore, dead_pid, exists, wait_until};

/// Nothing in these tests talks to the store.
const UNUSED_URL: &str = "http://127.0.0.1:9/updates";

const SWAP_DEADLINE: Duration = Duration::from_secs(20);

/// Place an archive of `Sample.app` at `version` where a download would have put it.
fn stage_archive(env: &TestEnvironment, version: &str) -> Result<()> {
    let (bytes, _) = env.publish_archive(version)?;
    fs::create_dir_all(&env.staging_dir)?;
    fs::write(env.staging_dir.join("Sample.zip"), bytes)?;
    Ok(())
}

fn swap_finished(env: &TestEnvironment, updater: &Updater, version: &str) -> bool {
    BundleFixture::installed_version(&env.app_path).is_ok_and(|v| v == version)
        && !updater.journal_path().exists()
        && !updater.zip_path().exists()
}

fn leftover_backups(env: &TestEnvironment) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(&env.staging_dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with("backup-") {
            names.push(name);
        }
    }
    Ok(names)
}

#[tokio::test]
async fn test_apply_requires_staging_directory() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;

    let err = updater.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::StagingDirMissing { .. }), "got {err:?}");
    assert_eq!(updater.state(), ApplyState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_apply_requires_downloaded_archive() -> Result<()> {
    let env = TestEnvironment::new()?;
    fs::create_dir_all(&env.staging_dir)?;
    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;

    let err = updater.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::ArchiveMissing { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn test_apply_requires_installed_bundle() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "1.1.0")?;
    fs::remove_dir_all(&env.app_path)?;
    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;

    let err = updater.apply_update().await.unwrap_err();
    match err {
        UpdateError::InstalledBundleMissing {
            path,
        } => assert_eq!(path, env.app_path),
        other => panic!("expected InstalledBundleMissing, got {other:?}"),
    }
    assert!(!updater.extracted_dir().exists(), "nothing is extracted before preconditions pass");
    Ok(())
}

#[tokio::test]
async fn test_apply_corrupt_archive_is_extraction_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    fs::create_dir_all(&env.staging_dir)?;
    fs::write(env.staging_dir.join("Sample.zip"), b"definitely not a zip file")?;
    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;

    let err = updater.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Extraction { .. }), "got {err:?}");
    assert_eq!(BundleFixture::installed_version(&env.app_path)?, "1.0.0");
    assert!(!updater.journal_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_apply_archive_without_bundle() -> Result<()> {
    let env = TestEnvironment::new()?;
    let content = env.publish_dir.join("NotAnApp");
    fs::create_dir_all(&content)?;
    fs::write(content.join("README"), "no bundle here")?;
    fs::create_dir_all(&env.staging_dir)?;
    bundle_updater::utils::archive::zip_directory(&content, &env.staging_dir.join("Sample.zip"))?;

    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    let err = updater.apply_update().await.unwrap_err();

    assert!(matches!(err, UpdateError::BundleNotFound { .. }), "got {err:?}");
    assert_eq!(updater.state(), ApplyState::Locating);
    assert!(!updater.script_path().exists());
    assert_eq!(BundleFixture::installed_version(&env.app_path)?, "1.0.0");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_apply_swaps_bundle_after_process_exits() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "1.1.0")?;

    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?.with_wait_pid(Some(dead_pid()));
    updater.apply_update().await?;

    assert_eq!(updater.state(), ApplyState::Detached);
    assert!(updater.script_path().is_file());

    let done = wait_until(SWAP_DEADLINE, || swap_finished(&env, &updater, "1.1.0")).await;
    let log = fs::read_to_string(updater.log_path()).unwrap_or_default();
    assert!(done, "swap did not complete in time; log:\n{log}");

    assert!(leftover_backups(&env)?.is_empty(), "backup should be removed after commit");
    assert!(env.app_path.join("Contents/MacOS/Sample").is_file());
    assert!(log.contains("Swap committed"), "log:\n{log}");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_apply_waits_for_running_process() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "2.0.0")?;
    let mut app = std::process::Command::new("sleep").arg("3").spawn()?;

    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?.with_wait_pid(Some(app.id()));
    updater.apply_update().await?;

    let journal = SwapJournal::load(&updater.journal_path()).await?;
    let journal = journal.expect("journal should exist while the swap is pending");
    assert_eq!(journal.canonical, env.app_path);
    assert!(journal.procedure_pid.is_some());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        BundleFixture::installed_version(&env.app_path)?,
        "1.0.0",
        "bundle must not be replaced while the application runs"
    );

    app.wait()?;
    let done = wait_until(SWAP_DEADLINE, || swap_finished(&env, &updater, "2.0.0")).await;
    let log = fs::read_to_string(updater.log_path()).unwrap_or_default();
    assert!(done, "swap did not complete in time; log:\n{log}");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_second_apply_refused_while_swap_pending() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "2.0.0")?;
    let mut app = std::process::Command::new("sleep").arg("3").spawn()?;

    let mut first = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?.with_wait_pid(Some(app.id()));
    first.apply_update().await?;
    let journal_before = fs::read(first.journal_path())?;
    let script_pid = SwapJournal::load(&first.journal_path())
        .await?
        .and_then(|j| j.procedure_pid)
        .expect("journal should record the running procedure");

    let mut second = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?.with_wait_pid(Some(app.id()));
    let err = second.apply_update().await.unwrap_err();

    match err {
        UpdateError::SwapInProgress {
            pid,
        } => assert_eq!(pid, script_pid),
        other => panic!("expected SwapInProgress, got {other:?}"),
    }
    assert_eq!(second.state(), ApplyState::Idle);
    assert_eq!(fs::read(first.journal_path())?, journal_before, "journal must be untouched");
    assert!(
        first.extracted_dir().join("Sample.app").is_dir(),
        "pending bundle must stay in place"
    );

    app.wait()?;
    let done = wait_until(SWAP_DEADLINE, || swap_finished(&env, &first, "2.0.0")).await;
    let log = fs::read_to_string(first.log_path()).unwrap_or_default();
    assert!(done, "swap did not complete in time; log:\n{log}");
    Ok(())
}

#[tokio::test]
async fn test_apply_repairs_interrupted_swap_first() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "1.1.0")?;
    let mut updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;

    // A previous swap died between its two renames.
    let backup = env.staging_dir.join("backup-1700000000.app");
    SwapJournal::new(env.app_path.clone(), backup.clone(), updater.extracted_dir().join("Sample.app"))
        .save(&updater.journal_path())
        .await?;
    fs::rename(&env.app_path, &backup)?;

    // A corrupt archive stops the apply after recovery, before any procedure starts.
    fs::write(env.staging_dir.join("Sample.zip"), b"not a zip")?;
    let err = updater.apply_update().await.unwrap_err();

    assert!(matches!(err, UpdateError::Extraction { .. }), "got {err:?}");
    assert_eq!(BundleFixture::installed_version(&env.app_path)?, "1.0.0");
    assert!(!exists(&backup));
    assert!(!exists(&updater.journal_path()));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_apply_runs_update_hooks() -> Result<()> {
    let env = TestEnvironment::new()?;
    stage_archive(&env, "1.1.0")?;
    let marker = env.temp_dir.path().join("hooks.txt");

    let mut settings = env.settings(UNUSED_URL, "1.0.0");
    settings.before_update_command = Some(format!("echo before >> '{}'", marker.display()));
    settings.after_update_command = Some(format!("echo after >> '{}'", marker.display()));
    let config = bundle_updater::config::UpdateConfig::new(settings)?;

    let mut updater = Updater::new(config)?.with_wait_pid(Some(dead_pid()));
    updater.apply_update().await?;

    let done = wait_until(SWAP_DEADLINE, || {
        fs::read_to_string(&marker).is_ok_and(|m| m.contains("after"))
    })
    .await;
    let log = fs::read_to_string(updater.log_path()).unwrap_or_default();
    assert!(done, "after-update hook did not run; log:\n{log}");

    assert_eq!(fs::read_to_string(&marker)?, "before\nafter\n");
    assert_eq!(BundleFixture::installed_version(&env.app_path)?, "1.1.0");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_full_update_lifecycle() -> Result<()> {
    let env = TestEnvironment::new()?;
    let (bytes, checksum) = env.publish_archive("1.2.0")?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.2.0", &checksum, 1).await;
    store.publish_archive(bytes, 1).await;

    let mut updater = Updater::new(env.config(&store.url(), "1.0.0")?)?
        .with_progress(false)
        .with_wait_pid(Some(dead_pid()));

    assert_eq!(updater.check_for_update().await?.as_deref(), Some("1.2.0"));
    updater.download_update().await?;
    updater.apply_update().await?;

    let done = wait_until(SWAP_DEADLINE, || swap_finished(&env, &updater, "1.2.0")).await;
    let log = fs::read_to_string(updater.log_path()).unwrap_or_default();
    assert!(done, "swap did not complete in time; log:\n{log}");
    assert!(!exists(&updater.journal_path()));
    Ok(())
}
