//! Recovery from a swap interrupted between its two renames.

use anyhow::Result;
use bundle_updater::test_utils::{BundleFixture, TestEnvironment};
use bundle_updater::updater::{RecoveryOutcome, SwapJournal, Updater};
use std::fs;

use crate::common::exists;

const UNUSED_URL: &str = "http://127.0.0.1:9/updates";

/// Journal for a swap of the sandbox bundle, as `apply_update` writes it.
async fn write_journal(env: &TestEnvironment, updater: &Updater) -> Result<SwapJournal> {
    fs::create_dir_all(&env.staging_dir)?;
    let journal = SwapJournal::new(
        env.app_path.clone(),
        env.staging_dir.join("backup-1700000000.app"),
        updater.extracted_dir().join("Sample.app"),
    );
    journal.save(&updater.journal_path()).await?;
    Ok(journal)
}

#[tokio::test]
async fn test_recover_restores_backup_after_interrupted_swap() -> Result<()> {
    let env = TestEnvironment::new()?;
    let updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    let journal = write_journal(&env, &updater).await?;

    // Power lost right after the first rename.
    fs::rename(&env.app_path, &journal.backup)?;
    assert!(!exists(&env.app_path));

    let outcome = updater.recover_interrupted_swap().await?;

    assert_eq!(
        outcome,
        RecoveryOutcome::Restored {
            from: journal.backup.clone(),
            to: env.app_path.clone(),
        }
    );
    assert_eq!(BundleFixture::installed_version(&env.app_path)?, "1.0.0");
    assert!(!exists(&journal.backup));
    assert!(!exists(&updater.journal_path()));

    assert_eq!(updater.recover_interrupted_swap().await?, RecoveryOutcome::NothingToRecover);
    Ok(())
}

#[tokio::test]
async fn test_recover_after_committed_swap_removes_leftovers() -> Result<()> {
    let env = TestEnvironment::new()?;
    let updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    let journal = write_journal(&env, &updater).await?;

    // Power lost after the second rename but before cleanup.
    BundleFixture::new("Sample", "1.0.0").write_to(&env.staging_dir)?;
    fs::rename(env.staging_dir.join("Sample.app"), &journal.backup)?;

    let outcome = updater.recover_interrupted_swap().await?;

    assert_eq!(outcome, RecoveryOutcome::StaleJournal);
    assert!(exists(&env.app_path));
    assert!(!exists(&journal.backup), "leftover backup should be removed");
    assert!(!exists(&updater.journal_path()));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_recover_leaves_running_swap_alone() -> Result<()> {
    let env = TestEnvironment::new()?;
    let updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    let mut journal = write_journal(&env, &updater).await?;
    journal.procedure_pid = Some(std::process::id());
    journal.save(&updater.journal_path()).await?;
    fs::rename(&env.app_path, &journal.backup)?;

    let outcome = updater.recover_interrupted_swap().await?;

    assert_eq!(
        outcome,
        RecoveryOutcome::InProgress {
            pid: std::process::id()
        }
    );
    assert!(!exists(&env.app_path), "a running swap must not be interfered with");
    assert!(exists(&updater.journal_path()));
    Ok(())
}

#[tokio::test]
async fn test_recover_reports_unrecoverable_state() -> Result<()> {
    let env = TestEnvironment::new()?;
    let updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    let journal = write_journal(&env, &updater).await?;
    fs::remove_dir_all(&env.app_path)?;

    let outcome = updater.recover_interrupted_swap().await?;

    assert_eq!(
        outcome,
        RecoveryOutcome::Unrecoverable {
            canonical: env.app_path.clone(),
            backup: journal.backup,
        }
    );
    assert!(exists(&updater.journal_path()), "journal is kept for manual repair");
    Ok(())
}

#[tokio::test]
async fn test_recover_discards_corrupt_journal() -> Result<()> {
    let env = TestEnvironment::new()?;
    let updater = Updater::new(env.config(UNUSED_URL, "1.0.0")?)?;
    fs::create_dir_all(&env.staging_dir)?;
    fs::write(updater.journal_path(), "{ truncated")?;

    assert_eq!(updater.recover_interrupted_swap().await?, RecoveryOutcome::StaleJournal);
    assert!(!exists(&updater.journal_path()));
    assert!(exists(&env.app_path));
    Ok(())
}
