//! Update checks against a mock artifact store.

use anyhow::Result;
use bundle_updater::core::UpdateError;
use bundle_updater::test_utils::TestEnvironment;
use bundle_updater::updater::Updater;
use wiremock::MockServer;

use crate::common::ArtifactStore;

fn updater(env: &TestEnvironment, source_url: &str, current: &str) -> Result<Updater> {
    Ok(Updater::new(env.config(source_url, current)?)?.with_progress(false))
}

#[tokio::test]
async fn test_check_reports_newer_version_and_caches_manifest() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("1.1.0", "abc123", 1).await;

    let mut updater = updater(&env, &store.url(), "1.0.0")?;
    let available = updater.check_for_update().await?;

    assert_eq!(available.as_deref(), Some("1.1.0"));
    let manifest = updater.manifest().expect("manifest should be cached after a check");
    assert_eq!(manifest.version, "1.1.0");
    assert_eq!(manifest.checksum, "abc123");
    Ok(())
}

#[tokio::test]
async fn test_check_same_or_older_version_is_not_an_update() -> Result<()> {
    let env = TestEnvironment::new()?;

    for (current, published) in [("1.0.0", "1.0.0"), ("2.0.0", "1.9.9"), ("1.0.0", "1.0.0-rc.1")] {
        let store = ArtifactStore::start().await;
        store.publish_manifest(published, "ff", 1).await;

        let mut updater = updater(&env, &store.url(), current)?;
        assert_eq!(
            updater.check_for_update().await?,
            None,
            "{published} must not be offered over {current}"
        );
        assert!(updater.manifest().is_some(), "manifest is cached even without an update");
    }
    Ok(())
}

#[tokio::test]
async fn test_check_accepts_v_prefix_and_prerelease_ordering() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("v1.0.0", "ff", 1).await;

    let mut updater = updater(&env, &store.url(), "1.0.0-beta.2")?;
    assert_eq!(updater.check_for_update().await?.as_deref(), Some("v1.0.0"));
    Ok(())
}

#[tokio::test]
async fn test_check_non_semver_versions_compare_as_strings() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.publish_manifest("nightly-2024-06-01", "ff", 1).await;

    let mut updater = updater(&env, &store.url(), "nightly-2024-05-01")?;
    assert_eq!(updater.check_for_update().await?.as_deref(), Some("nightly-2024-06-01"));
    Ok(())
}

#[tokio::test]
async fn test_check_http_error_status() -> Result<()> {
    let env = TestEnvironment::new()?;
    let store = ArtifactStore::start().await;
    store.respond_status(ArtifactStore::manifest_path(), 404).await;

    let mut updater = updater(&env, &store.url(), "1.0.0")?;
    let err = updater.check_for_update().await.unwrap_err();

    match err {
        UpdateError::HttpStatus {
            status,
            url,
        } => {
            assert_eq!(status, 404);
            assert!(url.ends_with(&ArtifactStore::manifest_path()), "unexpected url {url}");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(updater.manifest().is_none());
    Ok(())
}

#[tokio::test]
async fn test_check_malformed_manifest() -> Result<()> {
    let env = TestEnvironment::new()?;

    for body in ["not json at all", r#"{"version": "1.1.0"}"#, r#"{"version": 11, "checksum": "ff"}"#]
    {
        let store = ArtifactStore::start().await;
        store.respond_manifest_body(body).await;

        let mut updater = updater(&env, &store.url(), "1.0.0")?;
        let err = updater.check_for_update().await.unwrap_err();
        assert!(
            matches!(err, UpdateError::ManifestParse { .. }),
            "body {body:?} should fail to parse, got {err:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_check_unreachable_server_is_transport_error() -> Result<()> {
    let env = TestEnvironment::new()?;
    let url = {
        let server = MockServer::start().await;
        server.uri()
    };

    let mut updater = updater(&env, &url, "1.0.0")?;
    let err = updater.check_for_update().await.unwrap_err();

    assert!(matches!(err, UpdateError::Transport { .. }), "got {err:?}");
    assert!(err.is_network());
    Ok(())
}

#[tokio::test]
async fn test_check_replaces_cached_manifest() -> Result<()> {
    let env = TestEnvironment::new()?;
    let first = ArtifactStore::start().await;
    first.publish_manifest("1.1.0", "aa", 1).await;

    let mut updater = updater(&env, &first.url(), "1.0.0")?;
    updater.check_for_update().await?;
    assert_eq!(updater.manifest().map(|m| m.checksum.as_str()), Some("aa"));

    // Same store, new release published in between.
    first.server.reset().await;
    first.publish_manifest("1.2.0", "bb", 1).await;
    assert_eq!(updater.check_for_update().await?.as_deref(), Some("1.2.0"));
    assert_eq!(updater.manifest().map(|m| m.checksum.as_str()), Some("bb"));
    Ok(())
}
