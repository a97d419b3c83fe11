use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{InventoryError, Result};
use crate::installer::Installer;
use crate::manifest::MANIFEST_FILE;
use crate::models::DependencyMetadata;

/// Reads installed dependencies' own manifests, installing an application's
/// dependencies first when they are not on disk yet.
pub struct MetadataResolver<I> {
    installer: I,
    materialization_dir: String,
    /// Outcome of materializing each root seen so far. The lock is held for
    /// the duration of an install, so installs never overlap.
    roots: Mutex<HashMap<PathBuf, RootState>>,
}

#[derive(Debug, Clone)]
enum RootState {
    Ready,
    Failed(String),
}

impl<I: Installer> MetadataResolver<I> {
    pub fn new(installer: I, materialization_dir: impl Into<String>) -> Self {
        Self {
            installer,
            materialization_dir: materialization_dir.into(),
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// Return `{name, version, description}` of `identifier` as installed
    /// under `root`.
    pub async fn resolve_metadata(
        &self,
        identifier: &str,
        root: &Path,
    ) -> Result<DependencyMetadata> {
        if !is_package_path(identifier) {
            return Err(InventoryError::resolution(identifier, root, "invalid package name"));
        }
        self.ensure_materialized(root).await?;

        let path = root
            .join(&self.materialization_dir)
            .join(identifier)
            .join(MANIFEST_FILE);
        debug!(path = %path.display(), "reading dependency manifest");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            InventoryError::resolution(identifier, root, format!("{}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            InventoryError::resolution(identifier, root, format!("{}: {}", path.display(), e))
        })
    }

    /// Install under `root` at most once per run. A failed install is
    /// remembered and reported again without rerunning the installer.
    async fn ensure_materialized(&self, root: &Path) -> Result<()> {
        let mut roots = self.roots.lock().await;
        match roots.get(root) {
            Some(RootState::Ready) => return Ok(()),
            Some(RootState::Failed(reason)) => {
                return Err(InventoryError::installation(root, reason));
            }
            None => {}
        }

        let dir = root.join(&self.materialization_dir);
        let outcome = match tokio::fs::try_exists(&dir).await {
            Ok(true) => Ok(()),
            Ok(false) => self.installer.ensure_materialized(root).await,
            Err(e) => Err(InventoryError::installation(
                root,
                format!("{}: {}", dir.display(), e),
            )),
        };

        let state = match &outcome {
            Ok(()) => RootState::Ready,
            Err(InventoryError::Installation { reason, .. }) => RootState::Failed(reason.clone()),
            Err(e) => RootState::Failed(e.to_string()),
        };
        roots.insert(root.to_path_buf(), state);
        outcome
    }
}

/// Package names map to one directory level below the materialization
/// directory, or two for `@scope/name`. Anything that could leave it is
/// rejected.
fn is_package_path(identifier: &str) -> bool {
    !identifier.is_empty()
        && Path::new(identifier)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{stage_package, write_installed, FakeInstaller};

    #[tokio::test]
    async fn test_reads_installed_metadata_without_installing() {
        let app = tempfile::tempdir().unwrap();
        write_installed(
            app.path(),
            "left-pad",
            r#"{ "name": "left-pad", "version": "1.0.0", "description": "pad left", "main": "index.js" }"#,
        );

        let installer = FakeInstaller::new();
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");
        let meta = resolver.resolve_metadata("left-pad", app.path()).await.unwrap();

        assert_eq!(meta.name, "left-pad");
        assert_eq!(meta.version, "1.0.0");
        assert_eq!(meta.description.as_deref(), Some("pad left"));
        assert_eq!(installer.calls(), 0);
    }

    #[tokio::test]
    async fn test_installs_once_when_directory_is_missing() {
        let app = tempfile::tempdir().unwrap();
        stage_package(app.path(), "foo", r#"{ "name": "foo", "version": "1.0.0" }"#);
        stage_package(app.path(), "@scope/bar", r#"{ "name": "@scope/bar", "version": "2.1.0" }"#);

        let installer = FakeInstaller::new();
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");

        let foo = resolver.resolve_metadata("foo", app.path()).await.unwrap();
        let bar = resolver.resolve_metadata("@scope/bar", app.path()).await.unwrap();

        assert_eq!(foo.description, None);
        assert_eq!(bar.version, "2.1.0");
        assert_eq!(installer.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_share_one_install() {
        let app = tempfile::tempdir().unwrap();
        let ids: Vec<String> = (0..8).map(|i| format!("pkg-{}", i)).collect();
        for id in &ids {
            stage_package(
                app.path(),
                id,
                &format!(r#"{{ "name": "{}", "version": "0.0.1" }}"#, id),
            );
        }

        let installer = FakeInstaller::new().with_delay_ms(20);
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");

        let results = futures::future::join_all(
            ids.iter().map(|id| resolver.resolve_metadata(id, app.path())),
        )
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(installer.calls(), 1);
    }

    #[tokio::test]
    async fn test_install_failure_propagates() {
        let app = tempfile::tempdir().unwrap();
        let installer = FakeInstaller::new().failing_for(app.path());
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");

        let err = resolver.resolve_metadata("foo", app.path()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Installation { .. }));

        let again = resolver.resolve_metadata("bar", app.path()).await.unwrap_err();
        assert!(again.to_string().contains("network timeout"));
        assert_eq!(installer.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_package_is_resolution_error() {
        let app = tempfile::tempdir().unwrap();
        std::fs::create_dir(app.path().join("node_modules")).unwrap();
        let resolver = MetadataResolver::new(FakeInstaller::new(), "node_modules");

        let err = resolver.resolve_metadata("ghost", app.path()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Resolution { ref identifier, .. } if identifier == "ghost"));
    }

    #[tokio::test]
    async fn test_manifest_without_version_is_resolution_error() {
        let app = tempfile::tempdir().unwrap();
        write_installed(app.path(), "broken", r#"{ "name": "broken" }"#);
        let resolver = MetadataResolver::new(FakeInstaller::new(), "node_modules");

        let err = resolver.resolve_metadata("broken", app.path()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_identifier_cannot_leave_install_directory() {
        let app = tempfile::tempdir().unwrap();
        std::fs::create_dir(app.path().join("node_modules")).unwrap();

        let outside = tempfile::tempdir().unwrap();
        std::fs::write(
            outside.path().join("package.json"),
            r#"{ "name": "not-a-dep", "version": "6.6.6" }"#,
        )
        .unwrap();
        write_installed(app.path(), "../escape", r#"{ "name": "escape", "version": "1.0.0" }"#);

        let installer = FakeInstaller::new();
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");

        let absolute = outside.path().to_string_lossy().into_owned();
        for identifier in [absolute.as_str(), "../escape", "./foo", "foo/../../bar", ""] {
            let err = resolver.resolve_metadata(identifier, app.path()).await.unwrap_err();
            assert!(
                err.to_string().contains("invalid package name"),
                "{:?} accepted: {}",
                identifier,
                err
            );
        }
        assert_eq!(installer.calls(), 0);
    }

    #[test]
    fn test_scoped_names_are_package_paths() {
        assert!(is_package_path("left-pad"));
        assert!(is_package_path("@scope/bar"));
        assert!(!is_package_path("/etc"));
        assert!(!is_package_path("@scope/../bar"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_install_directory_is_installation_error() {
        // a file where the application directory should be makes the
        // existence check fail with ENOTDIR instead of reporting "missing"
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, "").unwrap();

        let installer = FakeInstaller::new();
        let resolver = MetadataResolver::new(installer.clone(), "node_modules");

        let err = resolver.resolve_metadata("foo", &root).await.unwrap_err();
        assert!(matches!(err, InventoryError::Installation { .. }));
        assert_eq!(installer.calls(), 0);
    }
}
