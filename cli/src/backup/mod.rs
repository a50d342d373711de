//! Pre-overwrite backup capture and manifest-driven restore.
//!
//! A [`BackupStore`] lives at `<base>/.sage-backup/`. It is created lazily the
//! first time something is persisted and removed once every captured entry
//! has been restored.
pub mod manifest;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::Utc;

pub use manifest::{Manifest, ManifestEntry};

use crate::catalog::Artifact;
use crate::error::RestoreError;
use crate::resources::fs::{copy_path, path_exists, remove_path};
use crate::target::Target;

/// Backup state for one target.
#[derive(Debug)]
pub struct BackupStore {
    root: PathBuf,
    manifest: Manifest,
}

impl BackupStore {
    /// Open the store for `target`, loading any existing manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing manifest cannot be read or parsed.
    pub fn open(target: &Target) -> Result<Self> {
        Self::open_at(target.backup_dir())
    }

    /// Open the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing manifest cannot be read or parsed.
    pub fn open_at(root: PathBuf) -> Result<Self> {
        let manifest = Manifest::load(&root)
            .with_context(|| format!("loading backup manifest from {}", root.display()))?;
        Ok(Self { root, manifest })
    }

    /// Store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Captured entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        self.manifest.entries()
    }

    /// `true` when no captured entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifest.entries().is_empty()
    }

    /// Whether `id` is recorded as holding installed content.
    #[must_use]
    pub fn is_installed(&self, id: &str) -> bool {
        self.manifest.is_installed(id)
    }

    /// Whether [`capture_if_present`](Self::capture_if_present) would take a
    /// copy of `artifact`'s destination right now.
    #[must_use]
    pub fn would_capture(&self, artifact: &Artifact) -> bool {
        self.manifest.entry(&artifact.id).is_none()
            && !self.manifest.is_installed(&artifact.id)
            && path_exists(&artifact.destination)
    }

    /// Copy the destination of `artifact` into the store if it holds foreign
    /// content that has not been captured yet.
    ///
    /// The manifest is persisted before this returns, so a crash right after
    /// still leaves a restorable entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy or the manifest write fails; the store is
    /// left without an entry for `artifact` in that case.
    pub fn capture_if_present(&mut self, artifact: &Artifact) -> Result<Option<ManifestEntry>> {
        if !self.would_capture(artifact) {
            return Ok(None);
        }

        let entry = ManifestEntry::new(&artifact.id, Utc::now());
        let payload = self.root.join(&entry.payload);
        remove_path(&payload)?;
        copy_path(&artifact.destination, &payload).with_context(|| {
            format!(
                "backing up {} for '{}'",
                artifact.destination.display(),
                artifact.id
            )
        })?;

        self.manifest.push(entry.clone());
        if let Err(e) = self.manifest.persist(&self.root) {
            self.manifest.remove(&entry.id);
            discard(&payload);
            return Err(e);
        }
        tracing::debug!("captured {} into {}", artifact.id, payload.display());
        Ok(Some(entry))
    }

    /// Record that `id` now holds installed content and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be written.
    pub fn mark_installed(&mut self, id: &str) -> Result<()> {
        if self.manifest.is_installed(id) {
            return Ok(());
        }
        self.manifest.mark_installed(id);
        self.manifest.persist(&self.root)
    }

    /// Forget that `id` holds installed content and persist, unless the store
    /// was never created.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be written.
    pub fn forget_installed(&mut self, id: &str) -> Result<()> {
        if !self.manifest.is_installed(id) {
            return Ok(());
        }
        self.manifest.forget_installed(id);
        self.manifest.persist(&self.root)
    }

    /// Copy the payload for `id` back to `destination`, replacing whatever is
    /// there, then drop the entry and persist.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError`] if there is no such entry, its payload is
    /// gone, or the copy fails. The entry is kept in that case.
    pub fn restore(&mut self, id: &str, destination: &Path) -> Result<(), RestoreError> {
        let entry = self
            .manifest
            .entry(id)
            .ok_or_else(|| RestoreError::UnknownArtifact(id.to_string()))?;
        let payload = self.root.join(&entry.payload);
        if !path_exists(&payload) {
            return Err(RestoreError::PayloadMissing {
                id: id.to_string(),
                payload,
            });
        }

        let copy_failed = |e: anyhow::Error| RestoreError::Copy {
            id: id.to_string(),
            destination: destination.to_path_buf(),
            reason: format!("{e:#}"),
        };
        remove_path(destination).map_err(copy_failed)?;
        copy_path(&payload, destination).map_err(copy_failed)?;

        self.manifest.remove(id);
        self.manifest.persist(&self.root).map_err(copy_failed)?;
        discard(&payload);
        Ok(())
    }

    /// Delete the store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn destroy(self) -> Result<()> {
        remove_path(&self.root)
    }
}

/// Remove a payload that is no longer referenced. A leftover only wastes
/// space, so failure is logged rather than returned.
fn discard(payload: &Path) {
    if let Err(e) = remove_path(payload) {
        tracing::warn!("orphaned backup payload {}: {e:#}", payload.display());
    }
}

/// Manifest entries for `target`, in capture order. Read-only.
///
/// # Errors
///
/// Returns an error if the manifest exists but cannot be read or parsed.
pub fn manifest_entries(target: &Target) -> Result<Vec<ManifestEntry>> {
    Ok(Manifest::load(&target.backup_dir())?.entries().to_vec())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::{self, ArtifactKind};
    use crate::target::TargetId;

    fn setup() -> (tempfile::TempDir, Target) {
        let home = tempfile::tempdir().unwrap();
        let target = Target::new(TargetId::Claude, home.path());
        std::fs::create_dir_all(&target.base_dir).unwrap();
        (home, target)
    }

    fn persona(target: &Target) -> Artifact {
        catalog::find(&catalog::for_target(target), "persona").unwrap().clone()
    }

    #[test]
    fn absent_destination_is_not_captured() {
        let (_home, target) = setup();
        let mut store = BackupStore::open(&target).unwrap();
        assert!(store.capture_if_present(&persona(&target)).unwrap().is_none());
        assert!(!store.root().exists(), "store is created lazily");
    }

    #[test]
    fn foreign_content_is_captured_and_persisted() {
        let (_home, target) = setup();
        let artifact = persona(&target);
        std::fs::write(&artifact.destination, "mine").unwrap();

        let mut store = BackupStore::open(&target).unwrap();
        let entry = store.capture_if_present(&artifact).unwrap().unwrap();

        assert_eq!(entry.id, "persona");
        assert_eq!(
            std::fs::read_to_string(store.root().join(&entry.payload)).unwrap(),
            "mine"
        );
        let on_disk = manifest_entries(&target).unwrap();
        assert_eq!(on_disk, vec![entry]);
    }

    #[test]
    fn second_capture_never_overwrites_first() {
        let (_home, target) = setup();
        let artifact = persona(&target);
        std::fs::write(&artifact.destination, "original").unwrap();
        let mut store = BackupStore::open(&target).unwrap();
        store.capture_if_present(&artifact).unwrap();

        std::fs::write(&artifact.destination, "changed").unwrap();
        assert!(store.capture_if_present(&artifact).unwrap().is_none());

        let payload = store.root().join(&store.entries()[0].payload);
        assert_eq!(std::fs::read_to_string(payload).unwrap(), "original");
    }

    #[test]
    fn installed_content_is_not_captured() {
        let (_home, target) = setup();
        let artifact = persona(&target);
        let mut store = BackupStore::open(&target).unwrap();
        store.mark_installed(&artifact.id).unwrap();
        std::fs::write(&artifact.destination, "ours").unwrap();

        let reopened = BackupStore::open(&target).unwrap();
        assert!(!reopened.would_capture(&artifact));
        assert!(store.capture_if_present(&artifact).unwrap().is_none());
    }

    #[test]
    fn tree_destinations_are_captured_recursively() {
        let (_home, target) = setup();
        let artifacts = catalog::for_target(&target);
        let tree = artifacts
            .iter()
            .find(|a| matches!(a.kind, ArtifactKind::Tree { .. }))
            .unwrap();
        std::fs::create_dir_all(tree.destination.join("scripts")).unwrap();
        std::fs::write(tree.destination.join("scripts/custom.py"), "x = 1").unwrap();

        let mut store = BackupStore::open(&target).unwrap();
        let entry = store.capture_if_present(tree).unwrap().unwrap();
        assert!(store.root().join(&entry.payload).join("scripts/custom.py").is_file());
    }

    #[test]
    fn restore_round_trips_bytes_and_drops_entry() {
        let (_home, target) = setup();
        let artifact = persona(&target);
        let original = b"\x00binary\r\nbytes\xff".to_vec();
        std::fs::write(&artifact.destination, &original).unwrap();
        let mut store = BackupStore::open(&target).unwrap();
        let entry = store.capture_if_present(&artifact).unwrap().unwrap();

        std::fs::write(&artifact.destination, "installed").unwrap();
        store.restore("persona", &artifact.destination).unwrap();

        assert_eq!(std::fs::read(&artifact.destination).unwrap(), original);
        assert!(!path_exists(&store.root().join(&entry.payload)), "payload is discarded");
        assert!(store.is_empty());
        assert!(manifest_entries(&target).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_destination_is_captured_as_link() {
        let (home, target) = setup();
        let artifact = persona(&target);
        let linked = home.path().join("dotfiles/CLAUDE.md");
        std::os::unix::fs::symlink(&linked, &artifact.destination).unwrap();

        let mut store = BackupStore::open(&target).unwrap();
        let entry = store.capture_if_present(&artifact).unwrap().unwrap();
        let payload = store.root().join(&entry.payload);
        assert_eq!(std::fs::read_link(&payload).unwrap(), linked);

        std::fs::remove_file(&artifact.destination).unwrap();
        std::fs::write(&artifact.destination, "installed").unwrap();
        store.restore("persona", &artifact.destination).unwrap();
        assert_eq!(std::fs::read_link(&artifact.destination).unwrap(), linked);
    }

    #[test]
    fn restore_with_missing_payload_keeps_entry() {
        let (_home, target) = setup();
        let artifact = persona(&target);
        std::fs::write(&artifact.destination, "mine").unwrap();
        let mut store = BackupStore::open(&target).unwrap();
        let entry = store.capture_if_present(&artifact).unwrap().unwrap();
        std::fs::remove_file(store.root().join(&entry.payload)).unwrap();

        let err = store.restore("persona", &artifact.destination).unwrap_err();
        assert!(matches!(err, RestoreError::PayloadMissing { .. }));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn restore_unknown_id_is_error() {
        let (_home, target) = setup();
        let mut store = BackupStore::open(&target).unwrap();
        let err = store.restore("nope", &target.base_dir.join("nope")).unwrap_err();
        assert!(matches!(err, RestoreError::UnknownArtifact(_)));
    }

    #[test]
    fn destroy_removes_store_directory() {
        let (_home, target) = setup();
        let mut store = BackupStore::open(&target).unwrap();
        store.mark_installed("persona").unwrap();
        assert!(target.backup_dir().exists());
        store.destroy().unwrap();
        assert!(!target.backup_dir().exists());
    }
}
