//! Status command: report what is installed for a target.
use std::path::PathBuf;

use anyhow::Result;

use crate::backup::{BackupStore, ManifestEntry};
use crate::catalog;
use crate::commands::CommandSetup;
use crate::logging::{Log, Logger};
use crate::resources::artifact::ArtifactResource;
use crate::resources::{Resource, ResourceState};
use crate::target::Target;

/// State of one catalog artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    /// Artifact identifier.
    pub id: String,
    /// Where it belongs.
    pub destination: PathBuf,
    /// Whether anything is there.
    pub state: ResourceState,
    /// Whether the content there was written by `install`.
    pub installed: bool,
}

/// Derived snapshot of a target's artifacts and backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallState {
    /// Per-artifact state, in catalog order.
    pub artifacts: Vec<ArtifactStatus>,
    /// Captured backups, in capture order.
    pub backups: Vec<ManifestEntry>,
}

impl InstallState {
    /// `true` when every artifact is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.artifacts
            .iter()
            .all(|a| a.state == ResourceState::Present)
    }

    /// `true` when no artifact and no backup is present.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.backups.is_empty()
            && self
                .artifacts
                .iter()
                .all(|a| a.state == ResourceState::Missing)
    }
}

/// Inspect `target` without changing anything.
///
/// # Errors
///
/// Returns an error if the backup manifest exists but cannot be read.
pub fn inspect(target: &Target) -> Result<InstallState> {
    let store = BackupStore::open(target)?;
    let artifacts = catalog::for_target(target)
        .iter()
        .map(|artifact| -> Result<ArtifactStatus> {
            let state = ArtifactResource::new(artifact, target).current_state()?;
            Ok(ArtifactStatus {
                id: artifact.id.clone(),
                destination: artifact.destination.clone(),
                state,
                installed: store.is_installed(&artifact.id),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(InstallState {
        artifacts,
        backups: store.entries().to_vec(),
    })
}

/// Log `state` in a readable form.
pub fn report(state: &InstallState, log: &dyn Log) {
    log.stage("Artifacts");
    for artifact in &state.artifacts {
        let line = format!("{} ({})", artifact.id, artifact.destination.display());
        match (artifact.state, artifact.installed) {
            (ResourceState::Present, true) => log.success(&line),
            (ResourceState::Present, false) => log.info(&format!("{line} [not installed by sage]")),
            (ResourceState::Missing, _) => log.warn(&format!("{line} [missing]")),
        }
    }

    log.stage("Backups");
    if state.backups.is_empty() {
        log.info("none");
    }
    for entry in &state.backups {
        log.info(&format!(
            "{} captured {}",
            entry.id,
            entry.captured_at.to_rfc3339()
        ));
    }
}

/// Run the status command for the target resolved in `setup`.
///
/// # Errors
///
/// Returns an error if the backup manifest cannot be read.
pub fn run(setup: &CommandSetup, log: &Logger) -> Result<()> {
    setup.report(log);
    let state = inspect(&setup.target)?;
    report(&state, log);
    Ok(())
}
