//! Uninstall command: remove installed artifacts and restore backups.
//!
//! A run moves through [`Phase`]s in order. Declining the confirmation stops
//! in [`Phase::Confirming`] with nothing changed; otherwise every phase runs
//! even when individual artifacts fail.
use std::fmt;

use anyhow::{Context as _, Result};

use crate::backup::BackupStore;
use crate::catalog::{self, Artifact};
use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::error::RestoreError;
use crate::logging::{Log, Logger, StepStatus};
use crate::platform::{DeferredDelete, Deletion};
use crate::prompt::Prompt;
use crate::resources::artifact::ArtifactResource;
use crate::resources::fs::{path_exists, remove_empty_dirs};
use crate::resources::{Applicable, ResourceChange};
use crate::target::Target;

/// Progress of an uninstall run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has happened yet.
    Installed,
    /// Waiting for the operator to confirm.
    Confirming,
    /// Deleting installed artifacts.
    Removing,
    /// Copying backed-up content back.
    Restoring,
    /// Backup state cleared and entry point scheduled for deletion.
    Cleaned,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Installed => "installed",
            Self::Confirming => "confirming",
            Self::Removing => "removing",
            Self::Restoring => "restoring",
            Self::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Outcome of one uninstall run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    /// Last phase reached.
    pub phase: Phase,
    /// Artifacts whose destination was deleted.
    pub removed: Vec<String>,
    /// Manifest entries copied back.
    pub restored: Vec<String>,
    /// Artifacts or entries that failed, with the reason.
    pub failed: Vec<(String, String)>,
    /// What happened to the uninstaller entry point, if it was present.
    pub self_deletion: Option<Deletion>,
}

impl UninstallReport {
    const fn new() -> Self {
        Self {
            phase: Phase::Installed,
            removed: Vec::new(),
            restored: Vec::new(),
            failed: Vec::new(),
            self_deletion: None,
        }
    }

    /// `true` if the operator declined and nothing was changed.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.phase == Phase::Confirming
    }

    /// `true` when every phase ran and nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.phase == Phase::Cleaned && self.failed.is_empty()
    }
}

/// Reverses an install for one target.
#[derive(Debug)]
pub struct Uninstaller<'a> {
    target: &'a Target,
    deleter: &'a dyn DeferredDelete,
    log: &'a dyn Log,
    assume_yes: bool,
    dry_run: bool,
}

impl<'a> Uninstaller<'a> {
    /// Create an uninstaller that asks for confirmation.
    #[must_use]
    pub const fn new(
        target: &'a Target,
        deleter: &'a dyn DeferredDelete,
        log: &'a dyn Log,
    ) -> Self {
        Self {
            target,
            deleter,
            log,
            assume_yes: false,
            dry_run: false,
        }
    }

    /// Skip the confirmation prompt.
    #[must_use]
    pub const fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Log the plan instead of changing anything.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the confirmation cannot be read or the backup
    /// manifest cannot be loaded. Per-artifact failures are reported in the
    /// [`UninstallReport`].
    pub fn uninstall(&self, prompt: &mut dyn Prompt) -> Result<UninstallReport> {
        let artifacts = catalog::for_target(self.target);
        let mut store = BackupStore::open(self.target)?;
        let mut report = UninstallReport::new();

        if self.dry_run {
            self.plan(&store, &artifacts);
            return Ok(report);
        }

        report.phase = Phase::Confirming;
        if !self.assume_yes {
            let question = format!(
                "Remove Sage from {} and restore {} backed-up item(s)?",
                self.target.base_dir.display(),
                store.entries().len()
            );
            if !prompt.confirm(&question).context("reading confirmation")? {
                self.log.warn("uninstall cancelled; nothing was changed");
                return Ok(report);
            }
        }

        report.phase = Phase::Removing;
        self.log.stage("Removing installed artifacts");
        self.remove(&mut store, &artifacts, &mut report);

        report.phase = Phase::Restoring;
        self.log.stage("Restoring backups");
        self.restore(&mut store, &artifacts, &mut report);

        report.phase = Phase::Cleaned;
        self.log.stage("Cleaning up");
        self.clean(store, &artifacts, &mut report);

        Ok(report)
    }

    fn plan(&self, store: &BackupStore, artifacts: &[Artifact]) {
        for artifact in artifacts.iter().filter(|a| path_exists(&a.destination)) {
            self.log.dry_run(&format!("would remove {}", artifact.destination.display()));
            self.log.record_step(&artifact.id, StepStatus::DryRun, None);
        }
        for entry in store.entries() {
            self.log.dry_run(&format!("would restore {}", entry.id));
        }
        if path_exists(store.root()) {
            self.log.dry_run(&format!("would delete {}", store.root().display()));
        }
    }

    fn remove(
        &self,
        store: &mut BackupStore,
        artifacts: &[Artifact],
        report: &mut UninstallReport,
    ) {
        for artifact in artifacts.iter().filter(|a| !a.self_deletable) {
            let result = ArtifactResource::new(artifact, self.target)
                .remove()
                .and_then(|change| {
                    store.forget_installed(&artifact.id)?;
                    Ok(change)
                });
            match result {
                Ok(ResourceChange::Applied) => {
                    self.log.success(&format!("removed {}", artifact.id));
                    self.log.record_step(&artifact.id, StepStatus::Ok, Some("removed"));
                    report.removed.push(artifact.id.clone());
                }
                Ok(ResourceChange::AlreadyCorrect) => {
                    self.log.debug(&format!("{} not present", artifact.id));
                }
                Err(e) => self.fail(report, &artifact.id, &format!("{e:#}")),
            }
        }

        for artifact in artifacts.iter().filter(|a| !a.self_deletable) {
            if let Some(parent) = artifact.destination.parent() {
                remove_empty_dirs(parent, &self.target.base_dir);
            }
        }
    }

    fn restore(
        &self,
        store: &mut BackupStore,
        artifacts: &[Artifact],
        report: &mut UninstallReport,
    ) {
        for entry in store.entries().to_vec() {
            let result = catalog::find(artifacts, &entry.id)
                .ok_or_else(|| RestoreError::UnknownArtifact(entry.id.clone()))
                .and_then(|artifact| store.restore(&entry.id, &artifact.destination));
            match result {
                Ok(()) => {
                    self.log.success(&format!("restored {}", entry.id));
                    self.log.record_step(&entry.id, StepStatus::Ok, Some("restored"));
                    report.restored.push(entry.id.clone());
                }
                Err(e) => self.fail(report, &entry.id, &e.to_string()),
            }
        }
    }

    fn clean(&self, store: BackupStore, artifacts: &[Artifact], report: &mut UninstallReport) {
        if store.is_empty() {
            let root = store.root().to_path_buf();
            if let Err(e) = store.destroy() {
                self.fail(report, "backup store", &format!("{e:#}"));
            } else {
                self.log.debug(&format!("deleted {}", root.display()));
            }
        } else {
            self.log.warn(&format!(
                "{} backup(s) kept in {}",
                store.entries().len(),
                store.root().display()
            ));
        }

        let Some(entry_point) = artifacts
            .iter()
            .find(|a| a.self_deletable && path_exists(&a.destination))
        else {
            return;
        };
        match self
            .deleter
            .schedule(&entry_point.destination, &self.target.base_dir)
        {
            Ok(deletion) => {
                let note = match deletion {
                    Deletion::Done => "removed",
                    Deletion::Scheduled => "removal scheduled",
                };
                self.log.success(&format!("{} {note}", entry_point.id));
                self.log.record_step(&entry_point.id, StepStatus::Ok, Some(note));
                report.self_deletion = Some(deletion);
            }
            Err(e) => self.fail(report, &entry_point.id, &format!("{e:#}")),
        }
    }

    fn fail(&self, report: &mut UninstallReport, id: &str, reason: &str) {
        self.log.error(&format!("{id}: {reason}"));
        self.log.record_step(id, StepStatus::Failed, Some(reason));
        report.failed.push((id.to_string(), reason.to_string()));
    }
}

/// Run the uninstall command for the target resolved in `setup`.
///
/// # Errors
///
/// Returns an error if the confirmation cannot be read, or any removal or
/// restore failed.
pub fn run(
    global: &GlobalOpts,
    setup: &CommandSetup,
    prompt: &mut dyn Prompt,
    log: &Logger,
) -> Result<()> {
    setup.report(log);
    let deleter = setup.platform.deferred_delete();

    let report = Uninstaller::new(&setup.target, deleter.as_ref(), log)
        .assume_yes(global.yes)
        .dry_run(global.dry_run)
        .uninstall(prompt)?;

    if report.aborted() {
        return Ok(());
    }
    super::finish(log)
}
