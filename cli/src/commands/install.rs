//! Install command: deploy every catalog artifact for a target.
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::backup::BackupStore;
use crate::catalog::{self, Artifact};
use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::config::Config;
use crate::error::VerificationError;
use crate::logging::{Log, Logger, StepStatus};
use crate::resources::artifact::ArtifactResource;
use crate::resources::fs::path_exists;
use crate::resources::{Applicable, ResourceChange};
use crate::source::{self, LocalSource, RemoteSource, Source};
use crate::target::Target;

/// Outcome of one install run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Artifacts written or already in place.
    pub succeeded: Vec<String>,
    /// Artifacts that could not be deployed, with the reason.
    pub failed: Vec<(String, String)>,
    /// Artifacts not touched (dry run).
    pub skipped: Vec<String>,
    /// Artifacts missing after the run.
    pub verification: Vec<VerificationError>,
}

impl InstallReport {
    /// `true` when nothing failed and verification found every artifact.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.verification.is_empty()
    }
}

/// Deploys the catalog for one target.
#[derive(Debug)]
pub struct Installer<'a> {
    target: &'a Target,
    source: &'a dyn Source,
    executable: &'a Path,
    style_name: &'a str,
    dry_run: bool,
    log: &'a dyn Log,
}

impl<'a> Installer<'a> {
    /// Create an installer. `executable` is copied into the target as the
    /// uninstaller entry point.
    #[must_use]
    pub const fn new(
        target: &'a Target,
        source: &'a dyn Source,
        executable: &'a Path,
        log: &'a dyn Log,
    ) -> Self {
        Self {
            target,
            source,
            executable,
            style_name: catalog::DEFAULT_OUTPUT_STYLE,
            dry_run: false,
            log,
        }
    }

    /// Value written to the `outputStyle` settings key.
    #[must_use]
    pub const fn style_name(mut self, name: &'a str) -> Self {
        self.style_name = name;
        self
    }

    /// Log the plan instead of writing anything.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Deploy every artifact in catalog order, then verify.
    ///
    /// A failing artifact is recorded and the run continues with the next.
    ///
    /// # Errors
    ///
    /// Returns an error only if the existing backup manifest cannot be read;
    /// per-artifact failures are reported in the [`InstallReport`].
    pub fn install(&self) -> Result<InstallReport> {
        let artifacts = catalog::for_target_with_style(self.target, self.style_name);
        let mut store = BackupStore::open(self.target)?;
        let mut report = InstallReport::default();

        self.log.stage(&format!(
            "Installing {} artifacts into {}",
            artifacts.len(),
            self.target.base_dir.display()
        ));
        self.log.debug(&format!("source: {}", self.source.describe()));

        for artifact in &artifacts {
            if self.dry_run {
                self.plan(&store, artifact);
                report.skipped.push(artifact.id.clone());
                continue;
            }

            match self.deploy(&mut store, artifact) {
                Ok(change) => {
                    let note = (change == ResourceChange::AlreadyCorrect).then_some("unchanged");
                    self.log.success(&artifact.id);
                    self.log.record_step(&artifact.id, StepStatus::Ok, note);
                    report.succeeded.push(artifact.id.clone());
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    self.log.error(&format!("{}: {reason}", artifact.id));
                    self.log.record_step(&artifact.id, StepStatus::Failed, Some(&reason));
                    report.failed.push((artifact.id.clone(), reason));
                }
            }
        }

        if !self.dry_run {
            report.verification = self.verify(&artifacts);
        }
        Ok(report)
    }

    fn plan(&self, store: &BackupStore, artifact: &Artifact) {
        if store.would_capture(artifact) {
            self.log.dry_run(&format!(
                "would back up {}",
                artifact.destination.display()
            ));
        }
        self.log.dry_run(&format!(
            "would install {} to {}",
            artifact.id,
            artifact.destination.display()
        ));
        self.log.record_step(&artifact.id, StepStatus::DryRun, None);
    }

    fn deploy(&self, store: &mut BackupStore, artifact: &Artifact) -> Result<ResourceChange> {
        if let Some(entry) = store.capture_if_present(artifact)? {
            self.log.info(&format!(
                "backed up existing {} to {}",
                artifact.destination.display(),
                store.root().join(&entry.payload).display()
            ));
        }

        let resource =
            ArtifactResource::new(artifact, self.target).with_content(self.source, self.executable);
        self.log.debug(&resource.description());
        let change = resource.apply()?;

        store
            .mark_installed(&artifact.id)
            .context("recording installed artifact")?;
        Ok(change)
    }

    fn verify(&self, artifacts: &[Artifact]) -> Vec<VerificationError> {
        self.log.stage("Verifying");
        let missing: Vec<VerificationError> = artifacts
            .iter()
            .filter(|a| !path_exists(&a.destination))
            .map(|a| VerificationError {
                id: a.id.clone(),
                path: a.destination.clone(),
            })
            .collect();
        for error in &missing {
            self.log.error(&error.to_string());
        }
        if missing.is_empty() {
            self.log.success(&format!("all {} artifacts present", artifacts.len()));
        }
        missing
    }
}

/// Pick the content source from `--remote`, `--source`, and configuration.
///
/// # Errors
///
/// Returns an error if no distribution root can be found, or `--remote` is
/// given without a URL and none is configured.
pub fn open_source(global: &GlobalOpts) -> Result<Box<dyn Source>> {
    match &global.remote {
        Some(Some(url)) => Ok(Box::new(RemoteSource::new(url))),
        Some(None) => {
            let local = LocalSource::new(source::resolve_root(global.source.as_deref())?);
            let url = Config::load(&local)?.remote.base_url.with_context(|| {
                format!(
                    "--remote needs a URL or [remote] base_url in {}",
                    crate::config::CONFIG_PATH
                )
            })?;
            Ok(Box::new(RemoteSource::new(&url)))
        }
        None => Ok(Box::new(LocalSource::new(source::resolve_root(
            global.source.as_deref(),
        )?))),
    }
}

/// Run the install command for the target resolved in `setup`.
///
/// # Errors
///
/// Returns an error if the source or configuration cannot be loaded, or any
/// artifact failed.
pub fn run(global: &GlobalOpts, setup: &CommandSetup, log: &Logger) -> Result<()> {
    log.info(&format!("sage {}", super::version::version()));
    setup.report(log);

    let source = open_source(global)?;
    log.info(&format!("source: {}", source.describe()));
    let config = Config::load(source.as_ref())?;

    let executable = setup
        .executable
        .clone()
        .context("cannot locate the running executable")?;
    let report = Installer::new(&setup.target, source.as_ref(), &executable, log)
        .style_name(&config.style.name)
        .dry_run(global.dry_run)
        .install()?;

    for error in &report.verification {
        log.record_step(&error.id, StepStatus::Failed, Some("missing after install"));
    }
    super::finish(log)
}
