//! Deploy and remove one catalog artifact.
use std::path::Path;

use anyhow::{Context as _, Result};

use super::fs::{ensure_parent_dir, path_exists, remove_path, replace_path, staging_path};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::catalog::{Artifact, ArtifactKind};
use crate::error::FetchError;
use crate::settings::{self, MergeOutcome};
use crate::source::Source;
use crate::target::Target;

/// A catalog artifact bound to the inputs needed to produce it.
///
/// File and tree content is staged next to the destination and renamed into
/// place, so a failed fetch leaves the previous content intact. Trees are
/// replaced wholesale rather than merged.
#[derive(Debug)]
pub struct ArtifactResource<'a> {
    /// The artifact being deployed.
    pub artifact: &'a Artifact,
    target: &'a Target,
    content: Option<Content<'a>>,
}

/// Where deployed content comes from.
#[derive(Debug, Clone, Copy)]
struct Content<'a> {
    source: &'a dyn Source,
    executable: &'a Path,
}

impl<'a> ArtifactResource<'a> {
    /// Bind `artifact` to `target`. Enough for state checks, removal, and
    /// settings merges.
    #[must_use]
    pub const fn new(artifact: &'a Artifact, target: &'a Target) -> Self {
        Self {
            artifact,
            target,
            content: None,
        }
    }

    /// Attach the content source and the installer executable copied for
    /// [`ArtifactKind::Executable`].
    #[must_use]
    pub const fn with_content(self, source: &'a dyn Source, executable: &'a Path) -> Self {
        Self {
            content: Some(Content { source, executable }),
            ..self
        }
    }

    fn content(&self) -> Result<Content<'a>> {
        self.content
            .with_context(|| format!("no content source for '{}'", self.artifact.id))
    }

    fn dest(&self) -> &Path {
        &self.artifact.destination
    }

    fn staged(
        &self,
        fetch: impl FnOnce(&Path) -> Result<(), FetchError>,
    ) -> Result<ResourceChange> {
        let staged = staging_path(self.dest());
        remove_path(&staged)?;
        if let Err(e) = fetch(&staged) {
            if let Err(cleanup) = remove_path(&staged) {
                tracing::warn!("leaving staged {}: {cleanup:#}", staged.display());
            }
            return Err(e.into());
        }
        replace_path(&staged, self.dest())?;
        Ok(ResourceChange::Applied)
    }

    fn copy_executable(&self, executable: &Path) -> Result<ResourceChange> {
        if let (Ok(a), Ok(b)) = (
            dunce::canonicalize(executable),
            dunce::canonicalize(self.dest()),
        ) && a == b
        {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.staged(|staged| {
            ensure_parent_dir(staged)
                .and_then(|()| std::fs::copy(executable, staged).map(|_| ()))
                .map_err(|source| FetchError::Io {
                    action: "copy installer to",
                    path: staged.to_path_buf(),
                    source,
                })
        })
    }
}

impl Applicable for ArtifactResource<'_> {
    fn description(&self) -> String {
        format!("{} -> {}", self.artifact.id, self.dest().display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        match &self.artifact.kind {
            ArtifactKind::File { source } => {
                let content = self.content()?;
                self.staged(|staged| content.source.fetch_file(source, staged))
            }
            ArtifactKind::Tree { source, files } => {
                let content = self.content()?;
                self.staged(|staged| content.source.fetch_tree(source, files, staged))
            }
            ArtifactKind::Executable => self.copy_executable(self.content()?.executable),
            ArtifactKind::Settings { keys } => {
                ensure_parent_dir(self.dest())
                    .with_context(|| format!("create parent of {}", self.dest().display()))?;
                match settings::merge_keys(self.target, self.dest(), keys)? {
                    MergeOutcome::Created | MergeOutcome::Updated => Ok(ResourceChange::Applied),
                    MergeOutcome::Unchanged => Ok(ResourceChange::AlreadyCorrect),
                }
            }
        }
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !path_exists(self.dest()) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        remove_path(self.dest())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ArtifactResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(if path_exists(self.dest()) {
            ResourceState::Present
        } else {
            ResourceState::Missing
        })
    }
}
