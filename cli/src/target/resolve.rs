//! Turn a flag, the invoking path, or an operator answer into a [`Target`].
use std::path::Path;

use super::{Target, TargetId};
use crate::error::UsageError;
use crate::prompt::Prompt;

/// Infers the target from where the program was started.
pub trait DetectionStrategy: std::fmt::Debug {
    /// Return the target whose base directory contains `invoking_path`.
    fn detect(&self, invoking_path: &Path, home: &Path) -> Option<TargetId>;
}

/// Detects a target when the running executable lives inside that target's
/// base directory (the uninstaller copy placed there by `install`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableLocation;

impl DetectionStrategy for ExecutableLocation {
    fn detect(&self, invoking_path: &Path, home: &Path) -> Option<TargetId> {
        let invoking = dunce::canonicalize(invoking_path).unwrap_or_else(|_| invoking_path.into());
        TargetId::ALL.into_iter().find(|id| {
            let base = Target::new(*id, home).base_dir;
            let base = dunce::canonicalize(&base).unwrap_or(base);
            invoking.starts_with(&base)
        })
    }
}

/// Inputs to [`resolve`].
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Value of `--target`, if given.
    pub flag: Option<&'a str>,
    /// Path of the running entry point, used for self-detection.
    pub invoking_path: Option<&'a Path>,
    /// Whether the operator may be asked.
    pub interactive: bool,
    /// Home directory all base directories are rooted at.
    pub home: &'a Path,
}

/// Resolve the target for this run. Performs no filesystem writes.
///
/// Order: explicit flag, then self-detection, then an interactive numbered
/// prompt (default: the first target).
///
/// # Errors
///
/// Returns [`UsageError::UnknownTarget`] for an unsupported flag value,
/// [`UsageError::TargetRequired`] when nothing selects a target and prompting
/// is not allowed, and [`UsageError::InvalidSelection`] /
/// [`UsageError::Prompt`] when the interactive answer is unusable.
pub fn resolve(
    request: &Request<'_>,
    detector: &dyn DetectionStrategy,
    prompt: &mut dyn Prompt,
) -> Result<Target, UsageError> {
    if let Some(flag) = request.flag {
        let id: TargetId = flag.parse()?;
        return Ok(Target::new(id, request.home));
    }

    if let Some(path) = request.invoking_path
        && let Some(id) = detector.detect(path, request.home)
    {
        return Ok(Target::new(id, request.home));
    }

    if !request.interactive {
        return Err(UsageError::TargetRequired);
    }

    let labels: Vec<String> = TargetId::ALL
        .iter()
        .map(|id| format!("{} ({})", id.display_name(), id.name()))
        .collect();
    let options: Vec<&str> = labels.iter().map(String::as_str).collect();
    let index = prompt
        .select("Select a target:", &options, 0)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidInput {
                UsageError::InvalidSelection(e.to_string())
            } else {
                UsageError::Prompt(e)
            }
        })?;
    let id = TargetId::ALL
        .get(index)
        .copied()
        .ok_or_else(|| UsageError::InvalidSelection(index.to_string()))?;
    Ok(Target::new(id, request.home))
}
