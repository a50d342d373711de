//! Host platform detection and platform-specific deletion of in-use files.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::error::UsageError;

/// File name of the installer executable.
pub const EXECUTABLE_NAME: &str = if cfg!(windows) { "sage.exe" } else { "sage" };

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux and other Unix-likes.
    Unix,
    /// Microsoft Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current run.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// The user's home/profile directory; every target base dir lives here.
    pub home: PathBuf,
}

impl Platform {
    /// Detect the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::NoHome`] when neither `HOME` nor (on Windows)
    /// `USERPROFILE` is set.
    pub fn detect() -> Result<Self, UsageError> {
        let os = if cfg!(windows) { Os::Windows } else { Os::Unix };
        let home = std::env::var_os("HOME")
            .filter(|v| !v.is_empty())
            .or_else(|| {
                if os == Os::Windows {
                    std::env::var_os("USERPROFILE").filter(|v| !v.is_empty())
                } else {
                    None
                }
            })
            .map(PathBuf::from)
            .ok_or(UsageError::NoHome)?;
        Ok(Self { os, home })
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(os: Os, home: PathBuf) -> Self {
        Self { os, home }
    }

    /// Pick the deletion strategy for the self-deletable entry point.
    #[must_use]
    pub fn deferred_delete(&self) -> Box<dyn DeferredDelete> {
        match self.os {
            Os::Unix => Box::new(ImmediateDelete),
            Os::Windows => Box::new(DetachedDelete),
        }
    }
}

/// Deletes a file that may be the currently running executable.
pub trait DeferredDelete: fmt::Debug {
    /// Delete `path` now or arrange for it to be deleted after this process
    /// exits. `stop_at` bounds the removal of parent directories left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion could not be performed or scheduled.
    fn schedule(&self, path: &Path, stop_at: &Path) -> Result<Deletion>;
}

/// What [`DeferredDelete::schedule`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The file is gone.
    Done,
    /// A helper process will delete it once this process has exited.
    Scheduled,
}

/// Unlinks immediately; Unix allows removing an executable that is running.
#[derive(Debug)]
pub struct ImmediateDelete;

impl DeferredDelete for ImmediateDelete {
    fn schedule(&self, path: &Path, stop_at: &Path) -> Result<Deletion> {
        crate::resources::fs::remove_path(path)?;
        if let Some(parent) = path.parent() {
            crate::resources::fs::remove_empty_dirs(parent, stop_at);
        }
        Ok(Deletion::Done)
    }
}

/// Spawns a detached `cmd` that waits for this process to exit and then
/// deletes the file and its directory; Windows locks running executables.
#[derive(Debug)]
pub struct DetachedDelete;

impl DeferredDelete for DetachedDelete {
    fn schedule(&self, path: &Path, stop_at: &Path) -> Result<Deletion> {
        if !is_current_exe(path) {
            return ImmediateDelete.schedule(path, stop_at);
        }
        let parent = path.parent().unwrap_or(stop_at);
        let script = format!(
            "ping 127.0.0.1 -n 3 > nul & del /f /q \"{}\" & rmdir \"{}\"",
            path.display(),
            parent.display()
        );
        std::process::Command::new("cmd")
            .args(["/C", &script])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .with_context(|| format!("scheduling removal of {}", path.display()))?;
        Ok(Deletion::Scheduled)
    }
}

/// Return `true` if `path` refers to the running executable.
#[must_use]
pub fn is_current_exe(path: &Path) -> bool {
    let Ok(exe) = std::env::current_exe() else {
        return false;
    };
    match (dunce::canonicalize(exe), dunce::canonicalize(path)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
