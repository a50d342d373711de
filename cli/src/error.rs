//! Domain-specific error types for the installer.
//!
//! Internal modules return typed errors (e.g., [`UsageError`], [`MergeError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error types
//!
//! ```text
//! UsageError         invalid or missing target selection
//! FetchError         one artifact's content could not be written
//! MergeError         existing settings file is unusable
//! RestoreError       a manifest entry could not be restored
//! VerificationError  a required artifact is absent after install
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing target selection. Always raised before any mutation.
#[derive(Error, Debug)]
pub enum UsageError {
    /// The `--target` value is not a supported identifier.
    #[error("unknown target '{0}': must be one of claude, codex, gemini")]
    UnknownTarget(String),

    /// No target was given and none could be detected or prompted for.
    #[error("no target selected; pass --target <claude|codex|gemini>")]
    TargetRequired,

    /// The interactive selection was not a valid choice.
    #[error("invalid selection '{0}'")]
    InvalidSelection(String),

    /// Reading the interactive answer failed.
    #[error("failed to read selection: {0}")]
    Prompt(#[source] std::io::Error),

    /// The home directory could not be determined.
    #[error("cannot determine home directory: set HOME")]
    NoHome,
}

/// A single artifact's content could not be produced at its destination.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The artifact source does not exist in the distribution.
    #[error("source not found: {}", path.display())]
    SourceMissing {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// A local filesystem operation failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// Short description of the failed operation.
        action: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A remote transfer failed.
    #[error("download {url} failed: {reason}")]
    Download {
        /// URL that was requested.
        url: String,
        /// Transport or status error description.
        reason: String,
    },
}

/// The settings file could not be merged.
#[derive(Error, Debug)]
pub enum MergeError {
    /// The existing file could not be read.
    #[error("read settings {}: {source}", path.display())]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The existing file is not valid JSON.
    #[error("settings {} is not valid JSON: {source}", path.display())]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },

    /// The existing file is valid JSON but its root is not an object.
    #[error("settings {} must contain a JSON object at the top level", path.display())]
    NotAnObject {
        /// Settings file path.
        path: PathBuf,
    },

    /// Writing the merged file failed.
    #[error("write settings {}: {source}", path.display())]
    Write {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A manifest entry could not be restored.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// The captured payload is gone from the backup store.
    #[error("backup payload for '{id}' is missing: {}", payload.display())]
    PayloadMissing {
        /// Artifact identifier.
        id: String,
        /// Expected payload location.
        payload: PathBuf,
    },

    /// The manifest names an artifact the catalog does not know.
    #[error("backup '{0}' does not belong to any known artifact")]
    UnknownArtifact(String),

    /// Copying the payload back failed.
    #[error("restore '{id}' to {}: {reason}", destination.display())]
    Copy {
        /// Artifact identifier.
        id: String,
        /// Destination that was being restored.
        destination: PathBuf,
        /// Error description.
        reason: String,
    },
}

/// A required artifact is absent after install completed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{id}' missing at {}", path.display())]
pub struct VerificationError {
    /// Artifact identifier.
    pub id: String,
    /// Destination that should exist.
    pub path: PathBuf,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unknown_target_display() {
        let e = UsageError::UnknownTarget("cursor".to_string());
        assert_eq!(
            e.to_string(),
            "unknown target 'cursor': must be one of claude, codex, gemini"
        );
    }

    #[test]
    fn prompt_error_has_source() {
        use std::error::Error as StdError;
        let e = UsageError::Prompt(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(e.source().is_some());
    }

    #[test]
    fn fetch_io_display_includes_path() {
        let e = FetchError::Io {
            action: "copy",
            path: PathBuf::from("/profile/.claude/CLAUDE.md"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("copy /profile/.claude/CLAUDE.md"), "{msg}");
        assert!(msg.contains("denied"));
    }

    #[test]
    fn download_display() {
        let e = FetchError::Download {
            url: "https://example.invalid/a".to_string(),
            reason: "status 404".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "download https://example.invalid/a failed: status 404"
        );
    }

    #[test]
    fn merge_not_an_object_display() {
        let e = MergeError::NotAnObject {
            path: PathBuf::from("settings.json"),
        };
        assert!(e.to_string().contains("JSON object"));
    }

    #[test]
    fn restore_payload_missing_display() {
        let e = RestoreError::PayloadMissing {
            id: "persona".to_string(),
            payload: PathBuf::from("/b/payload/persona"),
        };
        assert!(e.to_string().contains("'persona'"));
        assert!(e.to_string().contains("/b/payload/persona"));
    }

    #[test]
    fn verification_display() {
        let e = VerificationError {
            id: "skills/run_skill.py".to_string(),
            path: PathBuf::from("/p/skills/run_skill.py"),
        };
        assert_eq!(
            e.to_string(),
            "'skills/run_skill.py' missing at /p/skills/run_skill.py"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<UsageError>();
        assert_send_sync::<FetchError>();
        assert_send_sync::<MergeError>();
        assert_send_sync::<RestoreError>();
        assert_send_sync::<VerificationError>();
    }

    #[test]
    fn merge_error_converts_to_anyhow() {
        let e = MergeError::NotAnObject {
            path: PathBuf::from("x"),
        };
        let anyhow_err: anyhow::Error = e.into();
        assert!(anyhow_err.downcast_ref::<MergeError>().is_some());
    }
}
