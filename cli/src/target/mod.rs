//! Supported host targets and their resolved profile locations.
pub mod resolve;

pub use resolve::{DetectionStrategy, ExecutableLocation, Request, resolve};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::UsageError;

/// Name of the backup store directory inside a target base dir.
pub const BACKUP_DIR_NAME: &str = ".sage-backup";

/// Identifier of a supported host assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// Claude Code (`~/.claude`).
    Claude,
    /// OpenAI Codex CLI (`~/.codex`).
    Codex,
    /// Gemini CLI (`~/.gemini`).
    Gemini,
}

impl TargetId {
    /// All targets, in prompt order. The first one is the prompt default.
    pub const ALL: [Self; 3] = [Self::Claude, Self::Codex, Self::Gemini];

    /// Identifier used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
        }
    }

    /// Human-readable product name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Codex => "Codex CLI",
            Self::Gemini => "Gemini CLI",
        }
    }

    /// Directory under the home directory that the target reads.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Claude => ".claude",
            Self::Codex => ".codex",
            Self::Gemini => ".gemini",
        }
    }

    /// File name of the primary persona document.
    #[must_use]
    pub const fn persona_file(self) -> &'static str {
        match self {
            Self::Claude => "CLAUDE.md",
            Self::Codex => "AGENTS.md",
            Self::Gemini => "GEMINI.md",
        }
    }

    /// Features the target supports.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Claude => Capabilities {
                style: true,
                settings: true,
            },
            Self::Codex => Capabilities {
                style: false,
                settings: false,
            },
            Self::Gemini => Capabilities {
                style: false,
                settings: true,
            },
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetId {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UsageError::UnknownTarget(s.to_string()))
    }
}

/// Feature flags of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Supports output-style documents and the `outputStyle` settings key.
    pub style: bool,
    /// Reads a JSON `settings.json` from its base directory.
    pub settings: bool,
}

/// A resolved target: immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Which assistant this is.
    pub id: TargetId,
    /// Absolute base directory (e.g. `$HOME/.claude`).
    pub base_dir: PathBuf,
    /// Supported features.
    pub capabilities: Capabilities,
}

impl Target {
    /// Resolve `id` against the given home directory.
    #[must_use]
    pub fn new(id: TargetId, home: &Path) -> Self {
        Self {
            id,
            base_dir: home.join(id.dir_name()),
            capabilities: id.capabilities(),
        }
    }

    /// Location of the backup store for this target.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join(BACKUP_DIR_NAME)
    }
}
