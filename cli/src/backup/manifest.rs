//! On-disk manifest of captured backups and the ledger of installed ids.
//!
//! Both files are plain text. `manifest` holds one `<id>\t<rfc3339>` record
//! per line in capture order; `installed` holds one artifact id per line.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::resources::fs::write_atomic;

/// File name of the manifest inside the backup store.
pub const MANIFEST_FILE: &str = "manifest";

/// File name of the installed ledger inside the backup store.
pub const INSTALLED_FILE: &str = "installed";

/// Directory holding captured payloads inside the backup store.
pub const PAYLOAD_DIR: &str = "payload";

/// One captured pre-install destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Artifact identifier.
    pub id: String,
    /// Payload location relative to the backup store root.
    pub payload: PathBuf,
    /// When the capture happened.
    pub captured_at: DateTime<Utc>,
}

impl ManifestEntry {
    /// Build an entry for `id` captured at `captured_at`.
    #[must_use]
    pub fn new(id: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            payload: payload_path(id),
            captured_at,
        }
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}",
            self.id,
            self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    fn parse_line(line: &str) -> Result<Self> {
        let (id, stamp) = line
            .split_once('\t')
            .with_context(|| format!("malformed manifest record: {line:?}"))?;
        let captured_at = DateTime::parse_from_rfc3339(stamp.trim())
            .with_context(|| format!("bad timestamp for '{id}'"))?
            .with_timezone(&Utc);
        Ok(Self::new(id, captured_at))
    }
}

/// Payload path for `id`, relative to the store root. Path separators in ids
/// are flattened so every payload sits directly under `payload/`.
#[must_use]
pub fn payload_path(id: &str) -> PathBuf {
    Path::new(PAYLOAD_DIR).join(id.replace('/', "__"))
}

/// In-memory form of the store's `manifest` and `installed` files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    installed: Vec<String>,
}

impl Manifest {
    /// Read both files from `root`. Missing files are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let entries = read_lines(&root.join(MANIFEST_FILE))?
            .iter()
            .map(|line| ManifestEntry::parse_line(line))
            .collect::<Result<Vec<_>>>()?;
        let installed = read_lines(&root.join(INSTALLED_FILE))?;
        Ok(Self { entries, installed })
    }

    /// Write both files under `root`, each replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn persist(&self, root: &Path) -> Result<()> {
        let manifest: String = self
            .entries
            .iter()
            .map(|e| e.to_line() + "\n")
            .collect();
        let installed: String = self.installed.iter().map(|id| format!("{id}\n")).collect();
        for (name, body) in [(MANIFEST_FILE, manifest), (INSTALLED_FILE, installed)] {
            let path = root.join(name);
            write_atomic(&path, body.as_bytes())
                .with_context(|| format!("write {}", path.display()))?;
        }
        Ok(())
    }

    /// Entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Entry for `id`, if one was captured.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Append an entry. An existing entry for the same id is kept.
    pub fn push(&mut self, entry: ManifestEntry) -> bool {
        if self.entry(&entry.id).is_some() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Drop the entry for `id`.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
    }

    /// Whether the destination of `id` holds content written by `install`.
    #[must_use]
    pub fn is_installed(&self, id: &str) -> bool {
        self.installed.iter().any(|i| i == id)
    }

    /// Record that `id` now holds installed content.
    pub fn mark_installed(&mut self, id: &str) {
        if !self.is_installed(id) {
            self.installed.push(id.to_string());
        }
    }

    /// Forget that `id` holds installed content.
    pub fn forget_installed(&mut self, id: &str) {
        self.installed.retain(|i| i != id);
    }

    /// Installed ids in the order they were first recorded.
    #[must_use]
    pub fn installed(&self) -> &[String] {
        &self.installed
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}
