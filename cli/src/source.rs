//! Artifact content providers.
//!
//! A [`Source`] produces the bytes for one catalog artifact at a time, either
//! by copying from a local distribution directory ([`LocalSource`]) or by
//! downloading from a base URL ([`RemoteSource`]).
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::FetchError;
use crate::resources::fs::{copy_dir_recursive, ensure_parent_dir};

/// Environment variable naming the distribution root.
pub const SOURCE_ENV: &str = "SAGE_SOURCE";

/// Directory every distribution root contains.
const MARKER_DIR: &str = "persona";

/// Produces artifact content at a destination path.
#[cfg_attr(test, mockall::automock)]
pub trait Source: std::fmt::Debug {
    /// Short human-readable origin, for log lines.
    fn describe(&self) -> String;

    /// Write the file at `rel` (relative to the distribution root) to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the file is missing, cannot be downloaded,
    /// or cannot be written.
    fn fetch_file(&self, rel: &str, dest: &Path) -> Result<(), FetchError>;

    /// Write the directory at `rel` to `dest`. `files` lists the tree's
    /// contents for sources that cannot enumerate directories.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if any file of the tree cannot be produced.
    fn fetch_tree(&self, rel: &str, files: &[&'static str], dest: &Path) -> Result<(), FetchError>;

    /// Read a small file that may legitimately be absent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for failures other than absence.
    fn read_optional(&self, rel: &str) -> Result<Option<Vec<u8>>, FetchError>;
}

/// Copies artifacts out of a distribution directory on disk.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Create a source rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The distribution root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn existing(&self, rel: &str) -> Result<PathBuf, FetchError> {
        let path = self.root.join(rel);
        if path.exists() {
            Ok(path)
        } else {
            Err(FetchError::SourceMissing { path })
        }
    }
}

impl Source for LocalSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn fetch_file(&self, rel: &str, dest: &Path) -> Result<(), FetchError> {
        let src = self.existing(rel)?;
        ensure_parent_dir(dest).map_err(|source| FetchError::Io {
            action: "create parent of",
            path: dest.to_path_buf(),
            source,
        })?;
        std::fs::copy(&src, dest)
            .map(|_| ())
            .map_err(|source| FetchError::Io {
                action: "copy to",
                path: dest.to_path_buf(),
                source,
            })
    }

    fn fetch_tree(
        &self,
        rel: &str,
        _files: &[&'static str],
        dest: &Path,
    ) -> Result<(), FetchError> {
        let src = self.existing(rel)?;
        copy_dir_recursive(&src, dest).map_err(|e| FetchError::Io {
            action: "copy tree to",
            path: dest.to_path_buf(),
            source: io::Error::other(format!("{e:#}")),
        })
    }

    fn read_optional(&self, rel: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let path = self.root.join(rel);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FetchError::Io {
                action: "read",
                path,
                source,
            }),
        }
    }
}

/// Downloads artifacts from `<base_url>/<relative path>`, one request per
/// file, sequentially.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
}

impl RemoteSource {
    /// Create a source for `base_url`; a trailing slash is ignored.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of `rel`.
    #[must_use]
    pub fn url(&self, rel: &str) -> String {
        format!("{}/{}", self.base_url, rel.trim_start_matches('/'))
    }

    fn download(&self, rel: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let url = self.url(rel);
        tracing::debug!("GET {url}");
        let mut response = match ureq::get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(e) => {
                return Err(FetchError::Download {
                    url,
                    reason: e.to_string(),
                });
            }
        };
        response
            .body_mut()
            .read_to_vec()
            .map(Some)
            .map_err(|e| FetchError::Download {
                url,
                reason: e.to_string(),
            })
    }

    fn download_to(&self, rel: &str, dest: &Path) -> Result<(), FetchError> {
        let bytes = self.download(rel)?.ok_or_else(|| FetchError::Download {
            url: self.url(rel),
            reason: "status 404".to_string(),
        })?;
        ensure_parent_dir(dest)
            .and_then(|()| std::fs::write(dest, bytes))
            .map_err(|source| FetchError::Io {
                action: "write",
                path: dest.to_path_buf(),
                source,
            })
    }
}

impl Source for RemoteSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn fetch_file(&self, rel: &str, dest: &Path) -> Result<(), FetchError> {
        self.download_to(rel, dest)
    }

    fn fetch_tree(&self, rel: &str, files: &[&'static str], dest: &Path) -> Result<(), FetchError> {
        for file in files {
            self.download_to(&format!("{rel}/{file}"), &dest.join(file))?;
        }
        Ok(())
    }

    fn read_optional(&self, rel: &str) -> Result<Option<Vec<u8>>, FetchError> {
        self.download(rel)
    }
}

/// Locate the local distribution root.
///
/// # Errors
///
/// Returns an error if no candidate directory contains a distribution.
pub fn resolve_root(flag: Option<&Path>) -> Result<PathBuf> {
    resolve_root_from(
        flag,
        std::env::var_os(SOURCE_ENV),
        std::env::current_exe().ok(),
        std::env::current_dir().ok(),
    )
}

/// Locate the distribution root from explicit inputs.
///
/// Order: `--source`, then `SAGE_SOURCE`, then the executable's directory and
/// its ancestors up to `target/<profile>/..`, then the working directory.
///
/// # Errors
///
/// Returns an error if no candidate directory contains a distribution.
pub fn resolve_root_from(
    flag: Option<&Path>,
    env: Option<OsString>,
    exe: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(root) = flag {
        return Ok(root.to_path_buf());
    }

    if let Some(root) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    if let Some(exe) = exe
        && let Some(parent) = exe.parent()
    {
        // bin/ → root, target/release/ → workspace root
        let candidates = [parent.to_path_buf(), parent.join(".."), parent.join("../..")];
        for candidate in &candidates {
            if is_distribution(candidate) {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    if let Some(cwd) = cwd
        && is_distribution(&cwd)
    {
        return Ok(cwd);
    }

    anyhow::bail!("cannot determine distribution root. Use --source or set {SOURCE_ENV}");
}

fn is_distribution(dir: &Path) -> bool {
    dir.join(MARKER_DIR).is_dir()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn distribution() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("persona")).unwrap();
        std::fs::write(dir.path().join("persona/CLAUDE.md"), "# Sage").unwrap();
        std::fs::create_dir_all(dir.path().join("skills/gen-docs/scripts")).unwrap();
        std::fs::write(dir.path().join("skills/gen-docs/SKILL.md"), "docs").unwrap();
        std::fs::write(
            dir.path().join("skills/gen-docs/scripts/doc_generator.py"),
            "pass",
        )
        .unwrap();
        dir
    }

    #[test]
    fn local_fetch_file_copies_and_creates_parents() {
        let dist = distribution();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("a/b/CLAUDE.md");
        LocalSource::new(dist.path().to_path_buf())
            .fetch_file("persona/CLAUDE.md", &dest)
            .unwrap();
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "# Sage");
    }

    #[test]
    fn local_fetch_missing_is_source_missing() {
        let dist = distribution();
        let out = tempfile::tempdir().unwrap();
        let err = LocalSource::new(dist.path().to_path_buf())
            .fetch_file("persona/AGENTS.md", &out.path().join("AGENTS.md"))
            .unwrap_err();
        assert!(matches!(err, FetchError::SourceMissing { .. }));
        assert!(!out.path().join("AGENTS.md").exists());
    }

    #[test]
    fn local_fetch_tree_copies_directory() {
        let dist = distribution();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("gen-docs");
        LocalSource::new(dist.path().to_path_buf())
            .fetch_tree("skills/gen-docs", &[], &dest)
            .unwrap();
        assert!(dest.join("scripts/doc_generator.py").is_file());
    }

    #[test]
    fn local_read_optional_absent_is_none() {
        let dist = distribution();
        let source = LocalSource::new(dist.path().to_path_buf());
        assert!(source.read_optional("conf/install.toml").unwrap().is_none());
        assert_eq!(
            source.read_optional("persona/CLAUDE.md").unwrap().as_deref(),
            Some(&b"# Sage"[..])
        );
    }

    #[test]
    fn remote_url_joins_without_double_slash() {
        let source = RemoteSource::new("https://example.invalid/sage/");
        assert_eq!(
            source.url("skills/run_skill.py"),
            "https://example.invalid/sage/skills/run_skill.py"
        );
        assert_eq!(source.describe(), "https://example.invalid/sage");
    }

    #[test]
    fn resolve_root_prefers_flag() {
        let root = resolve_root_from(
            Some(Path::new("/explicit")),
            Some("/env".into()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/explicit"));
    }

    #[test]
    fn resolve_root_uses_env_before_exe() {
        let dist = distribution();
        let root = resolve_root_from(
            None,
            Some("/from/env".into()),
            Some(dist.path().join("bin/sage")),
            None,
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/from/env"));
    }

    #[test]
    fn resolve_root_finds_distribution_above_executable() {
        let dist = distribution();
        let exe = dist.path().join("target/release/sage");
        std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
        let root = resolve_root_from(None, None, Some(exe), None).unwrap();
        assert_eq!(root, dunce::canonicalize(dist.path()).unwrap());
    }

    #[test]
    fn resolve_root_falls_back_to_cwd() {
        let dist = distribution();
        let root =
            resolve_root_from(None, Some(OsString::new()), None, Some(dist.path().into()))
                .unwrap();
        assert_eq!(root, dist.path());
    }

    #[test]
    fn resolve_root_error_when_nothing_matches() {
        let empty = tempfile::tempdir().unwrap();
        let err = resolve_root_from(None, None, None, Some(empty.path().into())).unwrap_err();
        assert!(err.to_string().contains("cannot determine distribution root"));
    }

    #[test]
    fn mock_source_records_calls() {
        let mut mock = MockSource::new();
        mock.expect_read_optional()
            .withf(|rel| rel == "conf/install.toml")
            .times(1)
            .returning(|_| Ok(None));
        assert!(mock.read_optional("conf/install.toml").unwrap().is_none());
    }
}
