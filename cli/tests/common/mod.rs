// Shared helpers for integration tests.
//
// Provides a temporary distribution directory holding every artifact the
// catalog names, and a temporary home directory standing in for the user's
// profile, so each integration test runs in isolation.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sage_installer::catalog::{DISPATCHER, SKILL_MODULES, SKILLS};
use sage_installer::commands::install::{InstallReport, Installer};
use sage_installer::commands::uninstall::{UninstallReport, Uninstaller};
use sage_installer::logging::Logger;
use sage_installer::platform::ImmediateDelete;
use sage_installer::prompt::LinePrompt;
use sage_installer::source::LocalSource;
use sage_installer::target::{Target, TargetId};

/// Write a complete distribution into `root`.
///
/// Creates:
/// - `persona/{CLAUDE,AGENTS,GEMINI}.md`
/// - `skills/run_skill.py` and the skill modules it loads
/// - `skills/<name>/...` for every catalog skill
/// - `output-styles/sage.md`
/// - `bin/sage` (stands in for the installer executable)
pub fn setup_distribution(root: &Path) {
    for id in TargetId::ALL {
        write(
            &root.join("persona").join(id.persona_file()),
            &format!("# Sage for {}\n", id.display_name()),
        );
    }
    write(&root.join(DISPATCHER), "print('dispatch')\n");
    for module in SKILL_MODULES {
        write(&root.join(module), &format!("# {module}\n"));
    }
    for (name, files) in SKILLS {
        for file in *files {
            write(
                &root.join("skills").join(name).join(file),
                &format!("{name}/{file}\n"),
            );
        }
    }
    write(&root.join("output-styles/sage.md"), "terse, precise\n");
    write(&root.join("bin/sage"), "#!/bin/sh\n");
}

/// Write `content` to `path`, creating parent directories.
pub fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().expect("path has parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
}

/// Every file under `root`, keyed by relative path with `/` separators.
pub fn tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(root, root, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("under root")
                .to_string_lossy()
                .replace('\\', "/");
            files.insert(rel, std::fs::read(&path).expect("read file"));
        }
    }
}

/// An isolated distribution and profile backed by [`tempfile::TempDir`]s.
pub struct IntegrationTestContext {
    /// Temporary distribution directory.
    pub dist: tempfile::TempDir,
    /// Temporary home directory.
    pub home: tempfile::TempDir,
    /// Logger shared by every run in this context.
    pub log: Logger,
}

impl IntegrationTestContext {
    /// Create a new context with a complete distribution and an empty home.
    pub fn new() -> Self {
        let dist = tempfile::tempdir().expect("create dist dir");
        setup_distribution(dist.path());
        Self {
            dist,
            home: tempfile::tempdir().expect("create home dir"),
            log: Logger::new("integration"),
        }
    }

    /// Home directory path.
    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Resolved target rooted at this context's home.
    pub fn target(&self, id: TargetId) -> Target {
        Target::new(id, self.home.path())
    }

    /// The stand-in installer executable.
    pub fn executable(&self) -> PathBuf {
        self.dist.path().join("bin/sage")
    }

    /// Install into `id` from the local distribution.
    pub fn install(&self, id: TargetId) -> InstallReport {
        let target = self.target(id);
        let source = LocalSource::new(self.dist.path().to_path_buf());
        let exe = self.executable();
        Installer::new(&target, &source, &exe, &self.log)
            .install()
            .expect("install runs")
    }

    /// Uninstall `id` without prompting.
    pub fn uninstall(&self, id: TargetId) -> UninstallReport {
        self.uninstall_answering(id, None)
    }

    /// Uninstall `id`, answering the confirmation with `answer` when given.
    pub fn uninstall_answering(&self, id: TargetId, answer: Option<&str>) -> UninstallReport {
        let target = self.target(id);
        let mut prompt = LinePrompt::new(
            std::io::Cursor::new(answer.unwrap_or_default().as_bytes().to_vec()),
            Vec::new(),
        );
        Uninstaller::new(&target, &ImmediateDelete, &self.log)
            .assume_yes(answer.is_none())
            .uninstall(&mut prompt)
            .expect("uninstall runs")
    }

    /// Snapshot of every file in the home directory.
    pub fn home_tree(&self) -> BTreeMap<String, Vec<u8>> {
        tree(self.home.path())
    }
}
