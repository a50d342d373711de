//! Static table of the artifacts managed for each target.
//!
//! The catalog is the single source of truth for what `install` writes,
//! what `uninstall` removes, and what verification expects.
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::platform::EXECUTABLE_NAME;
use crate::target::Target;

/// Value written to the `outputStyle` settings key unless configured.
pub const DEFAULT_OUTPUT_STYLE: &str = "sage";

/// Skill directories deployed under `<base>/skills/`, with the files each
/// one contains in the distribution.
pub const SKILLS: &[(&str, &[&str])] = &[
    ("verify-security", &["SKILL.md", "scripts/security_scanner.py"]),
    ("verify-module", &["SKILL.md", "scripts/module_scanner.py"]),
    ("verify-change", &["SKILL.md", "scripts/change_analyzer.py"]),
    ("verify-quality", &["SKILL.md", "scripts/quality_checker.py"]),
    ("gen-docs", &["SKILL.md", "scripts/doc_generator.py"]),
];

/// Relative path of the shared skill dispatcher in the distribution and
/// under the target base dir.
pub const DISPATCHER: &str = "skills/run_skill.py";

/// Skill modules the dispatcher loads from its own directory, one per entry
/// in [`SKILLS`].
pub const SKILL_MODULES: &[&str] = &[
    "skills/verify_security.py",
    "skills/verify_module.py",
    "skills/verify_change.py",
    "skills/verify_quality.py",
    "skills/gen_docs.py",
];

/// How an artifact's destination content is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Destination is replaced wholesale.
    Replace,
    /// Only the listed top-level JSON keys are set; all others are kept.
    JsonKeyMerge,
}

/// What an artifact is and where its content comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactKind {
    /// A single file copied from `source` in the distribution.
    File {
        /// Path relative to the distribution root.
        source: String,
    },
    /// A directory tree copied from `source` in the distribution.
    Tree {
        /// Path relative to the distribution root.
        source: String,
        /// Files inside the tree, relative to it (used by remote fetches).
        files: &'static [&'static str],
    },
    /// A JSON settings file patched with `keys`.
    Settings {
        /// Keys owned by this tool.
        keys: Map<String, Value>,
    },
    /// A copy of the running installer executable.
    Executable,
}

/// One managed file or directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Stable identifier, also used to key backups.
    pub id: String,
    /// Content description.
    pub kind: ArtifactKind,
    /// Absolute destination path for the target.
    pub destination: PathBuf,
    /// Deleted by the uninstaller's final cleanup step rather than during
    /// removal, because it may be the running uninstaller itself.
    pub self_deletable: bool,
}

impl Artifact {
    /// Merge strategy implied by the artifact kind.
    #[must_use]
    pub fn strategy(&self) -> MergeStrategy {
        match self.kind {
            ArtifactKind::Settings { .. } => MergeStrategy::JsonKeyMerge,
            _ => MergeStrategy::Replace,
        }
    }

    fn new(id: impl Into<String>, kind: ArtifactKind, destination: PathBuf) -> Self {
        Self {
            id: id.into(),
            kind,
            destination,
            self_deletable: false,
        }
    }
}

/// Artifacts for `target`, in install order, with the default style name.
#[must_use]
pub fn for_target(target: &Target) -> Vec<Artifact> {
    for_target_with_style(target, DEFAULT_OUTPUT_STYLE)
}

/// Artifacts for `target`, in install order.
///
/// Style artifacts are only listed for targets with the style capability, so
/// nothing downstream can create a style directory for the others. The
/// uninstaller entry point is always last.
#[must_use]
pub fn for_target_with_style(target: &Target, style_name: &str) -> Vec<Artifact> {
    let base = &target.base_dir;
    let persona = target.id.persona_file();
    let mut artifacts = vec![
        Artifact::new(
            "persona",
            ArtifactKind::File {
                source: format!("persona/{persona}"),
            },
            base.join(persona),
        ),
        Artifact::new(
            DISPATCHER,
            ArtifactKind::File {
                source: DISPATCHER.to_string(),
            },
            base.join(DISPATCHER),
        ),
    ];

    artifacts.extend(SKILL_MODULES.iter().map(|&rel| {
        Artifact::new(
            rel,
            ArtifactKind::File {
                source: rel.to_string(),
            },
            base.join(rel),
        )
    }));

    artifacts.extend(SKILLS.iter().map(|&(name, files)| {
        let rel = format!("skills/{name}");
        Artifact::new(
            rel.clone(),
            ArtifactKind::Tree {
                source: rel.clone(),
                files,
            },
            base.join(rel),
        )
    }));

    if target.capabilities.style {
        artifacts.push(Artifact::new(
            "output-style",
            ArtifactKind::File {
                source: "output-styles/sage.md".to_string(),
            },
            base.join("output-styles").join("sage.md"),
        ));
    }

    if target.capabilities.settings {
        let mut keys = Map::new();
        if target.capabilities.style {
            keys.insert(
                "outputStyle".to_string(),
                Value::String(style_name.to_string()),
            );
        }
        artifacts.push(Artifact::new(
            "settings",
            ArtifactKind::Settings { keys },
            base.join("settings.json"),
        ));
    }

    artifacts.push(Artifact {
        self_deletable: true,
        ..Artifact::new(
            "uninstaller",
            ArtifactKind::Executable,
            base.join(".sage").join(EXECUTABLE_NAME),
        )
    });

    artifacts
}

/// Find an artifact by identifier.
#[must_use]
pub fn find<'a>(artifacts: &'a [Artifact], id: &str) -> Option<&'a Artifact> {
    artifacts.iter().find(|a| a.id == id)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::target::TargetId;
    use std::collections::HashSet;
    use std::path::Path;

    fn target(id: TargetId) -> Target {
        Target::new(id, Path::new("/home/u"))
    }

    #[test]
    fn claude_includes_style_and_settings_key() {
        let artifacts = for_target(&target(TargetId::Claude));
        let style = find(&artifacts, "output-style").expect("style artifact");
        assert_eq!(
            style.destination,
            PathBuf::from("/home/u/.claude/output-styles/sage.md")
        );
        let settings = find(&artifacts, "settings").expect("settings artifact");
        assert_eq!(settings.strategy(), MergeStrategy::JsonKeyMerge);
        let ArtifactKind::Settings { keys } = &settings.kind else {
            panic!("settings artifact has wrong kind");
        };
        assert_eq!(keys.get("outputStyle"), Some(&Value::from("sage")));
    }

    #[test]
    fn targets_without_style_have_no_style_artifacts() {
        for id in [TargetId::Codex, TargetId::Gemini] {
            let artifacts = for_target(&target(id));
            assert!(find(&artifacts, "output-style").is_none(), "{id}");
            assert!(
                artifacts
                    .iter()
                    .all(|a| !a.destination.to_string_lossy().contains("output-styles")),
                "{id}"
            );
        }
    }

    #[test]
    fn gemini_settings_has_no_keys() {
        let artifacts = for_target(&target(TargetId::Gemini));
        let settings = find(&artifacts, "settings").unwrap();
        assert!(matches!(&settings.kind, ArtifactKind::Settings { keys } if keys.is_empty()));
    }

    #[test]
    fn codex_has_no_settings_artifact() {
        let artifacts = for_target(&target(TargetId::Codex));
        assert!(find(&artifacts, "settings").is_none());
    }

    #[test]
    fn persona_filename_differs_per_target() {
        let names: HashSet<PathBuf> = TargetId::ALL
            .iter()
            .map(|id| find(&for_target(&target(*id)), "persona").unwrap().destination.clone())
            .collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn skills_are_identical_across_targets() {
        let skills = |id| -> Vec<ArtifactKind> {
            for_target(&target(id))
                .into_iter()
                .filter(|a| a.id.starts_with("skills/"))
                .map(|a| a.kind)
                .collect()
        };
        assert_eq!(skills(TargetId::Claude), skills(TargetId::Codex));
        assert_eq!(skills(TargetId::Codex), skills(TargetId::Gemini));
        assert_eq!(
            skills(TargetId::Claude).len(),
            1 + SKILL_MODULES.len() + SKILLS.len()
        );
    }

    #[test]
    fn dispatcher_modules_sit_next_to_dispatcher() {
        let t = target(TargetId::Gemini);
        let artifacts = for_target(&t);
        let dispatcher_dir = find(&artifacts, DISPATCHER)
            .unwrap()
            .destination
            .parent()
            .unwrap()
            .to_path_buf();
        assert_eq!(SKILL_MODULES.len(), SKILLS.len());
        for (module, (skill, _)) in SKILL_MODULES.iter().zip(SKILLS) {
            let artifact = find(&artifacts, module).expect("module artifact");
            assert_eq!(artifact.destination.parent().unwrap(), dispatcher_dir);
            let stem = artifact.destination.file_stem().unwrap().to_string_lossy();
            assert_eq!(stem.replace('_', "-"), *skill);
        }
    }

    #[test]
    fn every_destination_is_unique_and_inside_base() {
        for id in TargetId::ALL {
            let t = target(id);
            let artifacts = for_target(&t);
            let dests: HashSet<&PathBuf> = artifacts.iter().map(|a| &a.destination).collect();
            assert_eq!(dests.len(), artifacts.len());
            assert!(artifacts.iter().all(|a| a.destination.starts_with(&t.base_dir)));
        }
    }

    #[test]
    fn uninstaller_is_last_and_only_self_deletable() {
        let artifacts = for_target(&target(TargetId::Claude));
        let last = artifacts.last().unwrap();
        assert_eq!(last.id, "uninstaller");
        assert!(last.self_deletable);
        assert_eq!(artifacts.iter().filter(|a| a.self_deletable).count(), 1);
    }

    #[test]
    fn custom_style_name_is_used() {
        let artifacts = for_target_with_style(&target(TargetId::Claude), "Sage Pro");
        let ArtifactKind::Settings { keys } = &find(&artifacts, "settings").unwrap().kind else {
            panic!("settings artifact has wrong kind");
        };
        assert_eq!(keys["outputStyle"], Value::from("Sage Pro"));
    }
}
