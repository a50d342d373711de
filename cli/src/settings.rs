//! Non-destructive merge of owned keys into a JSON settings file.
use std::io;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::resources::fs::write_atomic;
use crate::target::Target;

/// What [`merge_keys`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The file did not exist and was written.
    Created,
    /// At least one owned key was added or changed.
    Updated,
    /// Every owned key already had the wanted value; nothing was written.
    Unchanged,
}

/// Set `keys` in the JSON object stored at `path`, keeping every other key.
///
/// A missing file is created holding `keys` for targets with the style
/// capability and `{}` otherwise. Key order of the existing file is kept and
/// new keys are appended.
///
/// # Errors
///
/// Returns [`MergeError`] if the existing file cannot be read, is not valid
/// JSON, does not hold an object, or the result cannot be written. The file
/// is left untouched in every error case.
pub fn merge_keys(
    target: &Target,
    path: &Path,
    keys: &Map<String, Value>,
) -> Result<MergeOutcome, MergeError> {
    let owned = if target.capabilities.style {
        keys.clone()
    } else {
        Map::new()
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            write_object(path, &owned)?;
            return Ok(MergeOutcome::Created);
        }
        Err(source) => {
            return Err(MergeError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let value: Value = serde_json::from_str(&text).map_err(|source| MergeError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(mut object) = value else {
        return Err(MergeError::NotAnObject {
            path: path.to_path_buf(),
        });
    };

    let mut changed = false;
    for (key, wanted) in owned {
        if object.get(&key) != Some(&wanted) {
            object.insert(key, wanted);
            changed = true;
        }
    }
    if !changed {
        return Ok(MergeOutcome::Unchanged);
    }

    write_object(path, &object)?;
    Ok(MergeOutcome::Updated)
}

fn write_object(path: &Path, object: &Map<String, Value>) -> Result<(), MergeError> {
    let write_failed = |source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut body = serde_json::to_string_pretty(object)
        .map_err(io::Error::from)
        .map_err(write_failed)?;
    body.push('\n');
    write_atomic(path, body.as_bytes()).map_err(write_failed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::target::TargetId;
    use serde_json::json;

    fn keys() -> Map<String, Value> {
        let mut keys = Map::new();
        keys.insert("outputStyle".into(), json!("sage"));
        keys
    }

    fn setup(id: TargetId) -> (tempfile::TempDir, Target) {
        let home = tempfile::tempdir().unwrap();
        let target = Target::new(id, home.path());
        std::fs::create_dir_all(&target.base_dir).unwrap();
        (home, target)
    }

    #[test]
    fn missing_file_is_created_with_keys() {
        let (_home, target) = setup(TargetId::Claude);
        let path = target.base_dir.join("settings.json");
        assert_eq!(merge_keys(&target, &path, &keys()).unwrap(), MergeOutcome::Created);
        insta::assert_snapshot!(std::fs::read_to_string(&path).unwrap(), @r#"
        {
          "outputStyle": "sage"
        }
        "#);
    }

    #[test]
    fn missing_file_without_style_capability_is_empty_object() {
        let (_home, target) = setup(TargetId::Gemini);
        let path = target.base_dir.join("settings.json");
        merge_keys(&target, &path, &keys()).unwrap();
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn existing_keys_are_preserved_in_order() {
        let (_home, target) = setup(TargetId::Claude);
        let path = target.base_dir.join("settings.json");
        std::fs::write(&path, r#"{"theme":"dark","model":"x","outputStyle":"plain"}"#).unwrap();

        assert_eq!(merge_keys(&target, &path, &keys()).unwrap(), MergeOutcome::Updated);

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let order: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(order, ["theme", "model", "outputStyle"]);
        assert_eq!(value["theme"], json!("dark"));
        assert_eq!(value["outputStyle"], json!("sage"));
    }

    #[test]
    fn merge_is_idempotent() {
        let (_home, target) = setup(TargetId::Claude);
        let path = target.base_dir.join("settings.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        merge_keys(&target, &path, &keys()).unwrap();
        let first = std::fs::read(&path).unwrap();
        assert_eq!(merge_keys(&target, &path, &keys()).unwrap(), MergeOutcome::Unchanged);
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn invalid_json_is_error_and_file_untouched() {
        let (_home, target) = setup(TargetId::Claude);
        let path = target.base_dir.join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = merge_keys(&target, &path, &keys()).unwrap_err();
        assert!(matches!(err, MergeError::Parse { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn non_object_root_is_error() {
        let (_home, target) = setup(TargetId::Claude);
        let path = target.base_dir.join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = merge_keys(&target, &path, &keys()).unwrap_err();
        assert!(matches!(err, MergeError::NotAnObject { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[test]
    fn existing_file_without_style_capability_is_unchanged() {
        let (_home, target) = setup(TargetId::Gemini);
        let path = target.base_dir.join("settings.json");
        std::fs::write(&path, r#"{"a":1}"#).unwrap();
        assert_eq!(merge_keys(&target, &path, &keys()).unwrap(), MergeOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":1}"#);
    }
}
