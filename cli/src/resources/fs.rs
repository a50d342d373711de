//! File-system helpers shared by artifact deployment, backup, and removal.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Return `true` if anything (file, directory, or broken symlink) is at `path`.
#[must_use]
pub fn path_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Remove whatever is at `path`: a file, a symlink, or a directory tree.
///
/// Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_path(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("remove directory {}", path.display()))
    } else {
        std::fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
    }
}

/// Recursively copy a directory tree.
///
/// Symlinks within the source tree are followed, so the copy holds real
/// files and directories.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }
    Ok(())
}

/// Copy whatever is at `src` to `dst` exactly, creating parents.
///
/// Unlike [`copy_dir_recursive`], symlinks are not followed: a link (even a
/// dangling one) is recreated at `dst` pointing at the same target, at the
/// top level and anywhere inside a directory tree.
///
/// # Errors
///
/// Returns an error if any part of the copy fails.
pub fn copy_path(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst).with_context(|| format!("create parent of {}", dst.display()))?;
    let meta = src
        .symlink_metadata()
        .with_context(|| format!("inspecting {}", src.display()))?;
    if meta.file_type().is_symlink() {
        let link = std::fs::read_link(src)
            .with_context(|| format!("reading link {}", src.display()))?;
        create_symlink(&link, dst, src.is_dir())
            .with_context(|| format!("linking {} to {}", dst.display(), link.display()))
    } else if meta.is_dir() {
        std::fs::create_dir_all(dst)
            .with_context(|| format!("creating directory {}", dst.display()))?;
        for entry in
            std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
        {
            let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
            copy_path(&entry.path(), &dst.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        std::fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("copying {} to {}", src.display(), dst.display()))
    }
}

/// Create a symlink at `link` pointing to `points_to`. Windows needs to know
/// whether the link names a directory.
fn create_symlink(points_to: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    #[cfg(unix)]
    {
        let _ = is_dir;
        std::os::unix::fs::symlink(points_to, link)
    }

    #[cfg(windows)]
    {
        if is_dir {
            std::os::windows::fs::symlink_dir(points_to, link)
        } else {
            std::os::windows::fs::symlink_file(points_to, link)
        }
    }
}

/// Sibling path used to stage new content before it replaces `dest`.
///
/// Staying in the same directory keeps the final rename on one filesystem.
#[must_use]
pub fn staging_path(dest: &Path) -> PathBuf {
    let name = dest.file_name().map_or_else(
        || "sage".to_string(),
        |n| n.to_string_lossy().into_owned(),
    );
    dest.with_file_name(format!(".{name}.sage-tmp"))
}

/// Move staged content at `staged` into `dest`, replacing what is there.
///
/// Files are renamed over the destination in one step; an existing directory
/// is removed first.
///
/// # Errors
///
/// Returns an error if the old content cannot be removed or the rename fails.
pub fn replace_path(staged: &Path, dest: &Path) -> Result<()> {
    if dest.symlink_metadata().is_ok_and(|m| m.is_dir()) || staged.is_dir() {
        remove_path(dest)?;
    }
    std::fs::rename(staged, dest)
        .with_context(|| format!("rename {} to {}", staged.display(), dest.display()))
}

/// Write `contents` to `path` by writing a staged sibling and renaming it
/// into place, so readers never observe a half-written file.
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the write or rename
/// fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let tmp = staging_path(path);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        if let Err(e) = std::fs::remove_file(&tmp) {
            tracing::warn!("leaving {}: {e}", tmp.display());
        }
    })
}

/// Remove `start` and its ancestors while they are empty directories,
/// stopping before `stop_at` (which is never removed).
pub fn remove_empty_dirs(start: &Path, stop_at: &Path) {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
