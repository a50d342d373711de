//! Log file location and ANSI stripping.
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// A CSI sequence (`ESC [`) runs up to its final byte in `@`..=`~`; any other
/// escape drops the single character that follows it.
pub(super) fn strip_ansi(s: &str) -> Cow<'_, str> {
    let mut pieces = s.split('\x1b');
    let Some(head) = pieces.next() else {
        return Cow::Borrowed(s);
    };
    if head.len() == s.len() {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    out.push_str(head);
    for piece in pieces {
        let rest = match piece.strip_prefix('[') {
            Some(csi) => csi
                .find(|c: char| ('@'..='~').contains(&c))
                .and_then(|end| csi.get(end + 1..))
                .unwrap_or(""),
            None => {
                let mut chars = piece.chars();
                chars.next();
                chars.as_str()
            }
        };
        out.push_str(rest);
    }
    Cow::Owned(out)
}

/// Compute the `sage` cache directory from `XDG_CACHE_HOME` and the home
/// directory, without touching the filesystem.
pub(super) fn cache_dir_from(xdg_cache: Option<OsString>, home: Option<OsString>) -> PathBuf {
    xdg_cache
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                home.map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".cache")
            },
            PathBuf::from,
        )
        .join("sage")
}

/// Return `$XDG_CACHE_HOME/sage/<command>.log`. Nothing is created.
pub(super) fn log_file_path(command: &str) -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    cache_dir_from(std::env::var_os("XDG_CACHE_HOME"), home).join(format!("{command}.log"))
}
