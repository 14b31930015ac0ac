//! Filesystem location helpers for the surrounding editor
//!
//! Small utilities the frontend needs around the persistence core:
//! resolving command-line arguments to paths, probing writability, and
//! producing the decorated names shown in a title bar.

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Name shown for a document that has never been saved
const UNTITLED: &str = "Untitled";

/// Whether an existing file can be opened for writing.
pub fn is_writable(path: &Path) -> bool {
    OpenOptions::new().append(true).open(path).is_ok()
}

/// Resolve a command-line argument to an absolute path.
///
/// Accepts `file://` URIs, absolute paths, and paths relative to the
/// current directory.
pub fn resolve_location(arg: &str) -> PathBuf {
    if let Some(rest) = arg.strip_prefix("file://") {
        return PathBuf::from(rest);
    }
    let path = Path::new(arg);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// The name a document is presented under.
///
/// With `decorate`, a file that does not exist yet is shown as `(name)`
/// and an existing but unwritable one as `<name>`.
pub fn display_basename(path: Option<&Path>, decorate: bool) -> String {
    let Some(path) = path else {
        return UNTITLED.to_string();
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_string());

    if decorate {
        if !path.exists() {
            return format!("({})", name);
        }
        if !is_writable(path) {
            return format!("<{}>", name);
        }
    }

    name
}
