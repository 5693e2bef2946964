//! Path utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `artifact_name` - map a watched file onto its slash-rooted artifact name

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Join an artifact prefix and a file name into a slash-rooted name.
///
/// ```text
/// ("/shader", "sky.glsl")  -> "/shader/sky.glsl"
/// ("/shader/", "sky.glsl") -> "/shader/sky.glsl"
/// ("", "sky.glsl")         -> "/sky.glsl"
/// ```
pub fn artifact_name(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.starts_with('/') {
        format!("{prefix}/{file_name}")
    } else if prefix.is_empty() {
        format!("/{file_name}")
    } else {
        format!("/{prefix}/{file_name}")
    }
}
