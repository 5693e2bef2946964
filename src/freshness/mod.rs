//! Freshness detection for watched files.
//!
//! A [`Resource`] remembers what a file looked like when it was last
//! published, and [`Resource::is_outdated`] tells whether it changed since:
//!
//! - `Content`: blake3 digest of the bytes (exact, reads the file)
//! - `Mtime`: modification time plus length (cheap, a single `stat`)

mod hash;
mod mtime;

pub use hash::{ContentHash, compute_file_hash};
pub use mtime::MtimeStamp;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How watched files are compared against their last published state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Content,
    Mtime,
}

/// Last published state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Mtime { path: PathBuf, stamp: MtimeStamp },
    Content { path: PathBuf, hash: ContentHash },
}

impl Resource {
    /// Record `path` as published with `data`.
    pub fn observe(strategy: Strategy, path: &Path, data: &[u8]) -> Self {
        let path = path.to_path_buf();
        match strategy {
            Strategy::Content => Self::Content {
                hash: ContentHash::of(data),
                path,
            },
            Strategy::Mtime => Self::Mtime {
                stamp: MtimeStamp::of(&path).unwrap_or(MtimeStamp {
                    modified: None,
                    len: data.len() as u64,
                }),
                path,
            },
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        match self {
            Self::Mtime { path, .. } | Self::Content { path, .. } => path,
        }
    }

    /// Whether the file on disk no longer matches the recorded state.
    ///
    /// A file that cannot be read is always outdated.
    pub fn is_outdated(&self) -> bool {
        match self {
            Self::Mtime { path, stamp } => MtimeStamp::of(path) != Some(*stamp),
            Self::Content { path, hash } => compute_file_hash(path).map_or(true, |h| h != *hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_content_resource_ignores_rewrite_with_same_bytes() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sky.glsl", "void main() {}");
        let resource = Resource::observe(Strategy::Content, &path, b"void main() {}");
        assert!(!resource.is_outdated());

        fs::write(&path, "void main() {}").unwrap();
        assert!(!resource.is_outdated());

        fs::write(&path, "void main() { discard; }").unwrap();
        assert!(resource.is_outdated());
    }

    #[test]
    fn test_mtime_resource_detects_length_change() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sky.glsl", "a");
        let resource = Resource::observe(Strategy::Mtime, &path, b"a");
        assert!(!resource.is_outdated());

        fs::write(&path, "abc").unwrap();
        assert!(resource.is_outdated());
    }

    #[test]
    fn test_removed_file_is_outdated() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sky.glsl", "a");

        for strategy in [Strategy::Content, Strategy::Mtime] {
            let resource = Resource::observe(strategy, &path, b"a");
            assert_eq!(resource.path(), path.as_path());
            assert!(!resource.is_outdated());
        }

        let content = Resource::observe(Strategy::Content, &path, b"a");
        let mtime = Resource::observe(Strategy::Mtime, &path, b"a");
        fs::remove_file(&path).unwrap();
        assert!(content.is_outdated());
        assert!(mtime.is_outdated());
    }

    #[test]
    fn test_strategy_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            freshness: Strategy,
        }
        let parsed: Wrapper = toml::from_str("freshness = \"mtime\"").unwrap();
        assert_eq!(parsed.freshness, Strategy::Mtime);
        assert_eq!(Strategy::default(), Strategy::Content);
    }
}
