//! Modification-time snapshots.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Modification time and length of a file at one point in time.
///
/// Length is included because some filesystems have coarse mtime
/// resolution, so two saves within the same tick still differ by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtimeStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl MtimeStamp {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        }
    }

    /// Stat `path`, or `None` if it cannot be read.
    pub fn of(path: &Path) -> Option<Self> {
        path.metadata().ok().map(|meta| Self::from_metadata(&meta))
    }
}
