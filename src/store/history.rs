use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

use super::version::Version;

/// A retained version and the time it stops being fetchable.
///
/// `expiry` is `None` only for the front version of a history that has
/// not been superseded or tombstoned.
#[derive(Debug)]
pub(super) struct Retained {
    pub(super) version: Arc<Version>,
    pub(super) expiry: Option<SystemTime>,
}

/// Per-name state: existence flag plus retained versions, newest first.
#[derive(Debug, Default)]
pub(super) struct ArtifactHistory {
    pub(super) exists: bool,
    pub(super) versions: VecDeque<Retained>,
}

impl ArtifactHistory {
    /// The current version, if the artifact exists.
    pub(super) fn current(&self) -> Option<&Arc<Version>> {
        if !self.exists {
            return None;
        }
        self.versions.front().map(|r| &r.version)
    }

    pub(super) fn find(&self, stamp: &str) -> Option<&Arc<Version>> {
        self.versions
            .iter()
            .map(|r| &r.version)
            .find(|v| v.stamp() == stamp)
    }

    /// Give the front version an expiry if it has none yet.
    ///
    /// Returns true if an expiry was assigned (the caller enqueues it).
    pub(super) fn supersede_front(&mut self, expiry: SystemTime) -> bool {
        match self.versions.front_mut() {
            Some(front) if front.expiry.is_none() => {
                front.expiry = Some(expiry);
                true
            }
            _ => false,
        }
    }

    pub(super) fn push_current(&mut self, version: Version) {
        self.versions.push_front(Retained {
            version: Arc::new(version),
            expiry: None,
        });
        self.exists = true;
    }

    /// Expiry of the oldest retained version, `None` if it never expires.
    pub(super) fn oldest_expiry(&self) -> Option<SystemTime> {
        self.versions.back().and_then(|r| r.expiry)
    }

    pub(super) fn prune_oldest(&mut self) {
        self.versions.pop_back();
    }
}
