//! Versioned artifact store.
//!
//! Keeps every artifact's current version plus superseded versions for a
//! fixed retention window, so a client that learned about a stamp can still
//! fetch it after a newer build replaced it.
//!
//! # Retention
//!
//! When a version is superseded (or its artifact tombstoned) it receives
//! `expiry = timestamp + retention` and its artifact name is appended to the
//! retention queue. Retention is a constant offset, so the queue is ordered
//! by expiry and [`VersionedStore::expire`] only ever looks at its front.
//!
//! ```text
//! files:    "/game.js" -> [v3 (current), v2 (exp t+10s), v1 (exp t+8s)]
//! queue:    ["/game.js", "/game.js", ...]   one entry per expiring version
//! ```

mod delta;
mod history;
mod version;


use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rustc_hash::FxHashMap;

use history::ArtifactHistory;

pub use delta::{Delta, Manifest};
pub use version::{ArtifactChange, Content, Version};
#[cfg(test)]
pub use version::Stamp;

/// How long a superseded version stays fetchable by stamp.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10);

/// Mapping from artifact name to version history.
#[derive(Debug)]
pub struct VersionedStore {
    files: FxHashMap<String, ArtifactHistory>,
    /// Names of histories holding an expiring version, in expiry order.
    expiring: VecDeque<String>,
    retention: Duration,
}

impl Default for VersionedStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl VersionedStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            files: FxHashMap::default(),
            expiring: VecDeque::new(),
            retention,
        }
    }

    #[cfg(test)]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Number of artifact records, including tombstoned ones.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of superseded versions waiting to expire.
    pub fn pending_expiry(&self) -> usize {
        self.expiring.len()
    }

    /// Set the latest version of an artifact, or tombstone it.
    ///
    /// Returns true if the store was modified. Re-publishing byte-identical
    /// content, or tombstoning a missing artifact, is a no-op.
    pub fn upsert(&mut self, name: &str, timestamp: SystemTime, change: ArtifactChange) -> bool {
        let expiry = timestamp + self.retention;

        match change {
            ArtifactChange::Tombstone => {
                let Some(history) = self.files.get_mut(name) else {
                    return false;
                };
                if !history.exists {
                    return false;
                }
                history.exists = false;
                if history.supersede_front(expiry) {
                    self.expiring.push_back(name.to_owned());
                }
                true
            }
            ArtifactChange::Put(content) => {
                let history = self.files.entry(name.to_owned()).or_default();
                if history.current().is_some_and(|v| v.same_content(&content)) {
                    return false;
                }
                let enqueue = history.supersede_front(expiry);
                history.push_current(Version::new(content, timestamp));
                if enqueue {
                    self.expiring.push_back(name.to_owned());
                }
                true
            }
        }
    }

    /// Apply many changes under one timestamp.
    ///
    /// Returns true if at least one change modified the store.
    pub fn upsert_batch<I, N>(&mut self, timestamp: SystemTime, entries: I) -> bool
    where
        I: IntoIterator<Item = (N, ArtifactChange)>,
        N: AsRef<str>,
    {
        let mut changed = false;
        for (name, change) in entries {
            changed |= self.upsert(name.as_ref(), timestamp, change);
        }
        changed
    }

    /// Drop superseded versions whose expiry is at or before `now`.
    ///
    /// Returns the number of versions removed. Current versions never expire.
    pub fn expire(&mut self, now: SystemTime) -> usize {
        let mut removed = 0;

        while let Some(name) = self.expiring.front() {
            let Some(history) = self.files.get_mut(name) else {
                self.expiring.pop_front();
                continue;
            };
            match history.oldest_expiry() {
                Some(expiry) if expiry <= now => {
                    history.prune_oldest();
                    self.expiring.pop_front();
                    removed += 1;
                }
                Some(_) => break,
                // Oldest retained version is current: nothing of this
                // history is waiting, the entry is stale.
                None => {
                    self.expiring.pop_front();
                }
            }
        }

        removed
    }

    /// The current version of an artifact, `None` if unknown or tombstoned.
    pub fn get_latest(&self, name: &str) -> Option<Arc<Version>> {
        self.files.get(name)?.current().cloned()
    }

    /// A specific retained version of an artifact.
    pub fn get_version(&self, name: &str, stamp: &str) -> Option<Arc<Version>> {
        self.files.get(name)?.find(stamp).cloned()
    }

    /// Reconcile a subscriber manifest with the store.
    ///
    /// Returns every entry whose existence or stamp differs from the manifest
    /// (the new stamp, or `None` for an artifact that no longer exists) and
    /// updates the manifest to match. A second call without an intervening
    /// mutation returns an empty delta.
    pub fn compute_delta(&self, manifest: &mut Manifest) -> Delta {
        let mut delta = Delta::default();

        for (name, history) in &self.files {
            let latest = history.current().map(|v| v.stamp());
            if manifest.recorded(name).map(Option::as_ref) == Some(latest) {
                continue;
            }
            let latest = latest.cloned();
            manifest.record(name.clone(), latest.clone());
            delta.insert(name.clone(), latest);
        }

        delta
    }

    /// Latest stamp of every existing artifact.
    pub fn snapshot(&self) -> Delta {
        let mut snapshot = Delta::default();
        for (name, history) in &self.files {
            if let Some(version) = history.current() {
                snapshot.insert(name.clone(), Some(version.stamp().clone()));
            }
        }
        snapshot
    }
}
