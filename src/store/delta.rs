//! Subscriber manifests and the deltas that reconcile them.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::version::Stamp;

/// What one subscriber was last told: artifact name -> stamp.
///
/// Removed artifacts stay recorded (as `None`) so a removal is reported
/// exactly once.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: FxHashMap<String, Option<Stamp>>,
}

impl Manifest {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp last reported for `name`, `None` if unknown or reported removed.
    #[cfg(test)]
    pub fn stamp(&self, name: &str) -> Option<&Stamp> {
        self.entries.get(name)?.as_ref()
    }

    /// Number of names reported as existing.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.values().filter(|s| s.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(super) fn recorded(&self, name: &str) -> Option<&Option<Stamp>> {
        self.entries.get(name)
    }

    pub(super) fn record(&mut self, name: String, stamp: Option<Stamp>) {
        self.entries.insert(name, stamp);
    }
}

/// Stale manifest entries with their replacement stamps.
///
/// `None` marks an artifact that no longer exists. Serializes as a JSON object whose values
/// are stamps or `null`, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Delta {
    entries: BTreeMap<String, Option<Stamp>>,
}

impl Delta {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Option<Stamp>> {
        self.entries.get(name)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Stamp>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(super) fn insert(&mut self, name: String, stamp: Option<Stamp>) {
        self.entries.insert(name, stamp);
    }
}
