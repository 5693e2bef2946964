//! Producer Message Definitions
//!
//! Producers publish artifact batches to the Coordinator.
//!
//! ```text
//! CommandProducer --ArtifactBatch--> Coordinator <--ArtifactBatch-- WatchProducer
//! ```

use thiserror::Error;

use crate::store::{ArtifactChange, Content};

/// One named change inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Slash-rooted logical path, e.g. `/shader/sky.glsl`
    pub name: String,
    pub change: ArtifactChange,
}

/// A set of artifact changes that happened "at once".
///
/// Applied under a single timestamp, so a full rebuild that touches many
/// artifacts advances the coordinator's version only once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBatch {
    entries: Vec<ArtifactEntry>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish new content under `name`.
    pub fn put(&mut self, name: impl Into<String>, content: Content) -> &mut Self {
        self.push(name, ArtifactChange::Put(content))
    }

    /// Mark `name` as no longer existing.
    pub fn remove(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(name, ArtifactChange::Tombstone)
    }

    pub fn push(&mut self, name: impl Into<String>, change: ArtifactChange) -> &mut Self {
        self.entries.push(ArtifactEntry {
            name: name.into(),
            change,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    /// Check every name before anything is applied.
    pub fn validate(&self) -> Result<(), IngestError> {
        self.entries
            .iter()
            .try_for_each(|entry| validate_name(&entry.name))
    }

    pub(crate) fn into_changes(self) -> impl Iterator<Item = (String, ArtifactChange)> {
        self.entries.into_iter().map(|e| (e.name, e.change))
    }
}

/// A batch that violates the artifact naming rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("artifact name is empty")]
    EmptyName,

    #[error("artifact name `{0}` must start with `/`")]
    NotRooted(String),

    #[error("artifact name `{0}` has an empty, `.` or `..` segment")]
    BadSegment(String),
}

/// Names are slash-rooted logical paths without empty or relative segments.
pub fn validate_name(name: &str) -> Result<(), IngestError> {
    if name.is_empty() {
        return Err(IngestError::EmptyName);
    }
    let Some(rest) = name.strip_prefix('/') else {
        return Err(IngestError::NotRooted(name.to_owned()));
    };
    if rest
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(IngestError::BadSegment(name.to_owned()));
    }
    Ok(())
}
