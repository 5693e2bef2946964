//! Artifact versions and their stamps.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;

use crate::utils::date::DateTimeUtc;

/// Opaque identifier of one artifact version, derived from its creation time.
///
/// Fixed-width UTC with microseconds, so stamps compare chronologically as
/// plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Stamp(String);

impl Stamp {
    pub fn from_time(time: SystemTime) -> Self {
        Self(DateTimeUtc::from_system_time(time).to_stamp())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Stamp {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Bytes published under an artifact name.
///
/// `map` is the auxiliary payload (a source map for compiled scripts).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    pub data: Vec<u8>,
    pub map: Option<Vec<u8>>,
}

impl Content {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            map: None,
        }
    }

    pub fn with_map(mut self, map: impl Into<Vec<u8>>) -> Self {
        self.map = Some(map.into());
        self
    }
}

/// A change to a single artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactChange {
    /// New content for the artifact.
    Put(Content),
    /// The artifact no longer exists.
    Tombstone,
}

/// One immutable version of an artifact.
///
/// Shared through `Arc` between the store's history and in-flight responses.
#[derive(Debug, PartialEq, Eq)]
pub struct Version {
    content: Content,
    stamp: Stamp,
    created: SystemTime,
}

impl Version {
    pub(super) fn new(content: Content, created: SystemTime) -> Self {
        Self {
            content,
            stamp: Stamp::from_time(created),
            created,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.content.data
    }

    pub fn map(&self) -> Option<&[u8]> {
        self.content.map.as_deref()
    }

    pub fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    /// Byte-identical payload and auxiliary payload.
    pub(super) fn same_content(&self, content: &Content) -> bool {
        self.content == *content
    }
}
