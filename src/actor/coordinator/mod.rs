//! Coordinator - Shared Artifact State for Live Reload
//!
//! The Coordinator owns the versioned store and the counters sessions wait on:
//!
//! ```text
//! producers --ingest--> Coordinator --wake all--> Session (outbound)
//! ticker --heartbeat-->     |                       |
//!                           +<----next_update-------+
//! ```
//!
//! - `version` advances on every observable change (content or heartbeat)
//! - `tick` advances on heartbeats only
//! - `revision` advances on content changes only
//!
//! All three, plus the store, live under one mutex, so a session can never
//! observe a version bump without the store mutation behind it.

mod runtime;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::{Condvar, Mutex};

use super::messages::{ArtifactBatch, IngestError};
use crate::store::{Delta, Manifest, Version, VersionedStore};

pub use runtime::run_actors;

/// Smallest step between two ingest timestamps (stamp precision).
const STAMP_RESOLUTION: Duration = Duration::from_micros(1);

struct State {
    store: VersionedStore,
    version: u64,
    tick: u64,
    revision: u64,
    last_ingest: Option<SystemTime>,
    shutdown: bool,
}

impl State {
    /// Clamp `now` so ingest timestamps strictly increase at stamp precision.
    fn next_timestamp(&mut self, now: SystemTime) -> SystemTime {
        let timestamp = match self.last_ingest {
            Some(last) => now.max(last + STAMP_RESOLUTION),
            None => now,
        };
        self.last_ingest = Some(timestamp);
        timestamp
    }
}

/// What one session has seen so far.
///
/// Owned by the session's outbound thread; only [`Coordinator::next_update`]
/// mutates it.
#[derive(Debug, Default)]
pub struct SessionView {
    version: u64,
    tick: u64,
    revision: u64,
    manifest: Manifest,
}

#[cfg(test)]
impl SessionView {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

/// Result of one wake-up of a session's outbound thread.
#[derive(Debug, Default)]
pub struct Update {
    /// A heartbeat tick passed since the last update: probe the client.
    pub heartbeat: bool,
    /// Manifest changes to push, empty when only the tick moved.
    pub delta: Delta,
}

/// Shared state between producers, the heartbeat ticker and sessions.
pub struct Coordinator {
    state: Mutex<State>,
    changed: Condvar,
    sessions: AtomicUsize,
}

impl Coordinator {
    pub fn new(retention: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                store: VersionedStore::new(retention),
                version: 0,
                tick: 0,
                revision: 0,
                last_ingest: None,
                shutdown: false,
            }),
            changed: Condvar::new(),
            sessions: AtomicUsize::new(0),
        }
    }

    /// Create a shared coordinator.
    pub fn shared(retention: Duration) -> Arc<Self> {
        Arc::new(Self::new(retention))
    }

    // =========================================================================
    // Producers
    // =========================================================================

    /// Apply a batch of artifact changes at the current time.
    ///
    /// Returns `Ok(true)` if any artifact changed. A malformed batch is
    /// rejected as a whole before the store is touched.
    pub fn ingest(&self, batch: ArtifactBatch) -> Result<bool, IngestError> {
        self.ingest_at(batch, SystemTime::now())
    }

    /// [`Self::ingest`] with an explicit clock reading.
    pub fn ingest_at(&self, batch: ArtifactBatch, now: SystemTime) -> Result<bool, IngestError> {
        if batch.is_empty() {
            return Ok(false);
        }
        batch.validate()?;

        let count = batch.len();
        let mut state = self.state.lock();
        let timestamp = state.next_timestamp(now);
        let changed = state.store.upsert_batch(timestamp, batch.into_changes());
        if changed {
            let expired = state.store.expire(timestamp);
            state.revision += 1;
            state.version += 1;
            crate::debug!("store"; "revision {}: {} entries, {} expired, {} retained",
                state.revision, count, expired, state.store.pending_expiry());
        }
        drop(state);

        if changed {
            self.changed.notify_all();
        }
        Ok(changed)
    }

    /// Advance the heartbeat tick and wake every session.
    pub fn heartbeat(&self) {
        let mut state = self.state.lock();
        state.tick += 1;
        state.version += 1;
        drop(state);
        self.changed.notify_all();
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Register a new session and return its initial view.
    ///
    /// The view starts with an empty manifest, so the first update carries
    /// every existing artifact.
    pub fn open_session(&self) -> SessionView {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        SessionView {
            tick: state.tick,
            ..SessionView::default()
        }
    }

    pub fn close_session(&self) {
        self.sessions.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of connected sessions.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Block until `version` differs from `last_seen`.
    ///
    /// Returns the new version, or `None` once `closed` is set or the server
    /// shuts down.
    pub fn await_change(&self, last_seen: u64, closed: &AtomicBool) -> Option<u64> {
        let mut state = self.state.lock();
        while state.version == last_seen && !is_closed(&state, closed) {
            self.changed.wait(&mut state);
        }
        if is_closed(&state, closed) {
            return None;
        }
        Some(state.version)
    }

    /// Block until something changes, then bring `view` up to date.
    ///
    /// The delta is only computed when content changed; heartbeat-only
    /// wake-ups return an empty delta. Returns `None` once `closed` is set
    /// or the server shuts down.
    pub fn next_update(&self, view: &mut SessionView, closed: &AtomicBool) -> Option<Update> {
        self.await_change(view.version, closed)?;

        // Counters only move forward, so re-locking cannot miss the change
        let mut state = self.state.lock();
        if is_closed(&state, closed) {
            return None;
        }

        view.version = state.version;
        let heartbeat = view.tick != state.tick;
        view.tick = state.tick;

        let delta = if view.revision != state.revision {
            view.revision = state.revision;
            state.store.compute_delta(&mut view.manifest)
        } else {
            Delta::default()
        };

        Some(Update { heartbeat, delta })
    }

    /// Wake every waiting session so it re-checks its closed flag.
    ///
    /// Taking the lock first orders the wake after any flag store made by
    /// the caller, so a waiter cannot miss it between check and wait.
    pub fn wake_all(&self) {
        drop(self.state.lock());
        self.changed.notify_all();
    }

    /// Stop all sessions.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.changed.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Find a version by name: the latest if `stamp` is `None`, otherwise
    /// that exact retained version.
    pub fn lookup(&self, name: &str, stamp: Option<&str>) -> Option<Arc<Version>> {
        let state = self.state.lock();
        match stamp {
            None => state.store.get_latest(name),
            Some(stamp) => state.store.get_version(name, stamp),
        }
    }

    /// Latest stamp of every existing artifact.
    pub fn snapshot(&self) -> Delta {
        self.state.lock().store.snapshot()
    }

    #[cfg(test)]
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    #[cfg(test)]
    pub fn tick(&self) -> u64 {
        self.state.lock().tick
    }
}

fn is_closed(state: &State, closed: &AtomicBool) -> bool {
    state.shutdown || closed.load(Ordering::Acquire)
}
