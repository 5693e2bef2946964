//! Actor System for Live Reload
//!
//! Producers publish batches, the coordinator versions them, sessions push
//! the differences to subscribers:
//!
//! ```text
//! CommandProducer --+                          +--> Session --> client
//!                   +--> Coordinator (store) --+--> Session --> client
//! WatchProducer ----+        ^                 +--> ...
//!                            | heartbeat
//!                         ticker
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Artifact batches and their validation
//! - `coordinator` - Shared store, counters and the runtime wiring
//! - `session` - One WebSocket subscriber (inbound + outbound threads)
//! - `producer` - Build command and directory watcher

pub mod coordinator;
pub mod messages;
pub mod producer;
pub mod session;

pub use coordinator::Coordinator;
